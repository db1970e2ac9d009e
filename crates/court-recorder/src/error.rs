// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recorder io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("recorder serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
