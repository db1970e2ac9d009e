// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use court_store::StoreError;
use thiserror::Error;

/// Any unhandled error here transitions the session to `failed` with the
/// message — except [`OrchestratorError::Cancelled`], which is a
/// clean shutdown, not a failure.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("session orchestration cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
