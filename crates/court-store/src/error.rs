// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use court_types::CourtError;
use thiserror::Error;

/// Store-level errors: either a stable validation code from the shared
/// taxonomy, or a backend failure that has no error code of its own.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] CourtError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Internal(String),
}

impl StoreError {
    /// The stable code for responses, when this is a validation failure.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            StoreError::Validation(e) => Some(e.code()),
            _ => None,
        }
    }
}
