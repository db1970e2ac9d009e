// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::CaseType;

/// One entry in the static safety-catalog prompt bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBankEntry {
    pub id: String,
    pub genre: String,
    pub case_prompt: String,
    pub case_type: CaseType,
    pub active: bool,
}
