// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use court_types::{CaseType, PromptBankEntry};

/// The standard case-prompt catalog: a fixed, reviewed list rather than
/// anything generated at runtime.
pub fn default_prompt_bank() -> Vec<PromptBankEntry> {
    vec![
        entry("workplace-coffee", "workplace", "Did the defendant replace all office coffee with decaf for a month?", CaseType::Criminal),
        entry("domestic-thermostat", "domestic", "Did the defendant secretly override the shared thermostat schedule?", CaseType::Civil),
        entry("contract-mural", "contract", "Did the defendant paint over a commissioned mural without approval?", CaseType::Civil),
        entry("neighbor-fence", "neighbor", "Did the defendant move a property fence three feet onto the plaintiff's lawn?", CaseType::Civil),
        entry("prank-fishtank", "prank", "Did the defendant fill a coworker's desk drawer with live goldfish?", CaseType::Criminal),
        entry("ip-recipe", "intellectual_property", "Did the defendant publish a rival bakery's secret recipe online?", CaseType::Civil),
        entry("workplace-parking", "workplace", "Did the defendant repeatedly park in the reserved spot of a coworker?", CaseType::Criminal),
        entry("prank-autoreply", "prank", "Did the defendant set a coworker's out-of-office reply to only quote pirate lines?", CaseType::Criminal),
    ]
}

fn entry(id: &str, genre: &str, case_prompt: &str, case_type: CaseType) -> PromptBankEntry {
    PromptBankEntry { id: id.to_string(), genre: genre.to_string(), case_prompt: case_prompt.to_string(), case_type, active: true }
}
