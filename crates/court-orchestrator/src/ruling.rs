// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Final-ruling argmax with a deterministic tie-break.
//!
//! The natural tie-break — "first entry in insertion order of the tally
//! map, falling back to the first legal choice if empty" — isn't
//! implementable against `Session`'s `HashMap<String, u32>` tallies, since
//! Rust's `HashMap` has no preserved insertion order. We instead iterate
//! the session's *declared legal-choices order* (verdict choices from
//! `CaseType::verdict_choices()`, sentence options from
//! `metadata.sentenceOptions`) and keep the first entry with a strictly
//! greater count than the current best. This is deterministic, reuses a
//! real fixed ordering the session already carries, and degrades to the
//! same "first legal choice" fallback when every tally is zero or absent.
use std::collections::HashMap;

/// `legal_choices` must be non-empty; returns `None` only in that case.
pub fn argmax_over_legal_choices(tally: &HashMap<String, u32>, legal_choices: &[String]) -> Option<String> {
    let mut best: Option<(&str, u32)> = None;
    for choice in legal_choices {
        let count = tally.get(choice).copied().unwrap_or(0);
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((choice.as_str(), count)),
        }
    }
    best.map(|(choice, _)| choice.to_string())
}

/// The final judge turn must mention both winners explicitly. Generation
/// output is not guaranteed to, so append a deterministic restatement
/// whenever either is missing.
pub fn ensure_mentions_both(mut text: String, verdict: &str, sentence: &str) -> String {
    let lower = text.to_ascii_lowercase();
    if !lower.contains(&verdict.to_ascii_lowercase()) || !lower.contains(&sentence.to_ascii_lowercase()) {
        text.push_str(&format!(" The court finds the verdict to be \"{verdict}\" with sentence \"{sentence}\"."));
    }
    text
}
