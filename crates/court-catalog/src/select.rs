// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use court_types::PromptBankEntry;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no safe prompt available in the catalog")]
    NoSafePrompt,
}

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `data`.
fn fnv1a(data: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in data.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Genres used by the last `min_distance` entries of `history`, looked up
/// against `bank` by id.
fn recent_genres<'a>(bank: &'a [PromptBankEntry], history: &[String], min_distance: usize) -> Vec<&'a str> {
    let start = history.len().saturating_sub(min_distance);
    history[start..]
        .iter()
        .filter_map(|id| bank.iter().find(|e| &e.id == id))
        .map(|e| e.genre.as_str())
        .collect()
}

/// Select the next case prompt not yet seen within the last `min_distance`
/// history entries' genres, screened for safety, chosen deterministically.
///
/// `filter` narrows the bank to candidates eligible on other grounds (case
/// type, active flag already applied). Returns [`CatalogError::NoSafePrompt`]
/// when nothing passes the safety screen at all.
pub fn select_next_safe_prompt(
    bank: &[PromptBankEntry],
    history: &[String],
    min_distance: usize,
    filter: impl Fn(&PromptBankEntry) -> bool,
) -> Result<PromptBankEntry, CatalogError> {
    let eligible: Vec<&PromptBankEntry> = bank.iter().filter(|e| e.active && filter(e)).collect();

    let excluded = recent_genres(bank, history, min_distance);
    let mut pool: Vec<&PromptBankEntry> = eligible.iter().filter(|e| !excluded.contains(&e.genre.as_str())).copied().collect();
    if pool.is_empty() && !eligible.is_empty() {
        warn!(min_distance, "genre exclusion emptied the prompt pool; reverting to any safe genre");
        pool = eligible;
    }

    let mut safe: Vec<&PromptBankEntry> =
        pool.into_iter().filter(|e| !court_moderation::moderate(&e.case_prompt).flagged).collect();
    if safe.is_empty() {
        return Err(CatalogError::NoSafePrompt);
    }
    safe.sort_by(|a, b| a.id.cmp(&b.id));

    let ids_joined: String = safe.iter().map(|e| e.id.as_str()).collect::<Vec<_>>().join("");
    let key = format!("{}{}", history.join(""), ids_joined);
    let index = (fnv1a(&key) as usize) % safe.len();
    Ok(safe[index].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_types::CaseType;

    fn bank() -> Vec<PromptBankEntry> {
        vec![
            PromptBankEntry { id: "a".into(), genre: "workplace".into(), case_prompt: "Did A happen?".into(), case_type: CaseType::Criminal, active: true },
            PromptBankEntry { id: "b".into(), genre: "workplace".into(), case_prompt: "Did B happen?".into(), case_type: CaseType::Criminal, active: true },
            PromptBankEntry { id: "c".into(), genre: "domestic".into(), case_prompt: "Did C happen?".into(), case_type: CaseType::Civil, active: true },
        ]
    }

    #[test]
    fn fnv1a_is_deterministic() {
        assert_eq!(fnv1a("hello"), fnv1a("hello"));
        assert_ne!(fnv1a("hello"), fnv1a("world"));
    }

    #[test]
    fn excludes_recent_genre_within_min_distance() {
        let bank = bank();
        let history = vec!["a".to_string()];
        let picked = select_next_safe_prompt(&bank, &history, 1, |_| true).unwrap();
        assert_eq!(picked.genre, "domestic");
    }

    #[test]
    fn reverts_to_full_pool_when_exclusion_empties_it() {
        // Every entry shares the "workplace" genre once "c" is filtered out by `filter`.
        let mut bank = bank();
        bank.truncate(2);
        let history = vec!["a".to_string()];
        let picked = select_next_safe_prompt(&bank, &history, 1, |_| true).unwrap();
        assert_eq!(picked.genre, "workplace");
    }

    #[test]
    fn flagged_prompts_are_screened_out() {
        let mut bank = bank();
        bank[0].case_prompt = "that kike stole my parking spot".to_string();
        let history = vec![];
        for _ in 0..10 {
            let picked = select_next_safe_prompt(&bank, &history, 1, |_| true).unwrap();
            assert_ne!(picked.id, "a");
        }
    }

    #[test]
    fn errors_when_no_safe_prompt_exists() {
        let bank = vec![PromptBankEntry {
            id: "only".into(),
            genre: "workplace".into(),
            case_prompt: "that kike stole my parking spot".into(),
            case_type: CaseType::Criminal,
            active: true,
        }];
        let err = select_next_safe_prompt(&bank, &[], 1, |_| true).unwrap_err();
        assert_eq!(err, CatalogError::NoSafePrompt);
    }

    #[test]
    fn selection_is_deterministic_for_same_inputs() {
        let bank = bank();
        let history = vec!["a".to_string(), "b".to_string()];
        let first = select_next_safe_prompt(&bank, &history, 1, |_| true).unwrap();
        let second = select_next_safe_prompt(&bank, &history, 1, |_| true).unwrap();
        assert_eq!(first.id, second.id);
    }
}
