// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Deterministic mock generation path used when no API key is configured,
//! or when `LLM_MOCK=true` forces it. Buckets by regex against the latest
//! user message, then picks uniformly at random within the bucket — the rng
//! is injected so tests can seed it and assert reproducible selection.
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use crate::provider::{GenerationMessage, GenerationRequest};

static OPENING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)opening statement|begin (?:your|the) case|address the court").unwrap());
static WITNESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)take the stand|swear.+truth|cross.?examin|direct examin").unwrap());
static CLOSING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)closing argument|final remarks|sum up your case").unwrap());
static RULING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)render (?:your|a) (?:verdict|ruling)|deliver the sentence").unwrap());

const OPENING_PHRASES: &[&str] = &[
    "Ladies and gentlemen, the evidence will show exactly what happened here.",
    "We intend to prove, beyond question, the true sequence of events.",
    "Today you will hear testimony that settles this matter decisively.",
];

const WITNESS_PHRASES: &[&str] = &[
    "I recall the events clearly, as though they happened yesterday.",
    "I was present that day and observed everything from a short distance.",
    "To the best of my knowledge, that is an accurate account of what occurred.",
];

const CLOSING_PHRASES: &[&str] = &[
    "The facts before you point to only one reasonable conclusion.",
    "We ask that you weigh the evidence fairly and reach the just outcome.",
    "This case rests on the testimony you have heard today, nothing more.",
];

const RULING_PHRASES: &[&str] = &[
    "Having weighed the evidence, the court renders its decision.",
    "The panel finds that the record supports the following ruling.",
    "After careful deliberation, this is the court's determination.",
];

const DEFAULT_PHRASES: &[&str] = &[
    "The court will note that statement for the record.",
    "Let the record reflect what has just been said.",
    "Noted. Please continue.",
];

fn bucket_for(latest_user_message: &str) -> &'static [&'static str] {
    if OPENING_RE.is_match(latest_user_message) {
        OPENING_PHRASES
    } else if WITNESS_RE.is_match(latest_user_message) {
        WITNESS_PHRASES
    } else if CLOSING_RE.is_match(latest_user_message) {
        CLOSING_PHRASES
    } else if RULING_RE.is_match(latest_user_message) {
        RULING_PHRASES
    } else {
        DEFAULT_PHRASES
    }
}

fn latest_user_message(messages: &[GenerationMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == crate::provider::GenerationRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// Select a mock reply for `req`, drawing from `rng` so callers can seed it
/// for reproducible tests.
pub fn mock_reply(req: &GenerationRequest, rng: &mut impl Rng) -> String {
    let phrases = bucket_for(latest_user_message(&req.messages));
    let idx = rng.random_range(0..phrases.len());
    phrases[idx].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{GenerationMessage, GenerationRole};
    use rand::{rngs::StdRng, SeedableRng};

    fn request(user_text: &str) -> GenerationRequest {
        GenerationRequest {
            messages: vec![GenerationMessage { role: GenerationRole::User, content: user_text.into() }],
            temperature: 0.7,
            max_tokens: 200,
        }
    }

    #[test]
    fn opening_statement_picks_opening_bucket() {
        let mut rng = StdRng::seed_from_u64(1);
        let reply = mock_reply(&request("Please give your opening statement."), &mut rng);
        assert!(OPENING_PHRASES.contains(&reply.as_str()));
    }

    #[test]
    fn witness_examination_picks_witness_bucket() {
        let mut rng = StdRng::seed_from_u64(1);
        let reply = mock_reply(&request("Please take the stand for cross-examination."), &mut rng);
        assert!(WITNESS_PHRASES.contains(&reply.as_str()));
    }

    #[test]
    fn closing_argument_picks_closing_bucket() {
        let mut rng = StdRng::seed_from_u64(1);
        let reply = mock_reply(&request("Counsel, present your closing argument."), &mut rng);
        assert!(CLOSING_PHRASES.contains(&reply.as_str()));
    }

    #[test]
    fn ruling_request_picks_ruling_bucket() {
        let mut rng = StdRng::seed_from_u64(1);
        let reply = mock_reply(&request("The court will now render your verdict."), &mut rng);
        assert!(RULING_PHRASES.contains(&reply.as_str()));
    }

    #[test]
    fn unmatched_text_picks_default_bucket() {
        let mut rng = StdRng::seed_from_u64(1);
        let reply = mock_reply(&request("What did you have for lunch?"), &mut rng);
        assert!(DEFAULT_PHRASES.contains(&reply.as_str()));
    }

    #[test]
    fn seeded_rng_covers_at_least_two_distinct_phrases_over_many_calls() {
        let mut rng = StdRng::seed_from_u64(42);
        let req = request("Please give your opening statement.");
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            seen.insert(mock_reply(&req, &mut rng));
        }
        assert!(seen.len() >= 2, "expected variety across 50 draws, got {seen:?}");
    }
}
