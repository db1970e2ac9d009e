// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Witness-response truncation: the tighter of a token cap and a
//! seconds-based cap converted via a words-per-second rate.
use court_config::WitnessCapConfig;
use court_types::CapReason;

#[derive(Debug, Clone)]
pub struct WitnessCapResult {
    pub text: String,
    pub original_tokens: usize,
    pub capped_tokens: usize,
    pub reason: CapReason,
    pub truncated: bool,
}

/// Truncate `text` to `min(N, maxTokens, maxSeconds * tokensPerSecond)`
/// word-tokens, appending the configured marker iff truncation occurred.
/// Ties between the token bound and the seconds-derived bound favor
/// `CapReason::Tokens`.
pub fn apply_witness_cap(text: &str, cfg: &WitnessCapConfig) -> WitnessCapResult {
    let words: Vec<&str> = text.split_whitespace().collect();
    let original_tokens = words.len();

    let seconds_bound = (cfg.max_seconds as f64 * cfg.tokens_per_second).floor() as usize;
    let token_bound = cfg.max_tokens as usize;

    let (bound, reason) =
        if token_bound <= seconds_bound { (token_bound, CapReason::Tokens) } else { (seconds_bound, CapReason::Seconds) };

    if original_tokens <= bound {
        return WitnessCapResult {
            text: text.to_string(),
            original_tokens,
            capped_tokens: original_tokens,
            reason: CapReason::None,
            truncated: false,
        };
    }

    let mut truncated_text = words[..bound].join(" ");
    if !cfg.truncation_marker.is_empty() {
        truncated_text.push(' ');
        truncated_text.push_str(&cfg.truncation_marker);
    }

    WitnessCapResult { text: truncated_text, original_tokens, capped_tokens: bound, reason, truncated: true }
}
