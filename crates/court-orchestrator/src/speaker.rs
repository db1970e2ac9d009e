// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Speaker selection, used whenever the next
//! speaker is not prescribed by the step-by-step script. All randomness
//! goes through an injected `rand::Rng` so selection is reproducible in
//! tests.
use rand::Rng;

/// Weighted-proportional pick excluding `last_speaker`. `history` is the
/// list of past speaker ids, used to compute each candidate's recency
/// penalty as `speakCount / totalTurns`.
pub fn select_next_speaker(
    participants: &[String],
    last_speaker: Option<&str>,
    history: &[String],
    rng: &mut impl Rng,
) -> Option<String> {
    if participants.is_empty() {
        return None;
    }

    let total_turns = history.len().max(1) as f64;
    let weights: Vec<f64> = participants
        .iter()
        .map(|candidate| {
            if Some(candidate.as_str()) == last_speaker {
                return 0.0;
            }
            let speak_count = history.iter().filter(|h| *h == candidate).count() as f64;
            let recency_penalty = speak_count / total_turns;
            let jitter = rng.random_range(-0.2..=0.2);
            (1.0 - recency_penalty * 0.5 + jitter).max(0.0)
        })
        .collect();

    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0.0 {
        let eligible: Vec<&String> = participants.iter().filter(|p| Some(p.as_str()) != last_speaker).collect();
        let pool = if eligible.is_empty() { participants.iter().collect::<Vec<_>>() } else { eligible };
        let index = rng.random_range(0..pool.len());
        return Some(pool[index].clone());
    }

    let mut roll = rng.random_range(0.0..total_weight);
    for (candidate, weight) in participants.iter().zip(weights.iter()) {
        if roll < *weight {
            return Some(candidate.clone());
        }
        roll -= weight;
    }
    // Floating-point rounding can leave a sliver of `roll` unconsumed; fall
    // back to the last candidate with nonzero weight.
    participants
        .iter()
        .zip(weights.iter())
        .rev()
        .find(|(_, w)| **w > 0.0)
        .map(|(c, _)| c.clone())
}

/// First-speaker selection prefers `"coordinator"` if present among
/// `participants`, else picks uniformly at random.
pub fn select_first_speaker(participants: &[String], rng: &mut impl Rng) -> Option<String> {
    if let Some(coordinator) = participants.iter().find(|p| p.as_str() == "coordinator") {
        return Some(coordinator.clone());
    }
    if participants.is_empty() {
        return None;
    }
    let index = rng.random_range(0..participants.len());
    Some(participants[index].clone())
}
