// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Random events: an optional pre-turn hook that
//! injects a rare, named courtroom disturbance as an extra generation turn.
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct RandomEvent {
    pub name: &'static str,
    pub probability: f64,
    pub instruction: &'static str,
}

const CATALOG: &[RandomEvent] = &[
    RandomEvent {
        name: "witness_outburst",
        probability: 0.05,
        instruction: "The witness suddenly blurts out an unprompted, emotional aside before continuing.",
    },
    RandomEvent {
        name: "gallery_disruption",
        probability: 0.03,
        instruction: "A commotion breaks out in the gallery; the bailiff calls for order.",
    },
    RandomEvent {
        name: "exhibit_mishap",
        probability: 0.02,
        instruction: "An exhibit is fumbled or misplaced, drawing brief confusion before the proceeding continues.",
    },
];

/// Shuffle the catalog and scan for the first event whose probability
/// exceeds a single roll. At most one event fires per call.
pub fn roll_random_event(rng: &mut impl Rng) -> Option<&'static RandomEvent> {
    let mut shuffled: Vec<&RandomEvent> = CATALOG.iter().collect();
    shuffled.shuffle(rng);
    let roll: f64 = rng.random_range(0.0..1.0);
    shuffled.into_iter().find(|event| event.probability > roll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn never_fires_when_roll_exceeds_every_probability() {
        struct AlwaysHigh;
        impl rand::RngCore for AlwaysHigh {
            fn next_u32(&mut self) -> u32 {
                u32::MAX
            }
            fn next_u64(&mut self) -> u64 {
                u64::MAX
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(0xff);
            }
        }
        let mut rng = AlwaysHigh;
        assert!(roll_random_event(&mut rng).is_none());
    }

    #[test]
    fn at_most_one_event_fires_per_call() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let fired = roll_random_event(&mut rng);
            if let Some(event) = fired {
                assert!(CATALOG.iter().any(|c| c.name == event.name));
            }
        }
    }

    #[test]
    fn catalog_entries_have_distinct_names() {
        let mut names: Vec<&str> = CATALOG.iter().map(|e| e.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }
}
