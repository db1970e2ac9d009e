// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Instant;

/// Abstracts "now" so window-expiry tests don't depend on wall-clock sleeps.
/// Production code uses [`SystemClock`]; tests use a clock they can advance
/// by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::Clock;
    use std::{
        sync::Mutex,
        time::{Duration, Instant},
    };

    /// A clock that only advances when told to. `Instant` has no public
    /// "epoch" constructor, so this pins a real `Instant::now()` at
    /// construction and offsets from it.
    pub struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) }
        }

        pub fn advance(&self, by: Duration) {
            let mut offset = self.offset.lock().unwrap();
            *offset += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }
}
