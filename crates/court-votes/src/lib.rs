// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Vote anti-spam guard.
//!
//! Keyed by `(sessionId, clientId, pollType)`. Tracks a sliding window of
//! accepted vote timestamps (for the flood limit) and, per choice, the most
//! recent timestamp it was cast at (for the duplicate-vote limit). Pruning
//! is amortized into `check()`; `sweep()` additionally removes keys that have
//! gone fully idle, bounding memory for long-lived deployments.
mod clock;

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use court_types::{SessionId, VoteType};
use tracing::warn;

pub use clock::Clock;
#[cfg(any(test, feature = "test-util"))]
pub use clock::test_util::ManualClock;
use clock::SystemClock;

#[derive(Debug, Clone, Copy)]
pub struct VoteGuardConfig {
    pub max_votes: u32,
    pub rate_window: Duration,
    pub duplicate_window: Duration,
}

impl Default for VoteGuardConfig {
    fn default() -> Self {
        Self { max_votes: 10, rate_window: Duration::from_secs(60), duplicate_window: Duration::from_secs(60) }
    }
}

impl VoteGuardConfig {
    /// Read overrides from the environment, falling back to [`Default`].
    ///
    /// `COURT_VOTE_MAX`, `COURT_VOTE_RATE_WINDOW_MS`, `COURT_VOTE_DUP_WINDOW_MS`.
    pub fn from_env() -> Self {
        let default = Self::default();
        let max_votes = std::env::var("COURT_VOTE_MAX")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default.max_votes);
        let rate_window = std::env::var("COURT_VOTE_RATE_WINDOW_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(default.rate_window);
        let duplicate_window = std::env::var("COURT_VOTE_DUP_WINDOW_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(default.duplicate_window);
        Self { max_votes, rate_window, duplicate_window }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    DuplicateVote,
    RateLimited,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::DuplicateVote => "duplicate_vote",
            RejectReason::RateLimited => "rate_limited",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteCheckOutcome {
    Allow,
    Reject { reason: RejectReason, retry_after_ms: u64 },
}

impl VoteCheckOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, VoteCheckOutcome::Allow)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct Key {
    session_id: SessionId,
    client_id: String,
    vote_type: VoteType,
}

#[derive(Debug, Default)]
struct KeyState {
    timestamps: Vec<Instant>,
    recent_choices: Vec<(String, Instant)>,
}

impl KeyState {
    fn is_empty(&self) -> bool {
        self.timestamps.is_empty() && self.recent_choices.is_empty()
    }
}

pub struct VoteSpamGuard {
    config: VoteGuardConfig,
    clock: Box<dyn Clock>,
    state: Mutex<HashMap<Key, KeyState>>,
}

impl VoteSpamGuard {
    pub fn new(config: VoteGuardConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: VoteGuardConfig, clock: Box<dyn Clock>) -> Self {
        Self { config, clock, state: Mutex::new(HashMap::new()) }
    }

    pub fn check(
        &self,
        session_id: &SessionId,
        client_id: &str,
        vote_type: VoteType,
        choice: &str,
    ) -> VoteCheckOutcome {
        let now = self.clock.now();
        let key = Key { session_id: session_id.clone(), client_id: client_id.to_string(), vote_type };
        let mut guard = self.state.lock().unwrap();
        let entry = guard.entry(key).or_default();

        // 1. Prune timestamps and choice history older than either window.
        entry.timestamps.retain(|t| now.duration_since(*t) < self.config.rate_window);
        entry.recent_choices.retain(|(_, t)| now.duration_since(*t) < self.config.duplicate_window);

        // 2. Duplicate-vote check: same choice cast again within the dup window.
        if let Some((_, last_at)) = entry.recent_choices.iter().find(|(c, _)| c == choice) {
            let elapsed = now.duration_since(*last_at);
            let retry_after = self.config.duplicate_window.saturating_sub(elapsed);
            return VoteCheckOutcome::Reject {
                reason: RejectReason::DuplicateVote,
                retry_after_ms: retry_after.as_millis() as u64,
            };
        }

        // 3. Flood check: too many accepted votes in the rate window.
        if entry.timestamps.len() as u32 >= self.config.max_votes {
            let oldest = entry.timestamps.iter().min().copied().unwrap_or(now);
            let elapsed = now.duration_since(oldest);
            let retry_after = self.config.rate_window.saturating_sub(elapsed);
            return VoteCheckOutcome::Reject {
                reason: RejectReason::RateLimited,
                retry_after_ms: retry_after.as_millis() as u64,
            };
        }

        // 4. Record and allow.
        entry.timestamps.push(now);
        entry.recent_choices.push((choice.to_string(), now));
        VoteCheckOutcome::Allow
    }

    /// Remove keys that have gone fully idle (all timestamps pruned away on
    /// the next access anyway, but this reclaims memory proactively for
    /// keys nobody will call `check` on again).
    pub fn sweep(&self) {
        let now = self.clock.now();
        let mut guard = self.state.lock().unwrap();
        let before = guard.len();
        guard.retain(|_, state| {
            state.timestamps.retain(|t| now.duration_since(*t) < self.config.rate_window);
            state.recent_choices.retain(|(_, t)| now.duration_since(*t) < self.config.duplicate_window);
            !state.is_empty()
        });
        let removed = before - guard.len();
        if removed > 0 {
            warn!(removed, "vote guard sweep reclaimed idle keys");
        }
    }
}
