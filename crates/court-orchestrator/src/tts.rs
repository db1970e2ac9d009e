// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `safelySpeak`: a TTS seam whose failures are logged and counted,
//! never propagated — the orchestrator's step-by-step contract must keep
//! going even when the vendor adapter is unavailable.
use async_trait::async_trait;
use court_config::TtsProviderKind;
use tracing::warn;

#[async_trait]
pub trait TtsAdapter: Send + Sync {
    async fn speak(&self, text: &str) -> anyhow::Result<()>;
}

/// Selected when `TTS_PROVIDER` is unset or unrecognized. TTS vendor
/// integration is out of scope; this simply discards the text.
pub struct NoopTts;

#[async_trait]
impl TtsAdapter for NoopTts {
    async fn speak(&self, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A deterministic stand-in used in tests and local demos. Fails whenever
/// asked to speak an empty string, so the failure-swallow path is exercisable
/// without a real vendor.
pub struct MockTts;

#[async_trait]
impl TtsAdapter for MockTts {
    async fn speak(&self, text: &str) -> anyhow::Result<()> {
        if text.trim().is_empty() {
            anyhow::bail!("mock tts refuses to speak empty text");
        }
        Ok(())
    }
}

pub fn build_tts_adapter(kind: TtsProviderKind) -> Box<dyn TtsAdapter> {
    match kind {
        TtsProviderKind::Mock => Box::new(MockTts),
        TtsProviderKind::Noop => Box::new(NoopTts),
    }
}

/// Per-session success/failure counters, logged once on the orchestrator's
/// `finally` path.
#[derive(Debug, Default, Clone, Copy)]
pub struct TtsStats {
    pub successes: u32,
    pub failures: u32,
}

/// Speak `text` through `tts`, updating `stats` and logging failures as
/// `warn!` rather than returning them to the caller.
pub async fn safely_speak(tts: &dyn TtsAdapter, text: &str, stats: &mut TtsStats) {
    match tts.speak(text).await {
        Ok(()) => stats.successes += 1,
        Err(e) => {
            stats.failures += 1;
            warn!(error = %e, "tts call failed, continuing without audio");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_tts_always_succeeds() {
        let mut stats = TtsStats::default();
        safely_speak(&NoopTts, "All rise.", &mut stats).await;
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn mock_tts_failure_is_counted_not_propagated() {
        let mut stats = TtsStats::default();
        safely_speak(&MockTts, "", &mut stats).await;
        assert_eq!(stats.successes, 0);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test]
    async fn stats_accumulate_across_multiple_calls() {
        let mut stats = TtsStats::default();
        safely_speak(&MockTts, "All rise.", &mut stats).await;
        safely_speak(&MockTts, "", &mut stats).await;
        safely_speak(&MockTts, "Order.", &mut stats).await;
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.failures, 1);
    }

    #[test]
    fn build_tts_adapter_selects_by_kind() {
        let _noop = build_tts_adapter(TtsProviderKind::Noop);
        let _mock = build_tts_adapter(TtsProviderKind::Mock);
    }
}
