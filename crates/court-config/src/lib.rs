// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Runtime configuration, read once at startup from environment variables
//! and shared behind an `Arc` with everything that needs it.
use std::path::PathBuf;

use tracing::warn;

/// Selects the TTS adapter; vendor integration itself is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProviderKind {
    Noop,
    Mock,
}

impl TtsProviderKind {
    fn parse(s: &str) -> Self {
        match s {
            "mock" => TtsProviderKind::Mock,
            _ => TtsProviderKind::Noop,
        }
    }
}

/// Per-role token budgets.
#[derive(Debug, Clone, Copy)]
pub struct RoleTokenCaps {
    pub default: u32,
    pub judge: u32,
    pub prosecutor: u32,
    pub defense: u32,
    pub witness: u32,
    pub bailiff: u32,
}

impl Default for RoleTokenCaps {
    fn default() -> Self {
        Self { default: 260, judge: 220, prosecutor: 220, defense: 220, witness: 160, bailiff: 120 }
    }
}

/// Witness-response cap.
#[derive(Debug, Clone)]
pub struct WitnessCapConfig {
    pub max_tokens: u32,
    pub max_seconds: u32,
    pub tokens_per_second: f64,
    pub truncation_marker: String,
}

impl Default for WitnessCapConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            max_seconds: 45,
            tokens_per_second: 3.0,
            truncation_marker: "… [truncated]".to_string(),
        }
    }
}

/// The full environment-sourced runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Empty/unset selects `court-store`'s in-memory backend.
    pub database_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    /// Ordered model identifiers tried in `GenerationClient`'s fallback chain.
    pub llm_models: Vec<String>,
    /// Force the mock generation path even when models/key are configured.
    pub llm_mock: bool,
    pub tts_provider: TtsProviderKind,
    pub recordings_dir: PathBuf,
    pub role_max_tokens: RoleTokenCaps,
    pub token_cost_per_1k_usd: f64,
    pub witness: WitnessCapConfig,
    pub judge_recap_cadence: u32,
    pub trust_proxy: bool,
    pub replay_file: Option<PathBuf>,
    pub replay_speed: f64,
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_u32(name: &str, default: u32) -> u32 {
    env_string(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env_string(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_string(name) {
        Some(v) => v.eq_ignore_ascii_case("true") || v == "1",
        None => default,
    }
}

impl RuntimeConfig {
    /// Build configuration from the current process environment, falling
    /// back to sensible defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = RoleTokenCaps::default();
        let witness_defaults = WitnessCapConfig::default();

        let mut judge_recap_cadence = env_u32("JUDGE_RECAP_CADENCE", 3);
        if judge_recap_cadence < 1 {
            warn!(configured = judge_recap_cadence, "JUDGE_RECAP_CADENCE must be >= 1, clamping to 1");
            judge_recap_cadence = 1;
        }

        let llm_models = env_string("LLM_MODELS")
            .map(|csv| csv.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Ok(Self {
            database_url: env_string("DATABASE_URL"),
            openrouter_api_key: env_string("OPENROUTER_API_KEY"),
            llm_models,
            llm_mock: env_bool("LLM_MOCK", false),
            tts_provider: env_string("TTS_PROVIDER").map(|s| TtsProviderKind::parse(&s)).unwrap_or(TtsProviderKind::Noop),
            recordings_dir: env_string("RECORDINGS_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./recordings")),
            role_max_tokens: RoleTokenCaps {
                default: env_u32("ROLE_MAX_TOKENS_DEFAULT", defaults.default),
                judge: env_u32("ROLE_MAX_TOKENS_JUDGE", defaults.judge),
                prosecutor: env_u32("ROLE_MAX_TOKENS_PROSECUTOR", defaults.prosecutor),
                defense: env_u32("ROLE_MAX_TOKENS_DEFENSE", defaults.defense),
                witness: env_u32("ROLE_MAX_TOKENS_WITNESS", defaults.witness),
                bailiff: env_u32("ROLE_MAX_TOKENS_BAILIFF", defaults.bailiff),
            },
            token_cost_per_1k_usd: env_f64("TOKEN_COST_PER_1K_USD", 0.0),
            witness: WitnessCapConfig {
                max_tokens: env_u32("WITNESS_MAX_TOKENS", witness_defaults.max_tokens),
                max_seconds: env_u32("WITNESS_MAX_SECONDS", witness_defaults.max_seconds),
                tokens_per_second: env_f64("WITNESS_TOKENS_PER_SECOND", witness_defaults.tokens_per_second),
                truncation_marker: env_string("WITNESS_TRUNCATION_MARKER").unwrap_or(witness_defaults.truncation_marker),
            },
            judge_recap_cadence,
            trust_proxy: env_bool("TRUST_PROXY", false),
            replay_file: env_string("REPLAY_FILE").map(PathBuf::from),
            replay_speed: env_f64("REPLAY_SPEED", 1.0),
        })
    }
}

/// `min(requested, roleCap)` with a floor of 1, reporting which bound won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetSource {
    EnvRoleCap,
    Requested,
}

pub fn apply_role_budget(requested: u32, role_cap: u32) -> (u32, BudgetSource) {
    let capped = requested.min(role_cap).max(1);
    let source = if role_cap <= requested { BudgetSource::EnvRoleCap } else { BudgetSource::Requested };
    (capped, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests mutate process-wide environment variables; serialize them so
    // parallel test execution cannot observe another test's env state.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for key in [
            "DATABASE_URL",
            "OPENROUTER_API_KEY",
            "LLM_MODELS",
            "LLM_MOCK",
            "TTS_PROVIDER",
            "RECORDINGS_DIR",
            "ROLE_MAX_TOKENS_DEFAULT",
            "ROLE_MAX_TOKENS_JUDGE",
            "ROLE_MAX_TOKENS_PROSECUTOR",
            "ROLE_MAX_TOKENS_DEFENSE",
            "ROLE_MAX_TOKENS_WITNESS",
            "ROLE_MAX_TOKENS_BAILIFF",
            "TOKEN_COST_PER_1K_USD",
            "WITNESS_MAX_TOKENS",
            "WITNESS_MAX_SECONDS",
            "WITNESS_TOKENS_PER_SECOND",
            "WITNESS_TRUNCATION_MARKER",
            "JUDGE_RECAP_CADENCE",
            "TRUST_PROXY",
            "REPLAY_FILE",
            "REPLAY_SPEED",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_apply_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let cfg = RuntimeConfig::from_env().unwrap();
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.role_max_tokens.judge, 220);
        assert_eq!(cfg.role_max_tokens.witness, 160);
        assert_eq!(cfg.role_max_tokens.bailiff, 120);
        assert_eq!(cfg.role_max_tokens.default, 260);
        assert_eq!(cfg.judge_recap_cadence, 3);
        assert_eq!(cfg.replay_speed, 1.0);
        assert_eq!(cfg.tts_provider, TtsProviderKind::Noop);
    }

    #[test]
    fn llm_models_csv_is_split_and_trimmed() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("LLM_MODELS", "openrouter/gpt, openrouter/claude ,");
        let cfg = RuntimeConfig::from_env().unwrap();
        assert_eq!(cfg.llm_models, vec!["openrouter/gpt", "openrouter/claude"]);
        clear_all();
    }

    #[test]
    fn judge_recap_cadence_below_one_is_clamped() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("JUDGE_RECAP_CADENCE", "0");
        let cfg = RuntimeConfig::from_env().unwrap();
        assert_eq!(cfg.judge_recap_cadence, 1);
        clear_all();
    }

    #[test]
    fn role_budget_floors_at_one_and_reports_source() {
        assert_eq!(apply_role_budget(50, 220), (50, BudgetSource::Requested));
        assert_eq!(apply_role_budget(500, 220), (220, BudgetSource::EnvRoleCap));
        assert_eq!(apply_role_budget(0, 220), (1, BudgetSource::Requested));
    }
}
