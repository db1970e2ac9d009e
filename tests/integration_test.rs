// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// Integration tests exercising the court crates together, the way a real
/// session would be driven: store + generation client + orchestrator wired
/// up exactly as the `court` binary wires them, but against the in-memory
/// store and the forced mock generation path so these run with no network
/// access and no external services.
use std::sync::Arc;

use court_config::{RoleTokenCaps, RuntimeConfig, TtsProviderKind, WitnessCapConfig};
use court_generation::GenerationClient;
use court_orchestrator::{InstantSleeper, NoopTts, SessionRuntime};
use court_store::{CourtStore, InMemoryStore};
use court_types::{CaseType, CreateSessionParams, Phase, SessionStatus, VoteType};
use tokio_util::sync::CancellationToken;

fn config() -> RuntimeConfig {
    RuntimeConfig {
        database_url: None,
        openrouter_api_key: None,
        llm_models: vec![],
        llm_mock: true,
        tts_provider: TtsProviderKind::Noop,
        recordings_dir: "./recordings".into(),
        role_max_tokens: RoleTokenCaps::default(),
        token_cost_per_1k_usd: 0.0,
        witness: WitnessCapConfig::default(),
        judge_recap_cadence: 2,
        trust_proxy: false,
        replay_file: None,
        replay_speed: 1.0,
    }
}

fn runtime(store: Arc<dyn CourtStore>, seed: u64) -> SessionRuntime {
    let generation = Arc::new(GenerationClient::new(vec![], true));
    SessionRuntime::with_seed(
        store,
        generation,
        Arc::new(NoopTts),
        Arc::new(InstantSleeper),
        &config(),
        CancellationToken::new(),
        seed,
    )
}

#[tokio::test]
async fn a_full_criminal_session_reaches_a_final_ruling() {
    let store: Arc<dyn CourtStore> = Arc::new(InMemoryStore::new());
    let session = store
        .create_session(CreateSessionParams::new(
            "Did the defendant swap every office chair for a yoga ball overnight?",
            CaseType::Criminal,
        ))
        .await
        .expect("session creation should succeed with a topic passing moderation");

    let mut events = store.subscribe(&session.id).expect("session exists immediately after creation");

    let runtime = runtime(store.clone(), 7);
    runtime.run(session.id.clone()).await.expect("a session with no cancellation should complete");

    let finished = store.get_session(&session.id).await.unwrap().expect("session still exists");
    assert_eq!(finished.status, SessionStatus::Completed);
    assert_eq!(finished.phase, Phase::FinalRuling);
    assert!(finished.final_ruling.is_some());
    assert!(!finished.turn_ids.is_empty());

    // The event stream saw at least a phase transition and a turn recorded.
    let mut saw_turn = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event.payload, court_types::EventPayload::Turn { .. }) {
            saw_turn = true;
        }
    }
    assert!(saw_turn, "expected at least one Turn event on the broadcast stream");
}

#[tokio::test]
async fn cancelling_before_the_session_starts_leaves_it_unfailed() {
    let store: Arc<dyn CourtStore> = Arc::new(InMemoryStore::new());
    let session = store
        .create_session(CreateSessionParams::new(
            "Did the defendant's dog really eat the shared lease agreement?",
            CaseType::Civil,
        ))
        .await
        .unwrap();

    let generation = Arc::new(GenerationClient::new(vec![], true));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let runtime = SessionRuntime::with_seed(
        store.clone(),
        generation,
        Arc::new(NoopTts),
        Arc::new(InstantSleeper),
        &config(),
        cancel,
        11,
    );

    let result = runtime.run(session.id.clone()).await;
    assert!(matches!(result, Err(court_orchestrator::OrchestratorError::Cancelled)));

    let stored = store.get_session(&session.id).await.unwrap().unwrap();
    assert_ne!(stored.status, SessionStatus::Failed);
}

#[tokio::test]
async fn votes_cast_before_the_verdict_poll_closes_are_tallied_into_the_ruling() {
    let store: Arc<dyn CourtStore> = Arc::new(InMemoryStore::new());
    let session = store
        .create_session(CreateSessionParams::new(
            "Did the defendant relabel every can in the shared pantry as mystery soup?",
            CaseType::Criminal,
        ))
        .await
        .unwrap();
    store.start_session(&session.id).await.unwrap();
    for phase in [Phase::Openings, Phase::WitnessExam, Phase::Closings, Phase::VerdictVote] {
        store.set_phase(&session.id, phase, None).await.unwrap();
    }

    store.cast_vote(&session.id, VoteType::Verdict, "not_guilty").await.unwrap();
    store.cast_vote(&session.id, VoteType::Verdict, "not_guilty").await.unwrap();
    store.cast_vote(&session.id, VoteType::Verdict, "guilty").await.unwrap();

    let tallied = store.get_session(&session.id).await.unwrap().unwrap();
    let winner = court_orchestrator::argmax_over_legal_choices(
        &tallied.verdict_votes,
        CaseType::Criminal.verdict_choices().iter().map(|s| s.to_string()).collect::<Vec<_>>().as_slice(),
    );
    assert_eq!(winner.as_deref(), Some("not_guilty"));
}

#[test]
fn default_runtime_config_has_usable_role_budgets() {
    let cfg = config();
    assert!(cfg.role_max_tokens.judge > 0);
    assert!(cfg.role_max_tokens.witness > 0);
    assert!(cfg.witness.max_tokens > 0);
    assert!(cfg.token_cost_per_1k_usd >= 0.0);
}
