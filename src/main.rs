// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use court_config::RuntimeConfig;
use court_generation::{GenerationClient, GenerationProvider, OpenRouterProvider};
use court_orchestrator::{build_tts_adapter, SessionRuntime, TokioSleeper};
use court_recorder::{load_replay_recording, RecorderManager};
use court_store::{CourtStore, InMemoryStore, SqlStore};
use court_types::{CreateSessionParams, SessionId, VoteType};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands, SessionsCommands};

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("court=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();
}

fn build_store(config: &RuntimeConfig) -> anyhow::Result<Arc<dyn CourtStore>> {
    match &config.database_url {
        Some(path) if !path.is_empty() => {
            let store = SqlStore::open(path).context("opening sqlite store")?;
            Ok(Arc::new(store))
        }
        _ => Ok(Arc::new(InMemoryStore::new())),
    }
}

fn build_generation_client(config: &RuntimeConfig) -> GenerationClient {
    let force_mock = config.llm_mock || config.openrouter_api_key.is_none() || config.llm_models.is_empty();
    let providers: Vec<Box<dyn GenerationProvider>> = match &config.openrouter_api_key {
        Some(api_key) if !force_mock => config
            .llm_models
            .iter()
            .map(|model| Box::new(OpenRouterProvider::new(model.clone(), api_key.clone())) as Box<dyn GenerationProvider>)
            .collect(),
        _ => vec![],
    };
    GenerationClient::new(providers, force_mock)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Sessions { command } => match command {
            SessionsCommands::Run { topic, case_type, auto_verdict, auto_sentence, record } => {
                run_sessions_run(topic, case_type.into(), auto_verdict, auto_sentence, record).await
            }
            SessionsCommands::Replay { file, speed } => run_sessions_replay(file, speed).await,
        },
    }
}

async fn run_sessions_run(
    topic: Option<String>,
    case_type: court_types::CaseType,
    auto_verdict: Option<String>,
    auto_sentence: Option<String>,
    record: bool,
) -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env()?;
    let store = build_store(&config)?;
    let generation = Arc::new(build_generation_client(&config));
    let tts = Arc::from(build_tts_adapter(config.tts_provider));
    let sleeper = Arc::new(TokioSleeper);
    let cancel = CancellationToken::new();

    let topic = match topic {
        Some(topic) => topic,
        None => {
            let bank = court_catalog::default_prompt_bank();
            let entry = court_catalog::select_next_safe_prompt(&bank, &[], 1, |e| e.case_type == case_type)
                .context("drawing a case prompt from the catalog")?;
            entry.case_prompt
        }
    };

    let session = store.create_session(CreateSessionParams::new(topic, case_type)).await.context("creating session")?;
    println!("{}", serde_json::json!({"event": "session_id", "id": session.id.as_str()}));

    let mut events = store.subscribe(&session.id).context("session vanished immediately after creation")?;
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
        }
    });

    let recorder = if record {
        let manager = Arc::new(RecorderManager::new(config.recordings_dir.clone()));
        let seed_rx = store.subscribe(&session.id).context("subscribing recorder")?;
        manager.start(session.id.clone(), vec![], seed_rx).await.context("starting recorder")?;
        Some(manager)
    } else {
        None
    };

    let runtime = SessionRuntime::new(store.clone(), generation, tts, sleeper, &config, cancel.clone());

    let auto_vote_store = store.clone();
    let auto_vote_id = session.id.clone();
    let auto_vote_task = tokio::spawn(async move {
        auto_cast_votes(auto_vote_store, auto_vote_id, auto_verdict, auto_sentence).await;
    });

    let result = runtime.run(session.id.clone()).await;
    let _ = auto_vote_task.await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    if let Some(manager) = &recorder {
        manager.stop(&session.id);
    }

    match result {
        Ok(()) => Ok(()),
        Err(e) => Err(anyhow::anyhow!(e.to_string())),
    }
}

/// Polls for the verdict/sentence vote phases and casts a single fixed vote
/// in each, so the demo can complete unattended.
async fn auto_cast_votes(
    store: Arc<dyn CourtStore>,
    session_id: SessionId,
    auto_verdict: Option<String>,
    auto_sentence: Option<String>,
) {
    if let Some(choice) = auto_verdict {
        if wait_for_phase(&store, &session_id, court_types::Phase::VerdictVote).await {
            let _ = store.cast_vote(&session_id, VoteType::Verdict, &choice).await;
        }
    }
    if let Some(choice) = auto_sentence {
        if wait_for_phase(&store, &session_id, court_types::Phase::SentenceVote).await {
            let _ = store.cast_vote(&session_id, VoteType::Sentence, &choice).await;
        }
    }
}

async fn wait_for_phase(store: &Arc<dyn CourtStore>, session_id: &SessionId, phase: court_types::Phase) -> bool {
    for _ in 0..200 {
        if let Ok(Some(session)) = store.get_session(session_id).await {
            if session.phase == phase {
                return true;
            }
            if session.phase.is_terminal() {
                return false;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn run_sessions_replay(file: PathBuf, speed: f64) -> anyhow::Result<()> {
    let frames = load_replay_recording(&file, speed).context("loading replay recording")?;
    let mut elapsed = 0u64;
    for frame in frames {
        if frame.delay_ms > elapsed {
            tokio::time::sleep(Duration::from_millis(frame.delay_ms - elapsed)).await;
            elapsed = frame.delay_ms;
        }
        println!("{}", serde_json::to_string(&frame.event)?);
    }
    Ok(())
}
