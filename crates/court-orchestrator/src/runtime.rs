// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The per-session orchestration coroutine. Implemented as linear
//! control flow over the `CourtStore` trait — a sequential await-point
//! loop rather than an explicit state-machine struct.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use court_config::{apply_role_budget, RoleTokenCaps, RuntimeConfig, WitnessCapConfig};
use court_generation::{GenerationClient, GenerationMessage, GenerationRequest, GenerationRole};
use court_store::CourtStore;
use court_types::{EventPayload, ModerationAnnotation, NewTurn, Phase, RoleArchetype, RoleAssignments, SessionId, Turn};
use rand::{rngs::StdRng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::OrchestratorError;
use crate::objections::detect_objection;
use crate::random_events::roll_random_event;
use crate::ruling::{argmax_over_legal_choices, ensure_mentions_both};
use crate::tts::{safely_speak, TtsAdapter, TtsStats};
use crate::witness_cap::apply_witness_cap;

const JUDGE_SYSTEM_PROMPT: &str = "You are the presiding judge in a courtroom roleplay. Speak with measured authority.";
const PROSECUTOR_SYSTEM_PROMPT: &str =
    "You are the prosecuting attorney in a courtroom roleplay. Argue the case against the defendant.";
const DEFENSE_SYSTEM_PROMPT: &str = "You are the defense attorney in a courtroom roleplay. Argue in favor of the defendant.";
const WITNESS_SYSTEM_PROMPT: &str = "You are a witness testifying in a courtroom roleplay. Answer questions in character.";
const BAILIFF_SYSTEM_PROMPT: &str = "You are the court bailiff in a courtroom roleplay. Keep order and make brief announcements.";

const DEFAULT_REQUESTED_TOKENS: u32 = 300;
const GENERATION_TEMPERATURE: f32 = 0.8;

/// Injectable suspension point for step pauses and poll windows, so tests
/// can collapse real-world delays to nothing.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Used in tests; every suspension point resolves immediately.
pub struct InstantSleeper;

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

fn role_cap_for(archetype: RoleArchetype, caps: &RoleTokenCaps) -> u32 {
    match archetype {
        RoleArchetype::Judge => caps.judge,
        RoleArchetype::Prosecutor => caps.prosecutor,
        RoleArchetype::Defense => caps.defense,
        RoleArchetype::Witness => caps.witness,
        RoleArchetype::Bailiff => caps.bailiff,
    }
}

/// Drives one session from `pending` through `completed`/`failed`. One
/// instance is constructed per session and consumed by a single
/// `tokio::spawn`ed task.
pub struct SessionRuntime {
    store: Arc<dyn CourtStore>,
    generation: Arc<GenerationClient>,
    tts: Arc<dyn TtsAdapter>,
    sleeper: Arc<dyn Sleeper>,
    role_caps: RoleTokenCaps,
    witness_cap_cfg: WitnessCapConfig,
    recap_cadence: u32,
    cancel: CancellationToken,
    rng: Mutex<StdRng>,
}

impl SessionRuntime {
    pub fn new(
        store: Arc<dyn CourtStore>,
        generation: Arc<GenerationClient>,
        tts: Arc<dyn TtsAdapter>,
        sleeper: Arc<dyn Sleeper>,
        config: &RuntimeConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            generation,
            tts,
            sleeper,
            role_caps: config.role_max_tokens,
            witness_cap_cfg: config.witness.clone(),
            recap_cadence: config.judge_recap_cadence.max(1),
            cancel,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Same as [`SessionRuntime::new`] but with a seeded RNG, for
    /// reproducible tests of random-event injection.
    pub fn with_seed(
        store: Arc<dyn CourtStore>,
        generation: Arc<GenerationClient>,
        tts: Arc<dyn TtsAdapter>,
        sleeper: Arc<dyn Sleeper>,
        config: &RuntimeConfig,
        cancel: CancellationToken,
        seed: u64,
    ) -> Self {
        let mut runtime = Self::new(store, generation, tts, sleeper, config, cancel);
        runtime.rng = Mutex::new(StdRng::seed_from_u64(seed));
        runtime
    }

    fn check_cancelled(&self) -> Result<(), OrchestratorError> {
        if self.cancel.is_cancelled() {
            Err(OrchestratorError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn cancellable_sleep(&self, ms: u64) -> Result<(), OrchestratorError> {
        tokio::select! {
            _ = self.sleeper.sleep(Duration::from_millis(ms)) => Ok(()),
            _ = self.cancel.cancelled() => Err(OrchestratorError::Cancelled),
        }
    }

    async fn generate_for_role(&self, archetype: RoleArchetype, system_prompt: &str, user_prompt: &str) -> String {
        let (max_tokens, _source) = apply_role_budget(DEFAULT_REQUESTED_TOKENS, role_cap_for(archetype, &self.role_caps));
        let request = GenerationRequest {
            messages: vec![
                GenerationMessage { role: GenerationRole::System, content: system_prompt.to_string() },
                GenerationMessage { role: GenerationRole::User, content: user_prompt.to_string() },
            ],
            temperature: GENERATION_TEMPERATURE,
            max_tokens,
        };
        self.generation.generate(request).await
    }

    /// Moderate the dialogue, persist the turn (store emits `turn` and, when
    /// the annotation is non-empty, `moderation_action`), and return it.
    async fn record_turn(
        &self,
        session_id: &SessionId,
        speaker: &str,
        role: &str,
        phase: Phase,
        dialogue: String,
    ) -> Result<Turn, OrchestratorError> {
        let moderation_result = court_moderation::moderate(&dialogue);
        let moderation = if moderation_result.reasons.is_empty() {
            None
        } else {
            Some(ModerationAnnotation { reasons: moderation_result.reasons })
        };
        let new_turn = NewTurn {
            session_id: session_id.clone(),
            speaker: speaker.to_string(),
            role: role.to_string(),
            phase,
            dialogue: moderation_result.sanitized,
            moderation,
        };
        Ok(self.store.add_turn(new_turn).await?)
    }

    /// Organic objections: after an adversarial attorney turn, see if
    /// it draws one, and if so record the opposing counsel's objection (when
    /// the triggering line was not already one) and the judge's ruling.
    async fn maybe_raise_objection(
        &self,
        session_id: &SessionId,
        roles: &RoleAssignments,
        dialogue: &str,
        speaker_archetype: RoleArchetype,
        phase: Phase,
    ) -> Result<(), OrchestratorError> {
        let Some(objection_type) = detect_objection(dialogue, &self.generation).await else {
            return Ok(());
        };

        let (opposing_id, opposing_role) = match speaker_archetype {
            RoleArchetype::Prosecutor => (&roles.defense, "defense"),
            RoleArchetype::Defense => (&roles.prosecutor, "prosecutor"),
            _ => return Ok(()),
        };

        let already_an_objection = dialogue.trim_start().to_ascii_uppercase().starts_with("OBJECTION");
        if !already_an_objection {
            let objection_text = format!("Objection: {objection_type}.");
            self.record_turn(session_id, opposing_id, opposing_role, phase, objection_text).await?;
        }

        let ruling_text = self
            .generate_for_role(
                RoleArchetype::Judge,
                JUDGE_SYSTEM_PROMPT,
                &format!("Rule sustained or overruled on the {objection_type} objection, with a brief reason."),
            )
            .await;
        self.record_turn(session_id, &roles.judge, "judge", phase, ruling_text).await?;
        Ok(())
    }

    /// Run the full seven-step courtroom script for `session_id`. Any
    /// unhandled error fails the session (except cancellation, which is a
    /// clean shutdown); TTS failures never reach this path.
    pub async fn run(&self, session_id: SessionId) -> Result<(), OrchestratorError> {
        let mut tts_stats = TtsStats::default();
        let result = self.run_inner(&session_id, &mut tts_stats).await;

        info!(
            session_id = %session_id.as_str(),
            tts_successes = tts_stats.successes,
            tts_failures = tts_stats.failures,
            "orchestrator run finished"
        );

        match result {
            Ok(()) => Ok(()),
            Err(OrchestratorError::Cancelled) => {
                warn!(session_id = %session_id.as_str(), "orchestrator run cancelled");
                Err(OrchestratorError::Cancelled)
            }
            Err(e) => {
                let message = e.to_string();
                error!(session_id = %session_id.as_str(), error = %message, "orchestrator run failed");
                if let Err(fail_err) = self.store.fail_session(&session_id, message).await {
                    error!(session_id = %session_id.as_str(), error = %fail_err, "failed to mark session failed");
                }
                Err(e)
            }
        }
    }

    async fn run_inner(&self, session_id: &SessionId, tts_stats: &mut TtsStats) -> Result<(), OrchestratorError> {
        self.check_cancelled()?;
        let session = self.store.start_session(session_id).await?;
        let roles = session.roles.clone();

        // 1. Case prompt.
        self.store.set_phase(session_id, Phase::CasePrompt, Some(8_000)).await?;
        self.record_turn(
            session_id,
            &roles.bailiff,
            "bailiff",
            Phase::CasePrompt,
            format!("All rise. This court is now in session to hear the matter of: {}", session.topic),
        )
        .await?;
        safely_speak(self.tts.as_ref(), "All rise.", tts_stats).await;
        self.cancellable_sleep(1_200).await?;

        // 2. Openings.
        self.store.set_phase(session_id, Phase::Openings, Some(30_000)).await?;
        safely_speak(self.tts.as_ref(), "Opening statements will now begin.", tts_stats).await;
        let prosecutor_opening = self
            .generate_for_role(
                RoleArchetype::Prosecutor,
                PROSECUTOR_SYSTEM_PROMPT,
                &format!("Deliver your opening statement for the case: {}", session.topic),
            )
            .await;
        self.record_turn(session_id, &roles.prosecutor, "prosecutor", Phase::Openings, prosecutor_opening.clone()).await?;
        self.maybe_raise_objection(session_id, &roles, &prosecutor_opening, RoleArchetype::Prosecutor, Phase::Openings).await?;
        self.cancellable_sleep(900).await?;
        let defense_opening = self
            .generate_for_role(
                RoleArchetype::Defense,
                DEFENSE_SYSTEM_PROMPT,
                &format!("Deliver your opening statement responding to the prosecution, for the case: {}", session.topic),
            )
            .await;
        self.record_turn(session_id, &roles.defense, "defense", Phase::Openings, defense_opening.clone()).await?;
        self.maybe_raise_objection(session_id, &roles, &defense_opening, RoleArchetype::Defense, Phase::Openings).await?;

        // 3. Witness examination.
        self.store.set_phase(session_id, Phase::WitnessExam, Some(40_000)).await?;
        safely_speak(self.tts.as_ref(), "The examination of witnesses will now begin.", tts_stats).await;

        let mut cycle: u32 = 0;
        for witness in &roles.witnesses {
            self.check_cancelled()?;
            cycle += 1;

            let question = self
                .generate_for_role(
                    RoleArchetype::Judge,
                    JUDGE_SYSTEM_PROMPT,
                    &format!("Ask {witness} a pointed question relevant to: {}", session.topic),
                )
                .await;
            self.record_turn(session_id, &roles.judge, "judge", Phase::WitnessExam, question).await?;
            self.cancellable_sleep(600).await?;

            let raw_response = self
                .generate_for_role(
                    RoleArchetype::Witness,
                    WITNESS_SYSTEM_PROMPT,
                    &format!("Answer the judge's question truthfully in character as {witness}."),
                )
                .await;
            let capped = apply_witness_cap(&raw_response, &self.witness_cap_cfg);
            let witness_turn =
                self.record_turn(session_id, witness, "witness", Phase::WitnessExam, capped.text.clone()).await?;
            if capped.truncated {
                self.store
                    .emit_event(
                        session_id,
                        EventPayload::WitnessResponseCapped {
                            turn_id: witness_turn.id.clone(),
                            original_tokens: capped.original_tokens,
                            capped_tokens: capped.capped_tokens,
                            reason: capped.reason,
                        },
                    )
                    .await?;
            }
            self.cancellable_sleep(600).await?;

            let cross = self
                .generate_for_role(
                    RoleArchetype::Prosecutor,
                    PROSECUTOR_SYSTEM_PROMPT,
                    &format!("Cross-examine {witness} based on their answer: {}", witness_turn.dialogue),
                )
                .await;
            self.record_turn(session_id, &roles.prosecutor, "prosecutor", Phase::WitnessExam, cross.clone()).await?;
            self.maybe_raise_objection(session_id, &roles, &cross, RoleArchetype::Prosecutor, Phase::WitnessExam).await?;
            self.cancellable_sleep(600).await?;

            let rebuttal = self
                .generate_for_role(
                    RoleArchetype::Defense,
                    DEFENSE_SYSTEM_PROMPT,
                    &format!("Respond to the prosecution's cross-examination of {witness}."),
                )
                .await;
            self.record_turn(session_id, &roles.defense, "defense", Phase::WitnessExam, rebuttal.clone()).await?;
            self.maybe_raise_objection(session_id, &roles, &rebuttal, RoleArchetype::Defense, Phase::WitnessExam).await?;

            if cycle % self.recap_cadence == 0 {
                let recap_body = self
                    .generate_for_role(
                        RoleArchetype::Judge,
                        JUDGE_SYSTEM_PROMPT,
                        "Summarize the witness examination so far for the court.",
                    )
                    .await;
                let recap_turn = self
                    .record_turn(session_id, &roles.judge, "judge", Phase::WitnessExam, format!("Recap: {recap_body}"))
                    .await?;
                self.store.record_recap(session_id, recap_turn.id.clone(), cycle).await?;
                safely_speak(self.tts.as_ref(), &recap_turn.dialogue, tts_stats).await;
            }

            let random_event = {
                let mut rng = self.rng.lock().unwrap();
                roll_random_event(&mut *rng).copied()
            };
            if let Some(event) = random_event {
                let extra = self.generate_for_role(RoleArchetype::Bailiff, BAILIFF_SYSTEM_PROMPT, event.instruction).await;
                self.record_turn(session_id, &roles.bailiff, "bailiff", Phase::WitnessExam, extra).await?;
            }

            self.cancellable_sleep(600).await?;
        }

        // 4. Closings.
        self.store.set_phase(session_id, Phase::Closings, Some(30_000)).await?;
        let prosecutor_closing =
            self.generate_for_role(RoleArchetype::Prosecutor, PROSECUTOR_SYSTEM_PROMPT, "Deliver your closing argument.").await;
        self.record_turn(session_id, &roles.prosecutor, "prosecutor", Phase::Closings, prosecutor_closing.clone()).await?;
        self.maybe_raise_objection(session_id, &roles, &prosecutor_closing, RoleArchetype::Prosecutor, Phase::Closings).await?;
        let defense_closing =
            self.generate_for_role(RoleArchetype::Defense, DEFENSE_SYSTEM_PROMPT, "Deliver your closing argument.").await;
        self.record_turn(session_id, &roles.defense, "defense", Phase::Closings, defense_closing.clone()).await?;
        self.maybe_raise_objection(session_id, &roles, &defense_closing, RoleArchetype::Defense, Phase::Closings).await?;

        // 5. Verdict vote.
        self.store.set_phase(session_id, Phase::VerdictVote, Some(session.metadata.verdict_vote_window_ms)).await?;
        self.record_turn(
            session_id,
            &roles.bailiff,
            "bailiff",
            Phase::VerdictVote,
            "The jury of spectators will now cast their verdict vote.".to_string(),
        )
        .await?;
        self.cancellable_sleep(session.metadata.verdict_vote_window_ms).await?;

        // 6. Sentence vote.
        self.store.set_phase(session_id, Phase::SentenceVote, Some(session.metadata.sentence_vote_window_ms)).await?;
        self.record_turn(
            session_id,
            &roles.bailiff,
            "bailiff",
            Phase::SentenceVote,
            "The jury of spectators will now cast their sentencing vote.".to_string(),
        )
        .await?;
        self.cancellable_sleep(session.metadata.sentence_vote_window_ms).await?;

        // 7. Final ruling.
        self.store.set_phase(session_id, Phase::FinalRuling, Some(20_000)).await?;
        let final_session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("session {} disappeared before final ruling", session_id.as_str()))?;

        let verdict_choices: Vec<String> =
            final_session.metadata.case_type.verdict_choices().iter().map(|s| s.to_string()).collect();
        let winning_verdict = argmax_over_legal_choices(&final_session.verdict_votes, &verdict_choices)
            .unwrap_or_else(|| verdict_choices[0].clone());
        let sentence_choices = &final_session.metadata.sentence_options;
        let winning_sentence = argmax_over_legal_choices(&final_session.sentence_votes, sentence_choices)
            .unwrap_or_else(|| sentence_choices.first().cloned().unwrap_or_else(|| "Fine".to_string()));

        self.store.record_final_ruling(session_id, winning_verdict.clone(), winning_sentence.clone()).await?;
        safely_speak(self.tts.as_ref(), &format!("The verdict is {winning_verdict}."), tts_stats).await;

        let ruling_draft = self
            .generate_for_role(
                RoleArchetype::Judge,
                JUDGE_SYSTEM_PROMPT,
                &format!(
                    "Deliver the court's final ruling. You must explicitly state both the verdict \"{winning_verdict}\" \
                     and the sentence \"{winning_sentence}\"."
                ),
            )
            .await;
        let ruling_text = ensure_mentions_both(ruling_draft, &winning_verdict, &winning_sentence);
        self.record_turn(session_id, &roles.judge, "judge", Phase::FinalRuling, ruling_text).await?;

        self.store.complete_session(session_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_store::InMemoryStore;
    use court_types::{CaseType, CreateSessionParams, SessionStatus};

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            database_url: None,
            openrouter_api_key: None,
            llm_models: vec![],
            llm_mock: true,
            tts_provider: court_config::TtsProviderKind::Noop,
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

    async fn runtime_over(store: Arc<dyn CourtStore>) -> (SessionRuntime, CancellationToken) {
        let generation = Arc::new(GenerationClient::new(vec![], true));
        let tts = Arc::new(crate::tts::NoopTts);
        let sleeper = Arc::new(InstantSleeper);
        let cancel = CancellationToken::new();
        let runtime = SessionRuntime::with_seed(store, generation, tts, sleeper, &config(), cancel.clone(), 99);
        (runtime, cancel)
    }

    #[tokio::test]
    async fn happy_path_completes_session_with_final_ruling() {
        let store: Arc<dyn CourtStore> = Arc::new(InMemoryStore::new());
        let session = store
            .create_session(CreateSessionParams::new("Did the defendant replace all office coffee with soup?", CaseType::Criminal))
            .await
            .unwrap();
        let (runtime, _cancel) = runtime_over(store.clone()).await;

        runtime.run(session.id.clone()).await.unwrap();

        let finished = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(finished.status, SessionStatus::Completed);
        assert_eq!(finished.phase, Phase::FinalRuling);
        let ruling = finished.final_ruling.expect("final ruling recorded");
        assert!(finished.metadata.case_type.verdict_choices().contains(&ruling.verdict.as_str()));
        assert!(finished.metadata.sentence_options.contains(&ruling.sentence));
        assert!(finished.turn_ids.len() > 10);
    }

    #[tokio::test]
    async fn cancellation_before_start_is_reported_and_session_is_not_failed() {
        let store: Arc<dyn CourtStore> = Arc::new(InMemoryStore::new());
        let session = store
            .create_session(CreateSessionParams::new("A dispute over a neighbor's fence line.", CaseType::Civil))
            .await
            .unwrap();
        let (runtime, cancel) = runtime_over(store.clone()).await;
        cancel.cancel();

        let result = runtime.run(session.id.clone()).await;
        assert!(matches!(result, Err(OrchestratorError::Cancelled)));

        let after = store.get_session(&session.id).await.unwrap().unwrap();
        assert_ne!(after.status, SessionStatus::Failed);
    }
}
