// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! In-memory session store: a map plus one bounded broadcast channel per
//! session.
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use court_types::{
    CourtError, CreateSessionParams, Event, EventPayload, NewTurn, Phase, RoleAssignments, Session,
    SessionId, SessionMetadata, SessionStatus, Turn, TurnId, VoteSnapshot, VoteSnapshots, VoteType,
    DEFAULT_SENTENCE_VOTE_WINDOW_MS, DEFAULT_VERDICT_VOTE_WINDOW_MS,
};
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::StoreError;
use crate::store::CourtStore;

/// Default sentence choices offered when `createSession` does not specify
/// `sentenceOptions` explicitly.
const DEFAULT_SENTENCE_OPTIONS: &[&str] = &["Fine", "Probation", "Community Service", "Incarceration"];

/// Events buffered per subscriber before the oldest is dropped. Generous
/// relative to a session's total event count, so a normally-paced consumer
/// never lags.
const CHANNEL_CAPACITY: usize = 512;

fn vote_type_for_phase(phase: Phase) -> Option<VoteType> {
    match phase {
        Phase::VerdictVote => Some(VoteType::Verdict),
        Phase::SentenceVote => Some(VoteType::Sentence),
        _ => None,
    }
}

struct SessionRecord {
    session: Session,
    turns: Vec<Turn>,
    tx: broadcast::Sender<Event>,
}

impl SessionRecord {
    fn emit(&self, payload: EventPayload) {
        let event = Event::new(self.session.id.clone(), Utc::now(), payload);
        // No receivers is not an error; the event is simply not seen.
        let _ = self.tx.send(event);
    }
}

pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()) }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CourtStore for InMemoryStore {
    async fn create_session(&self, params: CreateSessionParams) -> Result<Session, StoreError> {
        if params.topic.trim().len() < 10 {
            return Err(StoreError::Validation(CourtError::InvalidTopic));
        }
        let moderation = court_moderation::moderate(&params.topic);
        if moderation.flagged {
            return Err(StoreError::Validation(CourtError::TopicRejected { reasons: moderation.reasons }));
        }

        let roles = params.participants.unwrap_or_else(RoleAssignments::default_assignments);
        let sentence_options = params
            .sentence_options
            .unwrap_or_else(|| DEFAULT_SENTENCE_OPTIONS.iter().map(|s| s.to_string()).collect());

        let session = Session {
            id: SessionId::new(),
            topic: params.topic,
            status: SessionStatus::Pending,
            phase: Phase::CasePrompt,
            turn_ids: Vec::new(),
            roles,
            verdict_votes: HashMap::new(),
            sentence_votes: HashMap::new(),
            recap_turn_ids: Vec::new(),
            final_ruling: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failure_reason: None,
            metadata: SessionMetadata {
                case_type: params.case_type,
                sentence_options,
                verdict_vote_window_ms: params.verdict_vote_window_ms.unwrap_or(DEFAULT_VERDICT_VOTE_WINDOW_MS),
                sentence_vote_window_ms: params.sentence_vote_window_ms.unwrap_or(DEFAULT_SENTENCE_VOTE_WINDOW_MS),
                vote_snapshots: VoteSnapshots::default(),
            },
        };

        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        let record = SessionRecord { session: session.clone(), turns: Vec::new(), tx };
        record.emit(EventPayload::SessionCreated { topic: session.topic.clone(), case_type: session.metadata.case_type });

        self.sessions.write().unwrap().insert(session.id.clone(), record);
        Ok(session)
    }

    async fn start_session(&self, id: &SessionId) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let record = sessions.get_mut(id).ok_or(StoreError::Validation(CourtError::SessionNotFound))?;
        if record.session.status != SessionStatus::Pending {
            return Ok(record.session.clone());
        }
        record.session.status = SessionStatus::Running;
        let started_at = Utc::now();
        record.session.started_at = Some(started_at);
        record.emit(EventPayload::SessionStarted { started_at });
        Ok(record.session.clone())
    }

    async fn set_phase(
        &self,
        id: &SessionId,
        target: Phase,
        phase_duration_ms: Option<u64>,
    ) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let record = sessions.get_mut(id).ok_or(StoreError::Validation(CourtError::SessionNotFound))?;
        let from = record.session.phase;

        if !Phase::is_legal_transition(from, target) {
            return Err(StoreError::Validation(CourtError::InvalidPhaseTransition {
                from: from.to_string(),
                to: target.to_string(),
            }));
        }
        if from == target {
            return Ok(record.session.clone());
        }

        if let Some(vote_type) = vote_type_for_phase(from) {
            let votes = record.session.tally_for(vote_type).clone();
            let closed_at = Utc::now();
            record.session.metadata.vote_snapshots.set(vote_type, VoteSnapshot { closed_at, votes: votes.clone() });
            record.emit(EventPayload::VoteClosed { vote_type, closed_at, votes, next_phase: target });
            record.emit(EventPayload::AnalyticsEvent {
                name: "poll_closed".to_string(),
                poll_type: Some(vote_type),
                phase: Some(target),
                choice: None,
            });
        }

        record.session.phase = target;
        record.emit(EventPayload::PhaseChanged { from, to: target, phase_duration_ms });

        if let Some(vote_type) = vote_type_for_phase(target) {
            record.emit(EventPayload::AnalyticsEvent {
                name: "poll_started".to_string(),
                poll_type: Some(vote_type),
                phase: Some(target),
                choice: None,
            });
        }

        Ok(record.session.clone())
    }

    async fn add_turn(&self, new_turn: NewTurn) -> Result<Turn, StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let record = sessions
            .get_mut(&new_turn.session_id)
            .ok_or(StoreError::Validation(CourtError::SessionNotFound))?;

        let turn = Turn {
            id: TurnId::new(),
            session_id: new_turn.session_id,
            turn_number: record.turns.len(),
            speaker: new_turn.speaker,
            role: new_turn.role,
            phase: new_turn.phase,
            dialogue: new_turn.dialogue,
            created_at: Utc::now(),
            moderation: new_turn.moderation,
        };
        record.turns.push(turn.clone());
        record.session.turn_ids.push(turn.id.clone());
        record.emit(EventPayload::Turn { turn: turn.clone() });

        if let Some(annotation) = &turn.moderation {
            if !annotation.reasons.is_empty() {
                record.emit(EventPayload::ModerationAction {
                    turn_id: turn.id.clone(),
                    speaker: turn.speaker.clone(),
                    reasons: annotation.reasons.clone(),
                    phase: turn.phase,
                });
            }
        }

        Ok(turn)
    }

    async fn cast_vote(
        &self,
        session_id: &SessionId,
        vote_type: VoteType,
        choice: &str,
    ) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let record = sessions.get_mut(session_id).ok_or(StoreError::Validation(CourtError::SessionNotFound))?;

        if record.session.phase != vote_type.phase() {
            return Err(StoreError::Validation(CourtError::VoteRejected));
        }
        if !record.session.allowed_vote_choices(vote_type).iter().any(|c| c == choice) {
            return Err(StoreError::Validation(CourtError::VoteRejected));
        }

        *record.session.tally_for_mut(vote_type).entry(choice.to_string()).or_insert(0) += 1;
        let verdict_votes = record.session.verdict_votes.clone();
        let sentence_votes = record.session.sentence_votes.clone();
        record.emit(EventPayload::VoteUpdated {
            vote_type,
            choice: choice.to_string(),
            verdict_votes,
            sentence_votes,
        });
        record.emit(EventPayload::AnalyticsEvent {
            name: "vote_completed".to_string(),
            poll_type: Some(vote_type),
            phase: None,
            choice: Some(choice.to_string()),
        });

        Ok(record.session.clone())
    }

    async fn record_recap(&self, session_id: &SessionId, turn_id: TurnId, cycle_number: u32) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let record = sessions.get_mut(session_id).ok_or(StoreError::Validation(CourtError::SessionNotFound))?;
        record.session.add_recap_turn(turn_id.clone());
        record.emit(EventPayload::JudgeRecapEmitted { turn_id, cycle_number });
        Ok(())
    }

    async fn record_final_ruling(
        &self,
        session_id: &SessionId,
        verdict: String,
        sentence: String,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let record = sessions.get_mut(session_id).ok_or(StoreError::Validation(CourtError::SessionNotFound))?;
        record.session.final_ruling =
            Some(court_types::FinalRuling { verdict, sentence, decided_at: Utc::now() });
        Ok(())
    }

    async fn complete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let record = sessions.get_mut(id).ok_or(StoreError::Validation(CourtError::SessionNotFound))?;
        if matches!(record.session.status, SessionStatus::Completed | SessionStatus::Failed) {
            return Ok(());
        }
        let completed_at = Utc::now();
        record.session.status = SessionStatus::Completed;
        record.session.completed_at = Some(completed_at);
        record.emit(EventPayload::SessionCompleted { completed_at });
        Ok(())
    }

    async fn fail_session(&self, id: &SessionId, reason: String) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let record = sessions.get_mut(id).ok_or(StoreError::Validation(CourtError::SessionNotFound))?;
        if matches!(record.session.status, SessionStatus::Completed | SessionStatus::Failed) {
            return Ok(());
        }
        let failed_at = Utc::now();
        record.session.status = SessionStatus::Failed;
        record.session.failure_reason = Some(reason.clone());
        record.emit(EventPayload::SessionFailed { reason, failed_at });
        Ok(())
    }

    async fn emit_event(&self, session_id: &SessionId, payload: EventPayload) -> Result<(), StoreError> {
        let sessions = self.sessions.write().unwrap();
        let record = sessions.get(session_id).ok_or(StoreError::Validation(CourtError::SessionNotFound))?;
        record.emit(payload);
        Ok(())
    }

    fn subscribe(&self, session_id: &SessionId) -> Option<broadcast::Receiver<Event>> {
        let sessions = self.sessions.read().unwrap();
        sessions.get(session_id).map(|r| r.tx.subscribe())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self.sessions.read().unwrap().values().map(|r| r.session.clone()).collect())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().unwrap().get(id).map(|r| r.session.clone()))
    }

    async fn recover_interrupted_sessions(&self) -> Result<Vec<SessionId>, StoreError> {
        // Nothing survives process restart in the in-memory backend; there
        // is never anything to recover.
        warn!("recover_interrupted_sessions called on in-memory store; always empty");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_types::CaseType;

    fn params(topic: &str) -> CreateSessionParams {
        CreateSessionParams::new(topic, CaseType::Criminal)
    }

    #[tokio::test]
    async fn create_session_rejects_short_topic() {
        let store = InMemoryStore::new();
        let err = store.create_session(params("too short")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(CourtError::InvalidTopic)));
    }

    #[tokio::test]
    async fn create_session_rejects_flagged_topic() {
        let store = InMemoryStore::new();
        let err = store
            .create_session(params("the defendant is clearly a kike who stole the coffee"))
            .await
            .unwrap_err();
        match err {
            StoreError::Validation(CourtError::TopicRejected { reasons }) => {
                assert!(reasons.contains(&"slur".to_string()));
            }
            other => panic!("expected TopicRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn illegal_phase_transition_is_rejected_and_leaves_phase_unchanged() {
        let store = InMemoryStore::new();
        let session = store
            .create_session(params("Did the defendant replace all office coffee with soup?"))
            .await
            .unwrap();
        store.set_phase(&session.id, Phase::Openings, None).await.unwrap();
        store.set_phase(&session.id, Phase::WitnessExam, None).await.unwrap();
        store.set_phase(&session.id, Phase::Closings, None).await.unwrap();

        let err = store.set_phase(&session.id, Phase::WitnessExam, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(CourtError::InvalidPhaseTransition { .. })));

        let current = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(current.phase, Phase::Closings);
    }

    #[tokio::test]
    async fn vote_before_poll_phase_is_rejected() {
        let store = InMemoryStore::new();
        let session = store
            .create_session(params("Did the defendant replace all office coffee with soup?"))
            .await
            .unwrap();
        let err = store.cast_vote(&session.id, VoteType::Verdict, "guilty").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(CourtError::VoteRejected)));
    }

    #[tokio::test]
    async fn vote_with_a_choice_outside_the_allowed_set_is_rejected() {
        let store = InMemoryStore::new();
        let session = store
            .create_session(params("Did the defendant replace all office coffee with soup?"))
            .await
            .unwrap();
        store.start_session(&session.id).await.unwrap();
        store.set_phase(&session.id, Phase::Openings, None).await.unwrap();
        store.set_phase(&session.id, Phase::WitnessExam, None).await.unwrap();
        store.set_phase(&session.id, Phase::Closings, None).await.unwrap();
        store.set_phase(&session.id, Phase::VerdictVote, None).await.unwrap();

        let err = store.cast_vote(&session.id, VoteType::Verdict, "banana").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(CourtError::VoteRejected)));
    }

    #[tokio::test]
    async fn happy_path_produces_expected_snapshots_and_poll_events() {
        let store = InMemoryStore::new();
        let session = store
            .create_session(params("Did the defendant replace all office coffee with soup?"))
            .await
            .unwrap();
        let mut rx = store.subscribe(&session.id).unwrap();

        store.start_session(&session.id).await.unwrap();
        store.set_phase(&session.id, Phase::Openings, None).await.unwrap();
        store.set_phase(&session.id, Phase::WitnessExam, None).await.unwrap();
        store.set_phase(&session.id, Phase::Closings, None).await.unwrap();
        store.set_phase(&session.id, Phase::VerdictVote, None).await.unwrap();
        store.cast_vote(&session.id, VoteType::Verdict, "guilty").await.unwrap();
        store.cast_vote(&session.id, VoteType::Verdict, "not_guilty").await.unwrap();
        store.set_phase(&session.id, Phase::SentenceVote, None).await.unwrap();
        store.cast_vote(&session.id, VoteType::Sentence, "Fine").await.unwrap();
        store.set_phase(&session.id, Phase::FinalRuling, None).await.unwrap();

        let final_state = store.get_session(&session.id).await.unwrap().unwrap();
        let verdict_snapshot = final_state.metadata.vote_snapshots.get(VoteType::Verdict).unwrap();
        assert_eq!(verdict_snapshot.votes.get("guilty"), Some(&1));
        assert_eq!(verdict_snapshot.votes.get("not_guilty"), Some(&1));
        let sentence_snapshot = final_state.metadata.vote_snapshots.get(VoteType::Sentence).unwrap();
        assert_eq!(sentence_snapshot.votes.get("Fine"), Some(&1));

        let mut poll_started = 0;
        let mut vote_closed = 0;
        while let Ok(event) = rx.try_recv() {
            match event.payload {
                EventPayload::AnalyticsEvent { ref name, .. } if name == "poll_started" => poll_started += 1,
                EventPayload::VoteClosed { .. } => vote_closed += 1,
                _ => {}
            }
        }
        assert_eq!(poll_started, 2);
        assert_eq!(vote_closed, 2);
    }

    #[tokio::test]
    async fn complete_and_fail_session_are_idempotent_and_mutually_exclusive() {
        let store = InMemoryStore::new();
        let session = store
            .create_session(params("Did the defendant replace all office coffee with soup?"))
            .await
            .unwrap();
        store.complete_session(&session.id).await.unwrap();
        store.fail_session(&session.id, "too late".to_string()).await.unwrap();
        let state = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(state.status, SessionStatus::Completed);
        assert!(state.failure_reason.is_none());

        // Calling complete again is a no-op, not a second event / error.
        store.complete_session(&session.id).await.unwrap();
    }
}
