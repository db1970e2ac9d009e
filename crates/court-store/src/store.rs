// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use court_types::{CreateSessionParams, EventPayload, NewTurn, Phase, Session, SessionId, Turn, TurnId, VoteType};
use tokio::sync::broadcast;

use crate::error::StoreError;

/// The authoritative session store. Both backends implement this
/// trait; the orchestrator and CLI depend on the trait only.
///
/// All reads return owned copies; nothing here lets a caller mutate
/// internal state by holding a reference into it.
#[async_trait]
pub trait CourtStore: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams) -> Result<Session, StoreError>;

    /// `pending -> running`. A no-op returning the current session when it
    /// is already running or further along.
    async fn start_session(&self, id: &SessionId) -> Result<Session, StoreError>;

    /// Validate and apply a phase transition, emitting `phase_changed` and
    /// the poll-boundary analytics/`vote_closed` events.
    async fn set_phase(
        &self,
        id: &SessionId,
        target: Phase,
        phase_duration_ms: Option<u64>,
    ) -> Result<Session, StoreError>;

    async fn add_turn(&self, new_turn: NewTurn) -> Result<Turn, StoreError>;

    /// Accepted only when the session's current phase matches `vote_type`'s
    /// poll phase and `choice` is in the allowed set for that poll.
    async fn cast_vote(&self, session_id: &SessionId, vote_type: VoteType, choice: &str) -> Result<Session, StoreError>;

    async fn record_recap(&self, session_id: &SessionId, turn_id: TurnId, cycle_number: u32) -> Result<(), StoreError>;

    /// Writes `finalRuling`. Does not change status — the orchestrator calls
    /// `complete_session` separately, and always after this.
    async fn record_final_ruling(
        &self,
        session_id: &SessionId,
        verdict: String,
        sentence: String,
    ) -> Result<(), StoreError>;

    async fn complete_session(&self, id: &SessionId) -> Result<(), StoreError>;
    async fn fail_session(&self, id: &SessionId, reason: String) -> Result<(), StoreError>;

    /// Low-level hook for events the store does not generate natively
    /// (e.g. `witness_response_capped`, `vote_spam_blocked`).
    async fn emit_event(&self, session_id: &SessionId, payload: EventPayload) -> Result<(), StoreError>;

    /// Subscribe to this session's event stream. Returns `None` if the
    /// session does not exist. A lagged receiver drops the oldest buffered
    /// events rather than blocking the emitter.
    fn subscribe(&self, session_id: &SessionId) -> Option<broadcast::Receiver<court_types::Event>>;

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Ids of sessions persisted as `running` at startup, so the operator
    /// can decide whether to resume, fail, or discard them.
    async fn recover_interrupted_sessions(&self) -> Result<Vec<SessionId>, StoreError>;
}
