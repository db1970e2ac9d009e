// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The closed event catalog emitted by the session store.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, Phase, SessionId, Turn, TurnId, VoteType};

/// Which of the witness cap's two bounds determined the truncation length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapReason {
    Tokens,
    Seconds,
    None,
}

/// One entry in the closed event catalog.
///
/// The `type` discriminant is carried by serde's internal tagging so the
/// wire shape is `{ "type": "turn", "turnId": "...", ... }`, matching the
/// one-JSON-object-per-SSE-message / one-line-per-NDJSON-record contract.
/// Every variant corresponds 1:1 to a name in the closed catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    #[serde(rename_all = "camelCase")]
    SessionCreated {
        topic: String,
        case_type: crate::CaseType,
    },
    #[serde(rename_all = "camelCase")]
    SessionStarted {
        started_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    PhaseChanged {
        from: Phase,
        to: Phase,
        phase_duration_ms: Option<u64>,
    },
    Turn {
        turn: Turn,
    },
    #[serde(rename_all = "camelCase")]
    VoteUpdated {
        vote_type: VoteType,
        choice: String,
        verdict_votes: HashMap<String, u32>,
        sentence_votes: HashMap<String, u32>,
    },
    #[serde(rename_all = "camelCase")]
    VoteClosed {
        vote_type: VoteType,
        closed_at: DateTime<Utc>,
        votes: HashMap<String, u32>,
        next_phase: Phase,
    },
    #[serde(rename_all = "camelCase")]
    WitnessResponseCapped {
        turn_id: TurnId,
        original_tokens: usize,
        capped_tokens: usize,
        reason: CapReason,
    },
    #[serde(rename_all = "camelCase")]
    JudgeRecapEmitted {
        turn_id: TurnId,
        cycle_number: u32,
    },
    /// Generic analytics sink. `name` is one of `poll_started`, `poll_closed`,
    /// `vote_completed`; the remaining fields are populated as relevant and
    /// left `None` when not applicable to that `name`.
    #[serde(rename_all = "camelCase")]
    AnalyticsEvent {
        name: String,
        poll_type: Option<VoteType>,
        phase: Option<Phase>,
        choice: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ModerationAction {
        turn_id: TurnId,
        speaker: String,
        reasons: Vec<String>,
        phase: Phase,
    },
    #[serde(rename_all = "camelCase")]
    VoteSpamBlocked {
        client_id: String,
        vote_type: VoteType,
        reason: String,
        retry_after_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    SessionCompleted {
        completed_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    SessionFailed {
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

impl EventPayload {
    /// The catalog name of this event, e.g. `"phase_changed"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::SessionCreated { .. } => "session_created",
            EventPayload::SessionStarted { .. } => "session_started",
            EventPayload::PhaseChanged { .. } => "phase_changed",
            EventPayload::Turn { .. } => "turn",
            EventPayload::VoteUpdated { .. } => "vote_updated",
            EventPayload::VoteClosed { .. } => "vote_closed",
            EventPayload::WitnessResponseCapped { .. } => "witness_response_capped",
            EventPayload::JudgeRecapEmitted { .. } => "judge_recap_emitted",
            EventPayload::AnalyticsEvent { .. } => "analytics_event",
            EventPayload::ModerationAction { .. } => "moderation_action",
            EventPayload::VoteSpamBlocked { .. } => "vote_spam_blocked",
            EventPayload::SessionCompleted { .. } => "session_completed",
            EventPayload::SessionFailed { .. } => "session_failed",
        }
    }
}

/// A single state-change notification published on a session's event channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub session_id: SessionId,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(session_id: SessionId, at: DateTime<Utc>, payload: EventPayload) -> Self {
        Self { id: EventId::new(), session_id, at, payload }
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }
}
