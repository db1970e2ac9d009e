// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod agent;
mod case;
mod error;
mod event;
mod ids;
mod phase;
mod prompt_bank;
mod session;
mod turn;

pub use agent::{default_cast, Agent};
pub use case::{CaseType, RoleArchetype, VoteType};
pub use error::CourtError;
pub use event::{CapReason, Event, EventPayload};
pub use ids::{EventId, SessionId, TurnId};
pub use phase::Phase;
pub use prompt_bank::PromptBankEntry;
pub use session::{
    CreateSessionParams, FinalRuling, RoleAssignments, Session, SessionMetadata, SessionStatus,
    VoteSnapshot, VoteSnapshots, DEFAULT_SENTENCE_VOTE_WINDOW_MS, DEFAULT_VERDICT_VOTE_WINDOW_MS,
};
pub use turn::{ModerationAnnotation, NewTurn, Turn};
