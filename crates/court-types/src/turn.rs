// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Phase, SessionId, TurnId};

/// A moderation annotation attached to a turn whose dialogue was flagged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModerationAnnotation {
    pub reasons: Vec<String>,
}

/// One generated dialogue utterance by a single role at a single phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub session_id: SessionId,
    /// Monotonic, 0-based position within the session's turn list.
    pub turn_number: usize,
    pub speaker: String,
    pub role: String,
    pub phase: Phase,
    pub dialogue: String,
    pub created_at: DateTime<Utc>,
    pub moderation: Option<ModerationAnnotation>,
}

#[derive(Debug, Clone)]
pub struct NewTurn {
    pub session_id: SessionId,
    pub speaker: String,
    pub role: String,
    pub phase: Phase,
    pub dialogue: String,
    pub moderation: Option<ModerationAnnotation>,
}
