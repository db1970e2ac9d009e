// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{default_cast, CaseType, Phase, RoleArchetype, SessionId, TurnId, VoteType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One agent per named role, plus one to three witnesses in assignment order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignments {
    pub judge: String,
    pub prosecutor: String,
    pub defense: String,
    pub bailiff: String,
    pub witnesses: Vec<String>,
}

impl RoleAssignments {
    pub fn is_valid(&self) -> bool {
        (1..=3).contains(&self.witnesses.len())
    }

    /// Assignments drawn from the standard cast, used when `createSession`
    /// is not given explicit `participants`.
    pub fn default_assignments() -> Self {
        let cast = default_cast();
        let pick = |archetype: RoleArchetype| {
            cast.iter().find(|a| a.is_eligible_for(archetype)).expect("default cast covers every role").id.clone()
        };
        Self {
            judge: pick(RoleArchetype::Judge),
            prosecutor: pick(RoleArchetype::Prosecutor),
            defense: pick(RoleArchetype::Defense),
            bailiff: pick(RoleArchetype::Bailiff),
            witnesses: cast
                .iter()
                .filter(|a| a.is_eligible_for(RoleArchetype::Witness))
                .map(|a| a.id.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSnapshot {
    pub closed_at: DateTime<Utc>,
    pub votes: HashMap<String, u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSnapshots {
    pub verdict: Option<VoteSnapshot>,
    pub sentence: Option<VoteSnapshot>,
}

impl VoteSnapshots {
    pub fn get(&self, vote_type: VoteType) -> Option<&VoteSnapshot> {
        match vote_type {
            VoteType::Verdict => self.verdict.as_ref(),
            VoteType::Sentence => self.sentence.as_ref(),
        }
    }

    pub fn set(&mut self, vote_type: VoteType, snapshot: VoteSnapshot) {
        match vote_type {
            VoteType::Verdict => self.verdict = Some(snapshot),
            VoteType::Sentence => self.sentence = Some(snapshot),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalRuling {
    pub verdict: String,
    pub sentence: String,
    pub decided_at: DateTime<Utc>,
}

/// Session-scoped configuration, grouped the way `castVote`/`setPhase`
/// reference it (`metadata.sentenceOptions`, `metadata.verdictVoteWindowMs`,
/// `metadata.voteSnapshots`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub case_type: CaseType,
    pub sentence_options: Vec<String>,
    pub verdict_vote_window_ms: u64,
    pub sentence_vote_window_ms: u64,
    #[serde(default)]
    pub vote_snapshots: VoteSnapshots,
}

pub const DEFAULT_VERDICT_VOTE_WINDOW_MS: u64 = 45_000;
pub const DEFAULT_SENTENCE_VOTE_WINDOW_MS: u64 = 45_000;

/// Parameters accepted by `createSession`. Fields left `None` fall back to
/// the defaults above.
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub topic: String,
    pub case_type: CaseType,
    pub participants: Option<RoleAssignments>,
    pub sentence_options: Option<Vec<String>>,
    pub verdict_vote_window_ms: Option<u64>,
    pub sentence_vote_window_ms: Option<u64>,
}

impl CreateSessionParams {
    pub fn new(topic: impl Into<String>, case_type: CaseType) -> Self {
        Self {
            topic: topic.into(),
            case_type,
            participants: None,
            sentence_options: None,
            verdict_vote_window_ms: None,
            sentence_vote_window_ms: None,
        }
    }
}

/// Authoritative state for a single court session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub topic: String,
    pub status: SessionStatus,
    pub phase: Phase,
    pub turn_ids: Vec<TurnId>,
    pub roles: RoleAssignments,
    pub verdict_votes: HashMap<String, u32>,
    pub sentence_votes: HashMap<String, u32>,
    /// Set semantics enforced by `Session::add_recap_turn` (no duplicate ids);
    /// kept as a `Vec` to preserve insertion order deterministically.
    pub recap_turn_ids: Vec<TurnId>,
    pub final_ruling: Option<FinalRuling>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub metadata: SessionMetadata,
}

impl Session {
    pub fn turn_count(&self) -> usize {
        self.turn_ids.len()
    }

    pub fn tally_for(&self, vote_type: VoteType) -> &HashMap<String, u32> {
        match vote_type {
            VoteType::Verdict => &self.verdict_votes,
            VoteType::Sentence => &self.sentence_votes,
        }
    }

    pub fn tally_for_mut(&mut self, vote_type: VoteType) -> &mut HashMap<String, u32> {
        match vote_type {
            VoteType::Verdict => &mut self.verdict_votes,
            VoteType::Sentence => &mut self.sentence_votes,
        }
    }

    /// Append `turn_id` to `recapTurnIds` with set semantics (idempotent).
    pub fn add_recap_turn(&mut self, turn_id: TurnId) {
        if !self.recap_turn_ids.contains(&turn_id) {
            self.recap_turn_ids.push(turn_id);
        }
    }

    pub fn allowed_vote_choices(&self, vote_type: VoteType) -> Vec<String> {
        match vote_type {
            VoteType::Verdict => self
                .metadata
                .case_type
                .verdict_choices()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            VoteType::Sentence => self.metadata.sentence_options.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        Session {
            id: SessionId::from("s1"),
            topic: "t".into(),
            status: SessionStatus::Pending,
            phase: Phase::CasePrompt,
            turn_ids: vec![],
            roles: RoleAssignments {
                judge: "j".into(),
                prosecutor: "p".into(),
                defense: "d".into(),
                bailiff: "b".into(),
                witnesses: vec!["w1".into()],
            },
            verdict_votes: HashMap::new(),
            sentence_votes: HashMap::new(),
            recap_turn_ids: vec![],
            final_ruling: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failure_reason: None,
            metadata: SessionMetadata {
                case_type: CaseType::Criminal,
                sentence_options: vec!["Fine".into(), "Probation".into()],
                verdict_vote_window_ms: DEFAULT_VERDICT_VOTE_WINDOW_MS,
                sentence_vote_window_ms: DEFAULT_SENTENCE_VOTE_WINDOW_MS,
                vote_snapshots: VoteSnapshots::default(),
            },
        }
    }

    #[test]
    fn add_recap_turn_is_idempotent() {
        let mut s = sample();
        let id = TurnId::from("t1");
        s.add_recap_turn(id.clone());
        s.add_recap_turn(id.clone());
        assert_eq!(s.recap_turn_ids, vec![id]);
    }

    #[test]
    fn allowed_vote_choices_for_criminal_case() {
        let s = sample();
        assert_eq!(s.allowed_vote_choices(VoteType::Verdict), vec!["guilty", "not_guilty"]);
        assert_eq!(s.allowed_vote_choices(VoteType::Sentence), vec!["Fine", "Probation"]);
    }

    #[test]
    fn default_assignments_cover_all_roles_and_three_witnesses() {
        let roles = RoleAssignments::default_assignments();
        assert!(roles.is_valid());
        assert_eq!(roles.witnesses.len(), 3);
        assert_eq!(roles.judge, "judge-1");
    }

    #[test]
    fn role_assignments_reject_too_many_witnesses() {
        let mut roles = sample().roles;
        roles.witnesses = vec!["w1".into(), "w2".into(), "w3".into(), "w4".into()];
        assert!(!roles.is_valid());
    }
}
