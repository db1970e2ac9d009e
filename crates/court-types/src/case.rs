// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    Criminal,
    Civil,
}

impl CaseType {
    /// The allowed verdict choices for this case type.
    pub fn verdict_choices(&self) -> &'static [&'static str] {
        match self {
            CaseType::Criminal => &["guilty", "not_guilty"],
            CaseType::Civil => &["liable", "not_liable"],
        }
    }
}

/// The two polls a session runs, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    Verdict,
    Sentence,
}

impl VoteType {
    /// The phase in which this poll's votes are accepted.
    pub fn phase(&self) -> Phase {
        match self {
            VoteType::Verdict => Phase::VerdictVote,
            VoteType::Sentence => Phase::SentenceVote,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Verdict => "verdict",
            VoteType::Sentence => "sentence",
        }
    }

    pub fn parse(s: &str) -> Option<VoteType> {
        match s {
            "verdict" => Some(VoteType::Verdict),
            "sentence" => Some(VoteType::Sentence),
            _ => None,
        }
    }
}

impl std::fmt::Display for VoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Eligibility tag used to assign concrete agents to roles at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleArchetype {
    Judge,
    Prosecutor,
    Defense,
    Witness,
    Bailiff,
}

impl RoleArchetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleArchetype::Judge => "judge",
            RoleArchetype::Prosecutor => "prosecutor",
            RoleArchetype::Defense => "defense",
            RoleArchetype::Witness => "witness",
            RoleArchetype::Bailiff => "bailiff",
        }
    }
}

impl std::fmt::Display for RoleArchetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criminal_choices() {
        assert_eq!(CaseType::Criminal.verdict_choices(), &["guilty", "not_guilty"]);
    }

    #[test]
    fn civil_choices() {
        assert_eq!(CaseType::Civil.verdict_choices(), &["liable", "not_liable"]);
    }

    #[test]
    fn vote_type_maps_to_phase() {
        assert_eq!(VoteType::Verdict.phase(), Phase::VerdictVote);
        assert_eq!(VoteType::Sentence.phase(), Phase::SentenceVote);
    }

    #[test]
    fn vote_type_parse_round_trips() {
        assert_eq!(VoteType::parse("verdict"), Some(VoteType::Verdict));
        assert_eq!(VoteType::parse("sentence"), Some(VoteType::Sentence));
        assert_eq!(VoteType::parse("bogus"), None);
    }
}
