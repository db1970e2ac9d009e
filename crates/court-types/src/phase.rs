// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The session phase graph.
use serde::{Deserialize, Serialize};

/// A state of the session state machine, ordered as below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CasePrompt,
    Openings,
    WitnessExam,
    EvidenceReveal,
    Closings,
    VerdictVote,
    SentenceVote,
    FinalRuling,
}

/// Canonical phase ordering. `EvidenceReveal` may be skipped directly from
/// `WitnessExam` to `Closings`; every other edge must be the next entry in
/// this sequence (or a no-op self-transition).
const ORDER: [Phase; 8] = [
    Phase::CasePrompt,
    Phase::Openings,
    Phase::WitnessExam,
    Phase::EvidenceReveal,
    Phase::Closings,
    Phase::VerdictVote,
    Phase::SentenceVote,
    Phase::FinalRuling,
];

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::CasePrompt => "case_prompt",
            Phase::Openings => "openings",
            Phase::WitnessExam => "witness_exam",
            Phase::EvidenceReveal => "evidence_reveal",
            Phase::Closings => "closings",
            Phase::VerdictVote => "verdict_vote",
            Phase::SentenceVote => "sentence_vote",
            Phase::FinalRuling => "final_ruling",
        }
    }

    pub fn parse(s: &str) -> Option<Phase> {
        ORDER.into_iter().find(|p| p.as_str() == s)
    }

    fn index(&self) -> usize {
        ORDER.iter().position(|p| p == self).expect("Phase is always in ORDER")
    }

    /// The successor phase in the canonical sequence, or `None` for `final_ruling`.
    pub fn next(&self) -> Option<Phase> {
        ORDER.get(self.index() + 1).copied()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::FinalRuling)
    }

    /// Is `from -> to` a legal edge of the phase graph?
    ///
    /// Legal iff `to == from` (no-op), `to` is the immediate successor of
    /// `from`, or `from` is `witness_exam` and `to` is `closings` (the single
    /// allowed skip over `evidence_reveal`).
    pub fn is_legal_transition(from: Phase, to: Phase) -> bool {
        if from == to {
            return true;
        }
        if from.next() == Some(to) {
            return true;
        }
        if from == Phase::WitnessExam && to == Phase::Closings {
            return true;
        }
        false
    }

    /// Is this phase one of the two time-windowed poll phases?
    pub fn is_vote_phase(&self) -> bool {
        matches!(self, Phase::VerdictVote | Phase::SentenceVote)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
