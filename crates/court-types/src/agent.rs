// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::RoleArchetype;

/// Static catalog entry: an agent id, a display name, a descriptive role
/// label, and the set of role archetypes this agent is eligible to fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub display_name: String,
    pub role_label: String,
    pub archetypes: Vec<RoleArchetype>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        role_label: impl Into<String>,
        archetypes: Vec<RoleArchetype>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role_label: role_label.into(),
            archetypes,
        }
    }

    pub fn is_eligible_for(&self, archetype: RoleArchetype) -> bool {
        self.archetypes.contains(&archetype)
    }
}

/// The standard cast used when a session does not specify custom participants.
pub fn default_cast() -> Vec<Agent> {
    vec![
        Agent::new("judge-1", "Judge Alden Crane", "Presiding Judge", vec![RoleArchetype::Judge]),
        Agent::new(
            "prosecutor-1",
            "ADA Priya Okonkwo",
            "Prosecuting Attorney",
            vec![RoleArchetype::Prosecutor],
        ),
        Agent::new(
            "defense-1",
            "Defense Counsel Marcus Veil",
            "Defense Attorney",
            vec![RoleArchetype::Defense],
        ),
        Agent::new("bailiff-1", "Bailiff Dot Reyes", "Court Bailiff", vec![RoleArchetype::Bailiff]),
        Agent::new("witness-1", "Witness Uno Park", "Witness", vec![RoleArchetype::Witness]),
        Agent::new("witness-2", "Witness Bea Tran", "Witness", vec![RoleArchetype::Witness]),
        Agent::new("witness-3", "Witness Cy Ndiaye", "Witness", vec![RoleArchetype::Witness]),
    ]
}
