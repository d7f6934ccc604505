//! Tracking counters

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::Role;

/// Counts of generated agents, as stored in the tracking file
///
/// ```json
/// {"total_agents": 3, "roles": {"Miner": 2, "Builder": 1, ...}, "multi_role_agents": 0}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingCounters {
    #[serde(default)]
    pub total_agents: u64,
    #[serde(default)]
    pub roles: BTreeMap<Role, u64>,
    #[serde(default)]
    pub multi_role_agents: u64,
}

impl Default for TrackingCounters {
    fn default() -> Self {
        Self {
            total_agents: 0,
            roles: Role::ALL.iter().map(|role| (*role, 0)).collect(),
            multi_role_agents: 0,
        }
    }
}

impl TrackingCounters {
    /// Make sure every role has an entry
    pub fn normalized(mut self) -> Self {
        for role in Role::ALL {
            self.roles.entry(role).or_insert(0);
        }
        self
    }

    /// Count one generated agent
    pub fn record(&mut self, role: Role, multi_role: bool) {
        self.total_agents += 1;
        *self.roles.entry(role).or_insert(0) += 1;
        if multi_role {
            self.multi_role_agents += 1;
        }
    }

    pub fn role_count(&self, role: Role) -> u64 {
        self.roles.get(&role).copied().unwrap_or(0)
    }

    /// `total_agents` equals the sum of the role counts, unless multi-role
    /// agents were counted
    pub fn is_consistent(&self) -> bool {
        self.multi_role_agents > 0 || self.total_agents == self.roles.values().sum::<u64>()
    }
}
