//! Agent tier and role definitions

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Capability class of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Entry-level agent, simple tasks only
    Free,
    /// Standard agent, heavier data processing
    Standard,
    /// Smart agent, drives the analytics API
    Smart,
    /// Quantum agent, drives the quantum API
    Quantum,
    /// Beta agent, one of the five roles
    Beta,
}

impl Tier {
    /// Every tier, in registry order
    pub const ALL: [Tier; 5] = [
        Tier::Free,
        Tier::Standard,
        Tier::Smart,
        Tier::Quantum,
        Tier::Beta,
    ];

    /// Get a human-readable name for the tier
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Standard => "Standard",
            Tier::Smart => "Smart",
            Tier::Quantum => "Quantum",
            Tier::Beta => "Beta",
        }
    }

    /// Whether agents of this tier must be created with a role
    pub fn requires_role(&self) -> bool {
        matches!(self, Tier::Smart | Tier::Beta)
    }

    /// Directory (under the agents root) holding this tier's generated files
    pub fn directory(&self) -> &'static str {
        match self {
            Tier::Free => "free_agents",
            Tier::Standard => "standard_agents",
            Tier::Smart => "smart_agents",
            Tier::Quantum => "quantum_agents",
            Tier::Beta => "beta_agents",
        }
    }

    /// File name of this tier's template
    pub fn template_file(&self) -> &'static str {
        match self {
            Tier::Quantum => "agent_template_q.toml",
            Tier::Beta => "beta_agent_template.toml",
            _ => "agent_template.toml",
        }
    }

    /// Prefix of generated agent file names (`agent3.toml`, `qagent3.toml`)
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Tier::Quantum => "qagent",
            _ => "agent",
        }
    }

    /// Prefix of generated agent names (`Agent3`, `QAgent3`)
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Tier::Quantum => "QAgent",
            _ => "Agent",
        }
    }

    /// Max completion tokens an agent of this tier may request
    pub fn completion_budget(&self) -> u32 {
        match self {
            Tier::Free | Tier::Beta => 50,
            Tier::Standard => 100,
            Tier::Smart => 150,
            Tier::Quantum => 200,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Tier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidTier(s.to_string()))
    }
}

/// Specialization of a Beta or Smart agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Miner,
    Builder,
    Defender,
    Scout,
    Healer,
}

impl Role {
    /// Every role, in tracking order
    pub const ALL: [Role; 5] = [
        Role::Miner,
        Role::Builder,
        Role::Defender,
        Role::Scout,
        Role::Healer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Miner => "Miner",
            Role::Builder => "Builder",
            Role::Defender => "Defender",
            Role::Scout => "Scout",
            Role::Healer => "Healer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tier() {
        assert_eq!("Beta".parse::<Tier>().unwrap(), Tier::Beta);
        assert_eq!("quantum".parse::<Tier>().unwrap(), Tier::Quantum);
        assert_eq!(
            "AI".parse::<Tier>(),
            Err(ValidationError::InvalidTier("AI".to_string()))
        );
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("Miner".parse::<Role>().unwrap(), Role::Miner);
        assert_eq!(" healer ".parse::<Role>().unwrap(), Role::Healer);
        assert!("Wizard".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_requirement() {
        assert!(Tier::Beta.requires_role());
        assert!(Tier::Smart.requires_role());
        assert!(!Tier::Free.requires_role());
        assert!(!Tier::Quantum.requires_role());
    }

    #[test]
    fn test_quantum_naming() {
        assert_eq!(Tier::Quantum.file_prefix(), "qagent");
        assert_eq!(Tier::Quantum.name_prefix(), "QAgent");
        assert_eq!(Tier::Beta.file_prefix(), "agent");
    }
}
