//! idefi Core - Agent lifecycle for the iDeFi agent backend
//!
//! This crate provides the core functionality behind the iDeFi agent API:
//!
//! - **Agent**: Tiers (Free, Standard, Smart, Quantum, Beta), roles, manifests,
//!   the per-agent task runtime and the in-memory registry
//! - **Factory**: Template store and sequential agent file creation
//! - **Image**: NFT image prompts and generation
//! - **Tracking**: Creation counters persisted to a JSON file
//! - **Wallet**: Ethereum address and EOA validation, CSV address lists
//! - **Integrations**: Clients for OpenAI, Etherscan, Firebase and the idefi APIs
//! - **Config**: File and environment configuration
//!
//! # Lifecycle
//!
//! ```text
//! request → validate → factory (template + image + tracking) → spawn → registry
//! task    → registry lookup → agent mailbox → reply
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod factory;
pub mod image;
pub mod integrations;
pub mod tracking;
pub mod wallet;

pub use agent::{
    AgentContext, AgentHandle, AgentMailbox, AgentManifest, AgentRecord, AgentRegistry,
    AgentState, AgentStatus, Role, TaskKind, Tier,
};
pub use config::{IdefiConfig, Secrets};
pub use error::{
    AgentError, ConfigError, ExternalError, FactoryError, IdefiError, Result, TrackingError,
    ValidationError,
};
pub use factory::{AgentFactory, CreatedAgent, TemplateStore};
pub use image::{ImageGenerator, ImageSubject};
pub use integrations::Services;
pub use tracking::{TrackingCounters, TrackingStore};
pub use wallet::EoaValidator;

/// Returns the version of idefi-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_behaviour_mapping() {
        assert_eq!(TaskKind::for_tier(Tier::Free), TaskKind::Simple);
        assert_eq!(TaskKind::for_tier(Tier::Beta), TaskKind::Simple);
        assert_eq!(TaskKind::for_tier(Tier::Standard), TaskKind::Standard);
        assert_eq!(TaskKind::for_tier(Tier::Smart), TaskKind::Advanced);
        assert_eq!(TaskKind::for_tier(Tier::Quantum), TaskKind::Quantum);
    }

    #[test]
    fn test_role_requirements() {
        let required: Vec<Tier> = Tier::ALL
            .iter()
            .copied()
            .filter(Tier::requires_role)
            .collect();
        assert_eq!(required, vec![Tier::Smart, Tier::Beta]);
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
