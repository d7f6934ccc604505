//! Registry of running agents, keyed by tier and name

use std::collections::{BTreeMap, HashMap};

use super::{AgentHandle, AgentMailbox, AgentStatus, Tier};
use crate::error::AgentError;

/// Running agents grouped by tier
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<Tier, BTreeMap<String, AgentHandle>>,
}

impl AgentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Register a running agent
    ///
    /// Returns the handle previously registered under the same tier and
    /// name, so the caller can shut it down.
    pub fn register(&mut self, handle: AgentHandle) -> Option<AgentHandle> {
        let name = handle.name().to_string();
        let previous = self
            .agents
            .entry(handle.tier())
            .or_default()
            .insert(name.clone(), handle);
        if previous.is_some() {
            tracing::warn!(%name, "replaced an existing agent with the same name");
        }
        previous
    }

    /// Mailbox of the agent registered under `tier` and `name`
    pub fn lookup(&self, tier: Tier, name: &str) -> Result<AgentMailbox, AgentError> {
        self.agents
            .get(&tier)
            .and_then(|agents| agents.get(name))
            .map(AgentHandle::mailbox)
            .ok_or_else(|| AgentError::NotFound {
                tier,
                name: name.to_string(),
            })
    }

    /// First agent named `name`, searching tiers in registry order
    pub fn find_by_name(&self, name: &str) -> Result<(Tier, AgentMailbox), AgentError> {
        Tier::ALL
            .iter()
            .find_map(|tier| {
                self.agents
                    .get(tier)
                    .and_then(|agents| agents.get(name))
                    .map(|handle| (*tier, handle.mailbox()))
            })
            .ok_or_else(|| AgentError::NotFoundByName(name.to_string()))
    }

    /// Status of every agent, with an entry for every tier
    pub fn status_all(&self) -> BTreeMap<Tier, BTreeMap<String, AgentStatus>> {
        Tier::ALL
            .iter()
            .map(|tier| {
                let statuses = self
                    .agents
                    .get(tier)
                    .map(|agents| {
                        agents
                            .iter()
                            .map(|(name, handle)| (name.clone(), handle.status()))
                            .collect()
                    })
                    .unwrap_or_default();
                (*tier, statuses)
            })
            .collect()
    }

    /// Status of one agent
    pub fn status_of(&self, tier: Tier, name: &str) -> Result<AgentStatus, AgentError> {
        self.lookup(tier, name).map(|mailbox| mailbox.status())
    }

    /// Number of registered agents
    pub fn count(&self) -> usize {
        self.agents.values().map(BTreeMap::len).sum()
    }

    /// Number of registered agents of one tier
    pub fn count_tier(&self, tier: Tier) -> usize {
        self.agents.get(&tier).map(BTreeMap::len).unwrap_or(0)
    }

    /// Remove every agent, handing the handles back for shutdown
    pub fn drain(&mut self) -> Vec<AgentHandle> {
        self.agents
            .drain()
            .flat_map(|(_, agents)| agents.into_values())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentContext, AgentManifest, AgentRecord, AgentState, Role};
    use crate::integrations::fake::FakeServices;
    use chrono::Utc;
    use serde_json::json;
    use std::path::PathBuf;

    fn spawn(tier: Tier, name: &str, fakes: &FakeServices) -> AgentHandle {
        let manifest = AgentManifest::parse(&format!(
            "[agent]\nname = \"{}\"\ntier = \"{}\"\n\n[completion]\nmodel = \"gpt-4o-mini\"\nmax_tokens = 50\n",
            name, tier
        ))
        .unwrap();
        let record = AgentRecord {
            id: 1,
            name: name.to_string(),
            tier,
            role: Some(Role::Scout),
            source_path: PathBuf::from(format!("{}.toml", name.to_lowercase())),
            image_url: String::new(),
            created_at: Utc::now(),
        };
        AgentHandle::spawn(record, &manifest, AgentContext::from(&fakes.services()), 4)
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let fakes = FakeServices::new();
        let mut registry = AgentRegistry::new();
        assert!(registry.register(spawn(Tier::Beta, "Agent1", &fakes)).is_none());

        let mailbox = registry.lookup(Tier::Beta, "Agent1").unwrap();
        let reply = mailbox.send(json!({"data": "x"})).await.unwrap();
        assert_eq!(reply["message"], "Performed a simple task with data: x");

        assert_eq!(
            registry.lookup(Tier::Free, "Agent1").unwrap_err(),
            AgentError::NotFound {
                tier: Tier::Free,
                name: "Agent1".to_string()
            }
        );
        for handle in registry.drain() {
            handle.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let fakes = FakeServices::new();
        let mut registry = AgentRegistry::new();
        registry.register(spawn(Tier::Free, "Agent1", &fakes));
        let previous = registry.register(spawn(Tier::Free, "Agent1", &fakes));
        assert!(previous.is_some());
        assert_eq!(registry.count(), 1);
        if let Some(previous) = previous {
            previous.shutdown().await;
        }
        for handle in registry.drain() {
            handle.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_find_by_name_tier_order() {
        let fakes = FakeServices::new();
        let mut registry = AgentRegistry::new();
        registry.register(spawn(Tier::Beta, "Agent1", &fakes));
        registry.register(spawn(Tier::Standard, "Agent1", &fakes));

        let (tier, _) = registry.find_by_name("Agent1").unwrap();
        assert_eq!(tier, Tier::Standard);
        assert_eq!(
            registry.find_by_name("Nobody").unwrap_err(),
            AgentError::NotFoundByName("Nobody".to_string())
        );
        for handle in registry.drain() {
            handle.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_status_all_lists_every_tier() {
        let fakes = FakeServices::new();
        let mut registry = AgentRegistry::new();
        registry.register(spawn(Tier::Quantum, "QAgent1", &fakes));

        let all = registry.status_all();
        assert_eq!(all.len(), Tier::ALL.len());
        assert!(all[&Tier::Free].is_empty());
        assert_eq!(all[&Tier::Quantum]["QAgent1"].state, AgentState::Idle);
        assert_eq!(registry.count_tier(Tier::Quantum), 1);

        for handle in registry.drain() {
            handle.shutdown().await;
        }
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_status_of() {
        let fakes = FakeServices::new();
        let mut registry = AgentRegistry::new();
        registry.register(spawn(Tier::Smart, "Agent7", &fakes));
        let status = registry.status_of(Tier::Smart, "Agent7").unwrap();
        assert_eq!(status.role, Some(Role::Scout));
        assert!(registry.status_of(Tier::Smart, "Agent8").is_err());
        for handle in registry.drain() {
            handle.shutdown().await;
        }
    }
}
