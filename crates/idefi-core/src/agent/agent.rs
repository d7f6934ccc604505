//! Agent record and status

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Role, Tier};

/// Lifecycle state of a running agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    /// Waiting for a message
    Idle,
    /// Handling a message
    Working,
    /// Task has exited; messages are no longer accepted
    Stopped,
}

impl AgentState {
    /// Check if the agent still accepts messages
    pub fn is_running(&self) -> bool {
        !matches!(self, AgentState::Stopped)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Idle => write!(f, "IDLE"),
            AgentState::Working => write!(f, "WORKING"),
            AgentState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// A created agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Sequential number within the tier directory
    pub id: u32,
    /// Registry name (unique within the tier)
    pub name: String,
    pub tier: Tier,
    pub role: Option<Role>,
    /// Generated agent file
    pub source_path: PathBuf,
    /// Generated NFT image
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl AgentRecord {
    /// Same record registered under a different name
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Point-in-time view of an agent, as returned by the status endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub name: String,
    pub tier: Tier,
    pub role: Option<Role>,
    pub state: AgentState,
    pub tasks_completed: u64,
    /// Kind of the last handled message
    pub last_task: Option<String>,
    pub synced_wallets: Vec<String>,
    pub custom_endpoints: BTreeMap<String, String>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl AgentStatus {
    /// Initial status of a freshly spawned agent
    pub fn new(record: &AgentRecord) -> Self {
        Self {
            name: record.name.clone(),
            tier: record.tier,
            role: record.role,
            state: AgentState::Idle,
            tasks_completed: 0,
            last_task: None,
            synced_wallets: Vec::new(),
            custom_endpoints: BTreeMap::new(),
            image_url: record.image_url.clone(),
            created_at: record.created_at,
            last_active_at: record.created_at,
        }
    }

    /// Mark a message as being handled
    pub fn begin(&mut self, task: &str) {
        self.state = AgentState::Working;
        self.last_task = Some(task.to_string());
        self.last_active_at = Utc::now();
    }

    /// Mark the current message as handled
    pub fn finish(&mut self) {
        self.state = AgentState::Idle;
        self.tasks_completed += 1;
        self.last_active_at = Utc::now();
    }

    /// Remember wallets, skipping ones already known
    pub fn add_wallets<I, S>(&mut self, wallets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for wallet in wallets {
            let wallet = wallet.into();
            if !self.synced_wallets.contains(&wallet) {
                self.synced_wallets.push(wallet);
            }
        }
    }
}
