//! Agents: tiers, roles, manifests and the per-agent runtime
//!
//! An agent is created from a tier template by the factory, then spawned as
//! its own task and kept in the `AgentRegistry` until shutdown.

mod agent;
mod manifest;
mod registry;
mod runtime;
mod types;

pub use agent::{AgentRecord, AgentState, AgentStatus};
pub use manifest::{external_block, AgentManifest, ManifestAgent, ManifestCompletion, ManifestExternal};
pub use registry::AgentRegistry;
pub use runtime::{AgentContext, AgentHandle, AgentMailbox, AgentMessage, TaskKind};
pub use types::{Role, Tier};
