//! Agent manifests
//!
//! Every generated agent file is a TOML manifest instantiated from a tier
//! template:
//!
//! ```toml
//! [agent]
//! name = "Agent3"
//! tier = "Beta"
//! role = "Miner"
//! description = "Performs simple tasks for its role"
//!
//! [completion]
//! model = "gpt-4o-mini"
//! max_tokens = 50
//!
//! [external]
//! completion_endpoint = "https://api.openai.com/v1/chat/completions"
//! api_key_env = "OPENAI_API_KEY"
//! image_url = "https://..."
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Role, Tier};
use crate::error::FactoryError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestAgent {
    pub name: String,
    pub tier: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestCompletion {
    pub model: String,
    pub max_tokens: u32,
}

/// Boilerplate appended by the factory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestExternal {
    pub completion_endpoint: String,
    pub api_key_env: String,
    pub image_url: String,
}

/// Parsed agent file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentManifest {
    pub agent: ManifestAgent,
    pub completion: ManifestCompletion,
    #[serde(default)]
    pub external: Option<ManifestExternal>,
}

impl AgentManifest {
    /// Parse a manifest from TOML
    pub fn parse(content: &str) -> Result<Self, FactoryError> {
        let manifest: AgentManifest =
            toml::from_str(content).map_err(|e| FactoryError::Manifest(e.to_string()))?;
        manifest.tier()?;
        manifest.role()?;
        Ok(manifest)
    }

    /// Load a manifest from disk
    pub fn load(path: &Path) -> Result<Self, FactoryError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn tier(&self) -> Result<Tier, FactoryError> {
        self.agent
            .tier
            .parse()
            .map_err(|e: crate::error::ValidationError| FactoryError::Manifest(e.to_string()))
    }

    /// Role, treating an empty value as none
    pub fn role(&self) -> Result<Option<Role>, FactoryError> {
        match self.agent.role.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(role) => role
                .parse()
                .map(Some)
                .map_err(|e: crate::error::ValidationError| FactoryError::Manifest(e.to_string())),
        }
    }

    /// Completion token budget, capped at the tier budget
    pub fn max_tokens(&self) -> u32 {
        match self.tier() {
            Ok(tier) => self.completion.max_tokens.min(tier.completion_budget()),
            Err(_) => self.completion.max_tokens,
        }
    }
}

/// Build the boilerplate block appended to every generated agent file
pub fn external_block(completion_endpoint: &str, api_key_env: &str, image_url: &str) -> String {
    format!(
        "\n# Interaction with the external completion model\n\
         [external]\n\
         completion_endpoint = \"{}\"\n\
         api_key_env = \"{}\"\n\
         image_url = \"{}\"\n",
        toml_escape(completion_endpoint),
        toml_escape(api_key_env),
        toml_escape(image_url),
    )
}

fn toml_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[agent]
name = "Agent2"
tier = "Beta"
role = "Scout"

[completion]
model = "gpt-4o-mini"
max_tokens = 500
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = AgentManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.agent.name, "Agent2");
        assert_eq!(manifest.tier().unwrap(), Tier::Beta);
        assert_eq!(manifest.role().unwrap(), Some(Role::Scout));
        assert!(manifest.external.is_none());
    }

    #[test]
    fn test_max_tokens_capped_by_tier() {
        let manifest = AgentManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.max_tokens(), 50);
    }

    #[test]
    fn test_empty_role_is_none() {
        let content = MANIFEST.replace("role = \"Scout\"", "role = \"\"");
        let manifest = AgentManifest::parse(&content).unwrap();
        assert_eq!(manifest.role().unwrap(), None);
    }

    #[test]
    fn test_invalid_tier_rejected() {
        let content = MANIFEST.replace("tier = \"Beta\"", "tier = \"AGENT_TYPE_PLACEHOLDER\"");
        assert!(matches!(
            AgentManifest::parse(&content),
            Err(FactoryError::Manifest(_))
        ));
    }

    #[test]
    fn test_external_block_appends() {
        let content = format!(
            "{}{}",
            MANIFEST,
            external_block(
                "https://api.openai.com/v1/chat/completions",
                "OPENAI_API_KEY",
                "https://img.example/a\"b.png"
            )
        );
        let manifest = AgentManifest::parse(&content).unwrap();
        let external = manifest.external.unwrap();
        assert_eq!(external.image_url, "https://img.example/a\"b.png");
        assert_eq!(external.api_key_env, "OPENAI_API_KEY");
    }
}
