//! Per-tier agent templates
//!
//! Templates live at `<templates_dir>/<tier directory>/<template file>` and
//! carry three placeholder tokens that are replaced literally.

use std::path::{Path, PathBuf};

use crate::agent::{Role, Tier};
use crate::error::FactoryError;

pub const NAME_PLACEHOLDER: &str = "AGENT_NAME_PLACEHOLDER";
pub const TYPE_PLACEHOLDER: &str = "AGENT_TYPE_PLACEHOLDER";
pub const ROLE_PLACEHOLDER: &str = "AGENT_ROLE_PLACEHOLDER";

/// Template shipped with the crate for `tier`
pub fn builtin(tier: Tier) -> &'static str {
    match tier {
        Tier::Free => include_str!("../../templates/free.toml"),
        Tier::Standard => include_str!("../../templates/standard.toml"),
        Tier::Smart => include_str!("../../templates/smart.toml"),
        Tier::Quantum => include_str!("../../templates/quantum.toml"),
        Tier::Beta => include_str!("../../templates/beta.toml"),
    }
}

/// Replace the placeholders and append `boilerplate`
pub fn instantiate(
    template: &str,
    name: &str,
    tier: Tier,
    role: Option<Role>,
    boilerplate: &str,
) -> String {
    let mut content = template
        .replace(NAME_PLACEHOLDER, name)
        .replace(TYPE_PLACEHOLDER, tier.name())
        .replace(ROLE_PLACEHOLDER, role.map(|r| r.name()).unwrap_or(""));
    content.push_str(boilerplate);
    content
}

/// Template files on disk
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the template for `tier`
    pub fn path(&self, tier: Tier) -> PathBuf {
        self.root.join(tier.directory()).join(tier.template_file())
    }

    /// Write the built-in template of every tier that has none yet
    ///
    /// Returns the paths written.
    pub fn seed(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for tier in Tier::ALL {
            let path = self.path(tier);
            if path.exists() {
                continue;
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, builtin(tier))?;
            tracing::info!(%tier, path = %path.display(), "seeded agent template");
            written.push(path);
        }
        Ok(written)
    }

    /// Read the template for `tier`
    pub async fn load(&self, tier: Tier) -> Result<String, FactoryError> {
        let path = self.path(tier);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FactoryError::TemplateMissing(path))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentManifest;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_templates_parse_once_instantiated() {
        for tier in Tier::ALL {
            let content = instantiate(builtin(tier), "Agent1", tier, Some(Role::Healer), "");
            let manifest = AgentManifest::parse(&content).unwrap();
            assert_eq!(manifest.tier().unwrap(), tier);
            assert_eq!(manifest.role().unwrap(), Some(Role::Healer));
            assert_eq!(manifest.max_tokens(), tier.completion_budget());
        }
    }

    #[test]
    fn test_instantiate_without_role() {
        let content = instantiate(builtin(Tier::Quantum), "QAgent4", Tier::Quantum, None, "\n# tail\n");
        assert!(!content.contains("PLACEHOLDER"));
        assert!(content.contains("name = \"QAgent4\""));
        assert!(content.contains("role = \"\""));
        assert!(content.ends_with("\n# tail\n"));
    }

    #[test]
    fn test_paths() {
        let store = TemplateStore::new("/srv/templates");
        assert_eq!(
            store.path(Tier::Quantum),
            PathBuf::from("/srv/templates/quantum_agents/agent_template_q.toml")
        );
        assert_eq!(
            store.path(Tier::Beta),
            PathBuf::from("/srv/templates/beta_agents/beta_agent_template.toml")
        );
    }

    #[test]
    fn test_seed_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let store = TemplateStore::new(dir.path());
        let custom = store.path(Tier::Free);
        std::fs::create_dir_all(custom.parent().unwrap()).unwrap();
        std::fs::write(&custom, "custom").unwrap();

        let written = store.seed().unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(std::fs::read_to_string(&custom).unwrap(), "custom");
        assert!(store.seed().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let store = TemplateStore::new(dir.path());
        let err = store.load(Tier::Smart).await.unwrap_err();
        assert!(matches!(err, FactoryError::TemplateMissing(path) if path == store.path(Tier::Smart)));
    }
}
