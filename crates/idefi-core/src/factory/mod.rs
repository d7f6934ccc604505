//! Agent factory
//!
//! Creating an agent instantiates the tier template into the next numbered
//! file of the tier directory (`agent<n>.toml`, or `qagent<n>.toml` for
//! Quantum) after its image has been generated. Creation within one tier is
//! serialized so ids are never handed out twice; a file that already exists is
//! never overwritten.

pub mod template;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub use template::TemplateStore;

use crate::agent::{external_block, AgentManifest, AgentRecord, Role, Tier};
use crate::config::IdefiConfig;
use crate::error::{FactoryError, Result, ValidationError};
use crate::image::{ImageGenerator, ImageSubject};
use crate::integrations::Services;
use crate::tracking::TrackingStore;

/// Environment variable named in the boilerplate of every agent file
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

lazy_static! {
    static ref AGENT_FILE: Regex = Regex::new(r"^(agent|qagent)(\d+)\.toml$").unwrap();
}

/// A freshly created agent file
#[derive(Debug, Clone)]
pub struct CreatedAgent {
    pub record: AgentRecord,
    pub manifest: AgentManifest,
}

/// Creates agent files from templates
pub struct AgentFactory {
    agents_dir: PathBuf,
    templates: TemplateStore,
    images: ImageGenerator,
    completion_endpoint: String,
    tier_locks: [Mutex<()>; 5],
}

impl AgentFactory {
    pub fn new(
        agents_dir: impl Into<PathBuf>,
        templates: TemplateStore,
        images: ImageGenerator,
        completion_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            agents_dir: agents_dir.into(),
            templates,
            images,
            completion_endpoint: completion_endpoint.into(),
            tier_locks: Default::default(),
        }
    }

    /// Factory wired to the configured directories and image service
    pub fn from_config(
        config: &IdefiConfig,
        services: &Services,
        tracking: Arc<TrackingStore>,
    ) -> Self {
        let images = ImageGenerator::new(
            services.images.clone(),
            tracking,
            config.services.image_size.clone(),
        );
        Self::new(
            config.storage.agents_dir.clone(),
            TemplateStore::new(config.storage.templates_dir.clone()),
            images,
            format!(
                "{}/chat/completions",
                config.services.openai_base_url.trim_end_matches('/')
            ),
        )
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn images(&self) -> &ImageGenerator {
        &self.images
    }

    /// Directory holding the generated files of `tier`
    pub fn tier_dir(&self, tier: Tier) -> PathBuf {
        self.agents_dir.join(tier.directory())
    }

    /// Create the next agent of `tier`
    ///
    /// `role` is required for tiers that need one and optional otherwise.
    /// Nothing is written when the template is missing or the image cannot be
    /// generated, and tracking only counts agents whose file was written.
    pub async fn create(&self, tier: Tier, role: Option<Role>) -> Result<CreatedAgent> {
        if tier.requires_role() && role.is_none() {
            return Err(ValidationError::MissingRole(tier).into());
        }

        let _guard = self.tier_locks[tier_index(tier)].lock().await;

        let dir = self.tier_dir(tier);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(FactoryError::from)?;
        let id = next_free_id(&dir, tier, count_agent_files(&dir, tier).await? + 1).await?;
        let name = format!("{}{}", tier.name_prefix(), id);

        let template = self.templates.load(tier).await?;

        let subject = match role {
            Some(role) => ImageSubject::Role(role),
            None => ImageSubject::Tier(tier),
        };
        let image_url = self
            .images
            .generate(subject)
            .await
            .map_err(FactoryError::ImageGeneration)?;

        let content = template::instantiate(
            &template,
            &name,
            tier,
            role,
            &external_block(&self.completion_endpoint, API_KEY_ENV, &image_url),
        );
        let manifest = AgentManifest::parse(&content)?;

        let path = dir.join(format!("{}{}.toml", tier.file_prefix(), id));
        write_new(&path, &content).await?;
        tracing::info!(%tier, %name, path = %path.display(), "created agent file");
        self.images.record(subject, false).await;

        Ok(CreatedAgent {
            record: AgentRecord {
                id,
                name,
                tier,
                role,
                source_path: path,
                image_url,
                created_at: Utc::now(),
            },
            manifest,
        })
    }
}

fn tier_index(tier: Tier) -> usize {
    match tier {
        Tier::Free => 0,
        Tier::Standard => 1,
        Tier::Smart => 2,
        Tier::Quantum => 3,
        Tier::Beta => 4,
    }
}

/// Number of generated agent files of `tier` in `dir`
async fn count_agent_files(dir: &Path, tier: Tier) -> std::result::Result<u32, FactoryError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(captures) = AGENT_FILE.captures(file_name) {
            if &captures[1] == tier.file_prefix() {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// First id from `start` whose agent file does not exist yet
///
/// Files deleted out of band leave gaps, so the count alone can point at an
/// existing file.
async fn next_free_id(
    dir: &Path,
    tier: Tier,
    start: u32,
) -> std::result::Result<u32, FactoryError> {
    let mut id = start;
    while tokio::fs::try_exists(dir.join(format!("{}{}.toml", tier.file_prefix(), id))).await? {
        id += 1;
    }
    Ok(id)
}

async fn write_new(path: &Path, content: &str) -> std::result::Result<(), FactoryError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| FactoryError::Io(format!("{}: {}", path.display(), e)))?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdefiError;
    use crate::integrations::fake::FakeImages;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        images: Arc<FakeImages>,
        factory: AgentFactory,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        let templates = TemplateStore::new(root.join("templates"));
        templates.seed().unwrap();
        let tracking = Arc::new(TrackingStore::open(root.join("agent_tracking.json")).unwrap());
        let images = Arc::new(FakeImages::default());
        let generator = ImageGenerator::new(images.clone(), tracking, "1024x1024");
        let factory = AgentFactory::new(
            root.join("agents"),
            templates,
            generator,
            "https://api.openai.com/v1/chat/completions",
        );
        Fixture {
            _dir: dir,
            root,
            images,
            factory,
        }
    }

    #[tokio::test]
    async fn test_create_beta_agent() {
        let fx = fixture();
        let created = fx.factory.create(Tier::Beta, Some(Role::Miner)).await.unwrap();

        assert_eq!(created.record.id, 1);
        assert_eq!(created.record.name, "Agent1");
        assert_eq!(
            created.record.source_path,
            fx.root.join("agents/beta_agents/agent1.toml")
        );
        assert!(!created.record.image_url.is_empty());

        let manifest = AgentManifest::load(&created.record.source_path).unwrap();
        assert_eq!(manifest.agent.name, "Agent1");
        assert_eq!(manifest.role().unwrap(), Some(Role::Miner));
        let external = manifest.external.unwrap();
        assert_eq!(external.image_url, created.record.image_url);
        assert_eq!(external.api_key_env, API_KEY_ENV);

        let counters = fx.factory.images().tracking().snapshot().await;
        assert_eq!(counters.role_count(Role::Miner), 1);
    }

    #[tokio::test]
    async fn test_sequential_ids_per_tier() {
        let fx = fixture();
        for expected in 1..=3 {
            let created = fx.factory.create(Tier::Quantum, None).await.unwrap();
            assert_eq!(created.record.id, expected);
            assert_eq!(created.record.name, format!("QAgent{}", expected));
        }
        let free = fx.factory.create(Tier::Free, None).await.unwrap();
        assert_eq!(free.record.id, 1);
        assert!(fx.root.join("agents/quantum_agents/qagent3.toml").exists());
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_unique_ids() {
        let fx = Arc::new(fixture());
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let fx = fx.clone();
                tokio::spawn(async move {
                    fx.factory
                        .create(Tier::Smart, Some(Role::Scout))
                        .await
                        .unwrap()
                        .record
                        .id
                })
            })
            .collect();
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.sort();
        assert_eq!(ids, (1..=8).collect::<Vec<u32>>());

        let counters = fx.factory.images().tracking().snapshot().await;
        assert_eq!(counters.role_count(Role::Scout), 8);
        assert!(counters.is_consistent());
    }

    #[tokio::test]
    async fn test_missing_role() {
        let fx = fixture();
        let err = fx.factory.create(Tier::Smart, None).await.unwrap_err();
        assert!(matches!(
            err,
            IdefiError::Validation(ValidationError::MissingRole(Tier::Smart))
        ));
        assert_eq!(fx.images.calls(), 0);
    }

    #[tokio::test]
    async fn test_image_failure_writes_nothing() {
        let fx = fixture();
        fx.images.set_failing(true);
        let err = fx
            .factory
            .create(Tier::Beta, Some(Role::Builder))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IdefiError::Factory(FactoryError::ImageGeneration(_))
        ));
        let dir = fx.factory.tier_dir(Tier::Beta);
        assert_eq!(std::fs::read_dir(dir).unwrap().count(), 0);
        let counters = fx.factory.images().tracking().snapshot().await;
        assert_eq!(counters.total_agents, 0);
    }

    #[tokio::test]
    async fn test_missing_template_calls_nothing() {
        let fx = fixture();
        std::fs::remove_file(fx.factory.templates().path(Tier::Standard)).unwrap();
        let err = fx.factory.create(Tier::Standard, None).await.unwrap_err();
        assert!(matches!(
            err,
            IdefiError::Factory(FactoryError::TemplateMissing(_))
        ));
        assert_eq!(fx.images.calls(), 0);
    }

    #[tokio::test]
    async fn test_unrelated_files_not_counted() {
        let fx = fixture();
        let dir = fx.factory.tier_dir(Tier::Free);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("agent_template.toml"), "").unwrap();
        std::fs::write(dir.join("agent7.toml.bak"), "").unwrap();
        std::fs::write(dir.join("qagent1.toml"), "").unwrap();
        std::fs::write(dir.join("agent5.toml"), "").unwrap();

        let created = fx.factory.create(Tier::Free, None).await.unwrap();
        assert_eq!(created.record.id, 2);
        assert_eq!(created.record.source_path, dir.join("agent2.toml"));
    }

    #[tokio::test]
    async fn test_existing_file_never_overwritten() {
        let fx = fixture();
        let dir = fx.factory.tier_dir(Tier::Free);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("agent2.toml"), "keep me").unwrap();

        let created = fx.factory.create(Tier::Free, None).await.unwrap();
        assert_eq!(created.record.id, 3);
        assert_eq!(
            std::fs::read_to_string(dir.join("agent2.toml")).unwrap(),
            "keep me"
        );
    }

    #[tokio::test]
    async fn test_deleted_file_does_not_block_tier() {
        let fx = fixture();
        fx.factory.create(Tier::Beta, Some(Role::Miner)).await.unwrap();
        fx.factory.create(Tier::Beta, Some(Role::Miner)).await.unwrap();
        let dir = fx.factory.tier_dir(Tier::Beta);
        std::fs::remove_file(dir.join("agent1.toml")).unwrap();

        for expected in 3..=5 {
            let created = fx.factory.create(Tier::Beta, Some(Role::Miner)).await.unwrap();
            assert_eq!(created.record.id, expected);
        }

        assert_eq!(fx.images.calls(), 5);
        let counters = fx.factory.images().tracking().snapshot().await;
        assert_eq!(counters.role_count(Role::Miner), 5);
        assert_eq!(counters.total_agents, 5);
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_not_counted() {
        let fx = fixture();
        std::fs::write(
            fx.factory.templates().path(Tier::Smart),
            "[agent\nname = broken",
        )
        .unwrap();

        let err = fx
            .factory
            .create(Tier::Smart, Some(Role::Healer))
            .await
            .unwrap_err();
        assert!(matches!(err, IdefiError::Factory(FactoryError::Manifest(_))));
        assert_eq!(fx.images.calls(), 1);
        let counters = fx.factory.images().tracking().snapshot().await;
        assert_eq!(counters.role_count(Role::Healer), 0);
        let dir = fx.factory.tier_dir(Tier::Smart);
        assert_eq!(std::fs::read_dir(dir).unwrap().count(), 0);
    }
}
