//! Configuration for idefi-core
//!
//! Non-secret settings live in `IdefiConfig`, loaded from a TOML file (every
//! field has a default). API keys and the Firebase credential come from the
//! environment through `Secrets`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "IDEFI_CONFIG";
/// Environment variable overriding the bind address
pub const ADDR_ENV: &str = "IDEFI_ADDR";

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdefiConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// On-disk locations
    pub storage: StorageConfig,
    /// External service endpoints
    pub services: ServicesConfig,
    /// Firebase project settings
    pub firebase: FirebaseConfig,
    /// Agent runtime settings
    pub agents: AgentsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub addr: String,
    /// Where uploaded files are saved
    pub upload_dir: PathBuf,
    /// Maximum request body size in bytes
    pub max_upload_bytes: usize,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:5328".to_string(),
            upload_dir: std::env::temp_dir(),
            max_upload_bytes: 16 * 1024 * 1024,
            cors_origins: vec![
                "https://q.idefi.ai".to_string(),
                "https://api.idefi.ai".to_string(),
            ],
        }
    }
}

/// On-disk locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the per-tier generated agent directories
    pub agents_dir: PathBuf,
    /// Root of the per-tier template directories
    pub templates_dir: PathBuf,
    /// Tracking counters file
    pub tracking_file: PathBuf,
    /// Write built-in templates that are missing at startup
    pub seed_templates: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            agents_dir: PathBuf::from("agents"),
            templates_dir: PathBuf::from("templates"),
            tracking_file: PathBuf::from("agent_tracking.json"),
            seed_templates: true,
        }
    }
}

/// External service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub openai_base_url: String,
    /// Requested image dimensions
    pub image_size: String,
    pub analytics_base_url: String,
    pub quantum_base_url: String,
    pub etherscan_base_url: String,
    /// Outbound request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com/v1".to_string(),
            image_size: "1024x1024".to_string(),
            analytics_base_url: "https://api.idefi.ai/api".to_string(),
            quantum_base_url: "https://q.idefi.ai/api".to_string(),
            etherscan_base_url: "https://api.etherscan.io/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Firebase project settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub storage_bucket: String,
    /// Firestore collection watched by the email extension
    pub mail_collection: String,
    pub firestore_base_url: String,
    pub storage_base_url: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            storage_bucket: "api-idefi-ai.appspot.com".to_string(),
            mail_collection: "mail".to_string(),
            firestore_base_url: "https://firestore.googleapis.com/v1".to_string(),
            storage_base_url: "https://firebasestorage.googleapis.com/v0".to_string(),
        }
    }
}

/// Agent runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Pending messages per agent before senders wait
    pub mailbox_capacity: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 32,
        }
    }
}

impl IdefiConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::File(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::File(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Load from `IDEFI_CONFIG` if set, then apply `IDEFI_ADDR`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::load(Path::new(&path))?,
            _ => Self::default(),
        };
        if let Ok(addr) = std::env::var(ADDR_ENV) {
            if !addr.is_empty() {
                config.server.addr = addr;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.addr.is_empty() {
            return Err(ConfigError::MissingField("server.addr".to_string()));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::OutOfRange(
                "max_upload_bytes must be positive".to_string(),
            ));
        }

        if self.services.timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "timeout_secs must be positive".to_string(),
            ));
        }

        if self.agents.mailbox_capacity == 0 {
            return Err(ConfigError::OutOfRange(
                "mailbox_capacity must be positive".to_string(),
            ));
        }

        let (width, height) = self
            .services
            .image_size
            .split_once('x')
            .ok_or_else(|| ConfigError::OutOfRange("image_size must be WIDTHxHEIGHT".to_string()))?;
        if width != height {
            return Err(ConfigError::OutOfRange(
                "image_size must be square".to_string(),
            ));
        }

        Ok(())
    }
}

/// Secrets read from the environment
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub openai_api_key: Option<String>,
    pub etherscan_api_key: Option<String>,
    /// Base64-encoded service-account JSON
    pub firebase_service_account: Option<String>,
    /// Bearer token for Firestore / Storage REST calls
    pub firebase_access_token: Option<String>,
}

impl Secrets {
    /// Read secrets from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read secrets through `lookup`, preferring plain names over the
    /// `NEXT_PUBLIC_` variants
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .find(|value| !value.is_empty())
        };
        Self {
            openai_api_key: first(&["OPENAI_API_KEY", "NEXT_PUBLIC_OPENAI_API_KEY"]),
            etherscan_api_key: first(&["ETHERSCAN_API_KEY", "NEXT_PUBLIC_ETHERSCAN_API_KEY"]),
            firebase_service_account: first(&[
                "FIREBASE_SERVICE_ACCOUNT_KEY",
                "NEXT_PUBLIC_FIREBASE_SERVICE_ACCOUNT_KEY",
            ]),
            firebase_access_token: first(&["FIREBASE_ACCESS_TOKEN"]),
        }
    }
}
