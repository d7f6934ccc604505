//! Error types for idefi-core

use std::path::PathBuf;

use thiserror::Error;

use crate::agent::Tier;

/// Result type alias for idefi operations
pub type Result<T> = std::result::Result<T, IdefiError>;

/// Main error type for idefi operations
#[derive(Error, Debug)]
pub enum IdefiError {
    /// Request input errors
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Agent lookup and messaging errors
    #[error("{0}")]
    Agent(#[from] AgentError),

    /// Agent creation errors
    #[error("{0}")]
    Factory(#[from] FactoryError),

    /// Downstream HTTP service errors
    #[error("{0}")]
    External(#[from] ExternalError),

    /// Tracking counter persistence errors
    #[error("{0}")]
    Tracking(#[from] TrackingError),

    /// Configuration errors
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Missing or malformed input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or empty
    #[error("{0} is required")]
    MissingField(String),

    /// Unknown tier name
    #[error("Invalid agent type '{0}'. Use 'Free', 'Standard', 'Smart', 'Quantum' or 'Beta'.")]
    InvalidTier(String),

    /// Unknown role name
    #[error("Invalid agent role '{0}'. Valid roles are: Miner, Builder, Defender, Scout, Healer")]
    InvalidRole(String),

    /// Tier needs a role and none was given
    #[error("Agent role is required for {0} agents")]
    MissingRole(Tier),

    /// Address does not have the shape of an Ethereum address
    #[error("Invalid Ethereum address format: {0}")]
    InvalidAddress(String),

    /// Address carries contract code
    #[error("Address {0} is a smart contract, not an EOA")]
    NotExternallyOwned(String),

    /// The agent exists but cannot serve this request
    #[error("Agent {name} is a {tier} agent; this operation requires a {required} agent")]
    WrongTier {
        name: String,
        tier: Tier,
        required: Tier,
    },

    /// Request payload could not be interpreted
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Agent-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// No agent registered under this tier and name
    #[error("Agent not found: {tier}/{name}")]
    NotFound { tier: Tier, name: String },

    /// No agent with this name in any tier
    #[error("Agent not found: {0}")]
    NotFoundByName(String),

    /// The agent's task has stopped and no longer accepts messages
    #[error("Agent {0} is not running")]
    Unavailable(String),
}

/// Agent creation errors
#[derive(Error, Debug)]
pub enum FactoryError {
    /// Template file for the tier does not exist
    #[error("Template file '{}' not found", .0.display())]
    TemplateMissing(PathBuf),

    /// Image generation failed; nothing was written
    #[error("Failed to generate image: {0}")]
    ImageGeneration(#[source] ExternalError),

    /// Filesystem failure while writing the agent file
    #[error("Failed to create agent: {0}")]
    Io(String),

    /// The generated agent file is not a valid manifest
    #[error("Invalid agent manifest: {0}")]
    Manifest(String),
}

/// Errors returned by external HTTP services
#[derive(Error, Debug, Clone)]
pub enum ExternalError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("{service} request failed: {message}")]
    Request { service: String, message: String },

    /// Service answered with a non-success status
    #[error("{service} returned {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    /// Service answered with something we cannot use
    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse { service: String, message: String },

    /// Service is not configured in this deployment
    #[error("{0} is not configured")]
    NotConfigured(String),
}

impl ExternalError {
    pub fn request(service: &str, err: impl std::fmt::Display) -> Self {
        ExternalError::Request {
            service: service.to_string(),
            message: err.to_string(),
        }
    }

    pub fn invalid(service: &str, message: impl Into<String>) -> Self {
        ExternalError::InvalidResponse {
            service: service.to_string(),
            message: message.into(),
        }
    }
}

/// Tracking counter persistence errors
#[derive(Error, Debug)]
pub enum TrackingError {
    /// IO error
    #[error("Tracking file IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Tracking file serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The managed-database credential is not set
    #[error("Missing Firebase service account key environment variable")]
    MissingCredential,

    /// The managed-database credential could not be decoded
    #[error("Invalid Firebase service account key: {0}")]
    InvalidCredential(String),

    /// Config file could not be read or parsed
    #[error("Config file error: {0}")]
    File(String),

    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),
}

impl From<std::io::Error> for TrackingError {
    fn from(err: std::io::Error) -> Self {
        TrackingError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrackingError {
    fn from(err: serde_json::Error) -> Self {
        TrackingError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for FactoryError {
    fn from(err: std::io::Error) -> Self {
        FactoryError::Io(err.to_string())
    }
}
