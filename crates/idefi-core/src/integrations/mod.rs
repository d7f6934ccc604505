//! Adapters for the external services idefi delegates to
//!
//! - **openai**: image generation and text completions
//! - **etherscan**: on-chain code lookup for wallet validation
//! - **idefi**: the analytics API, the quantum API and the file-processing API
//! - **firebase**: email notifications and object storage
//!
//! Each concern is a trait so handlers and agents can be exercised against
//! in-memory doubles (see `fake`, behind the `testing` feature).

pub mod etherscan;
pub mod firebase;
pub mod idefi;
pub mod openai;

#[cfg(any(test, feature = "testing"))]
pub mod fake;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{IdefiConfig, Secrets};
use crate::error::{ConfigError, ExternalError};

pub use etherscan::EtherscanClient;
pub use firebase::{FirebaseClient, ServiceAccount};
pub use idefi::IdefiClient;
pub use openai::OpenAiClient;

/// Image synthesis
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Request `count` images of `size` for `prompt`, returning their URLs
    async fn generate_images(
        &self,
        prompt: &str,
        count: u32,
        size: &str,
    ) -> Result<Vec<String>, ExternalError>;
}

/// Text completion
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ExternalError>;
}

/// On-chain code lookup
#[async_trait]
pub trait CodeLookup: Send + Sync {
    /// Deployed bytecode at `address` (`"0x"` when there is none)
    async fn code_at(&self, address: &str) -> Result<String, ExternalError>;
}

/// JSON proxy to one of the sibling idefi APIs
#[async_trait]
pub trait ServiceProxy: Send + Sync {
    async fn get(&self, endpoint: &str, params: &[(String, String)])
        -> Result<Value, ExternalError>;

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ExternalError>;
}

/// External file-processing API
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<Value, ExternalError>;

    async fn download(&self, filename: &str) -> Result<Vec<u8>, ExternalError>;
}

/// Email delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), ExternalError>;
}

/// Cloud object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `content` under `path`, returning the stored object's name
    async fn put(
        &self,
        path: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ExternalError>;
}

/// Every external collaborator the server needs
#[derive(Clone)]
pub struct Services {
    pub images: Arc<dyn ImageService>,
    pub completions: Arc<dyn CompletionService>,
    pub code_lookup: Arc<dyn CodeLookup>,
    pub analytics: Arc<dyn ServiceProxy>,
    pub quantum: Arc<dyn ServiceProxy>,
    pub files: Arc<dyn FileProcessor>,
    pub notifier: Arc<dyn Notifier>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Services {
    /// Build the production clients
    ///
    /// Fails only on the Firebase credential, which is required at startup.
    pub fn from_config(config: &IdefiConfig, secrets: &Secrets) -> Result<Self, ConfigError> {
        let account = ServiceAccount::from_base64(
            secrets
                .firebase_service_account
                .as_deref()
                .ok_or(ConfigError::MissingCredential)?,
        )?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.services.timeout_secs))
            .build()
            .map_err(|e| ConfigError::File(format!("Failed to create HTTP client: {}", e)))?;

        let openai = Arc::new(OpenAiClient::new(
            http.clone(),
            &config.services.openai_base_url,
            secrets.openai_api_key.clone(),
        ));
        let analytics = Arc::new(IdefiClient::new(
            http.clone(),
            "analytics API",
            &config.services.analytics_base_url,
        ));
        let quantum = Arc::new(IdefiClient::new(
            http.clone(),
            "quantum API",
            &config.services.quantum_base_url,
        ));
        let firebase = Arc::new(FirebaseClient::new(
            http.clone(),
            account,
            &config.firebase,
            secrets.firebase_access_token.clone(),
        ));

        Ok(Self {
            images: openai.clone(),
            completions: openai,
            code_lookup: Arc::new(EtherscanClient::new(
                http,
                &config.services.etherscan_base_url,
                secrets.etherscan_api_key.clone(),
            )),
            analytics: analytics.clone(),
            quantum,
            files: analytics,
            notifier: firebase.clone(),
            objects: firebase,
        })
    }
}

/// Read a response body as JSON, mapping non-success statuses
pub(crate) async fn json_response(
    service: &str,
    response: reqwest::Response,
) -> Result<Value, ExternalError> {
    let response = check_status(service, response).await?;
    response
        .json::<Value>()
        .await
        .map_err(|e| ExternalError::invalid(service, e.to_string()))
}

/// Turn non-2xx responses into `ExternalError::Status`
pub(crate) async fn check_status(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ExternalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ExternalError::Status {
        service: service.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Join a base URL and an endpoint path with exactly one slash
pub(crate) fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://api.idefi.ai/api/", "/checkaddress"),
            "https://api.idefi.ai/api/checkaddress"
        );
        assert_eq!(
            join_url("https://q.idefi.ai/api", "run"),
            "https://q.idefi.ai/api/run"
        );
    }

    #[test]
    fn test_services_require_credential() {
        let config = IdefiConfig::default();
        let secrets = Secrets::default();
        assert_eq!(
            Services::from_config(&config, &secrets).err(),
            Some(ConfigError::MissingCredential)
        );
    }
}
