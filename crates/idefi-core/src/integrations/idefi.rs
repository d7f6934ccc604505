//! Client for the sibling idefi APIs (analytics, quantum, file processing)

use async_trait::async_trait;
use serde_json::Value;

use super::{check_status, join_url, json_response, FileProcessor, ServiceProxy};
use crate::error::ExternalError;

/// JSON client bound to one idefi API base URL
#[derive(Debug, Clone)]
pub struct IdefiClient {
    http: reqwest::Client,
    service: String,
    base_url: String,
}

impl IdefiClient {
    pub fn new(http: reqwest::Client, service: &str, base_url: &str) -> Self {
        Self {
            http,
            service: service.to_string(),
            base_url: base_url.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ServiceProxy for IdefiClient {
    async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Value, ExternalError> {
        tracing::debug!(service = %self.service, endpoint, "GET");
        let response = self
            .http
            .get(join_url(&self.base_url, endpoint))
            .query(params)
            .send()
            .await
            .map_err(|e| ExternalError::request(&self.service, e))?;
        json_response(&self.service, response).await
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ExternalError> {
        tracing::debug!(service = %self.service, endpoint, "POST");
        let response = self
            .http
            .post(join_url(&self.base_url, endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| ExternalError::request(&self.service, e))?;
        json_response(&self.service, response).await
    }
}

#[async_trait]
impl FileProcessor for IdefiClient {
    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<Value, ExternalError> {
        let part = reqwest::multipart::Part::bytes(content).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(join_url(&self.base_url, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExternalError::request(&self.service, e))?;
        json_response(&self.service, response).await
    }

    async fn download(&self, filename: &str) -> Result<Vec<u8>, ExternalError> {
        let response = self
            .http
            .get(join_url(&self.base_url, &format!("download/{}", filename)))
            .send()
            .await
            .map_err(|e| ExternalError::request(&self.service, e))?;
        let bytes = check_status(&self.service, response)
            .await?
            .bytes()
            .await
            .map_err(|e| ExternalError::request(&self.service, e))?;
        Ok(bytes.to_vec())
    }
}
