//! OpenAI client for image generation and chat completions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, join_url, CompletionService, ImageService};
use crate::error::ExternalError;

const SERVICE: &str = "OpenAI";

/// OpenAI REST client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
        }
    }

    fn key(&self) -> Result<&str, ExternalError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ExternalError::NotConfigured("OpenAI API key".to_string()))
    }
}

#[async_trait]
impl ImageService for OpenAiClient {
    async fn generate_images(
        &self,
        prompt: &str,
        count: u32,
        size: &str,
    ) -> Result<Vec<String>, ExternalError> {
        let response = self
            .http
            .post(join_url(&self.base_url, "images/generations"))
            .bearer_auth(self.key()?)
            .json(&ImageRequest {
                prompt,
                n: count,
                size,
            })
            .send()
            .await
            .map_err(|e| ExternalError::request(SERVICE, e))?;

        let body: ImageResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ExternalError::invalid(SERVICE, e.to_string()))?;

        Ok(body.data.into_iter().filter_map(|d| d.url).collect())
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ExternalError> {
        let response = self
            .http
            .post(join_url(&self.base_url, "chat/completions"))
            .bearer_auth(self.key()?)
            .json(&ChatRequest {
                model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                max_tokens,
            })
            .send()
            .await
            .map_err(|e| ExternalError::request(SERVICE, e))?;

        let body: ChatResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ExternalError::invalid(SERVICE, e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ExternalError::invalid(SERVICE, "no completion choices"))
    }
}
