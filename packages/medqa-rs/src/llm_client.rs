//! Client for the locally hosted text-generation endpoint.
//!
//! Every call returns a `Result`; deciding what a failed call degrades to
//! (passthrough, empty response, keeping a record) is left to the caller.
use crate::config::{GenerationOptions, LlmConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("generation endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode generation response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that turns a prompt and a system instruction into a completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system: &str,
        num_predict: usize,
    ) -> Result<String, LlmError>;

    /// Sampling options this generator was configured with.
    fn options(&self) -> &GenerationOptions;
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: RequestOptions,
}

#[derive(Debug, Clone, Serialize)]
struct RequestOptions {
    temperature: f32,
    top_p: f32,
    num_predict: usize,
    repeat_penalty: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Non-streaming client for an Ollama-style `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    options: GenerationOptions,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| LlmError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            http_client,
            base_url,
            model: config.model.clone(),
            options: config.options.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system: &str,
        num_predict: usize,
    ) -> Result<String, LlmError> {
        let url = self.endpoint();
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: RequestOptions {
                temperature: self.options.temperature,
                top_p: self.options.top_p,
                num_predict,
                repeat_penalty: self.options.repeat_penalty,
            },
        };

        debug!(
            url = %url,
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            num_predict,
            "sending generation request"
        );

        let transport = |source| LlmError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(LlmError::Status { status, body });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        Ok(parsed.response.trim().to_string())
    }

    fn options(&self) -> &GenerationOptions {
        &self.options
    }
}
