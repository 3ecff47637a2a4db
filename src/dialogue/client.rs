//! Chat completion client for OpenAI-compatible APIs

use crate::config::ModelConfig;
use crate::context::Turn;
use crate::error::{ContextError, Result};
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Provider usage accounting for one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: usize,
    #[serde(default)]
    pub completion_tokens: usize,
    #[serde(default)]
    pub total_tokens: usize,
}

/// Final accumulated completion for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
}

/// Anything that can turn a turn sequence into a completion
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, turns: &[Turn]) -> Result<Completion>;
}

/// Client for a `/v1/chat/completions` endpoint
pub struct OpenAiClient {
    client: Client,
    model: String,
    endpoint: String,
    api_key: Option<SecretString>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl OpenAiClient {
    /// Create a new client from model configuration
    pub fn new(config: ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model: config.model_name,
            endpoint: config.request_address,
            api_key: config.api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, turns: &[Turn]) -> Result<Completion> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: turns,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut req = self.client.post(&self.endpoint).json(&request);
        if let Some(ref api_key) = self.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ContextError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| ContextError::Api {
            status: status.as_u16(),
            body: "No choices in response".to_string(),
        })?;

        Ok(Completion {
            content: choice.message.content,
            usage: parsed.usage,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, turns: &[Turn]) -> Result<Completion> {
        debug!("Requesting completion: model={}, turns={}", self.model, turns.len());

        match self.post(turns).await {
            Ok(completion) => {
                METRICS.record_completion(true, Some(completion.usage.total_tokens));
                debug!(
                    "Completion received: completion_tokens={}, total_tokens={}",
                    completion.usage.completion_tokens, completion.usage.total_tokens
                );
                Ok(completion)
            }
            Err(e) => {
                METRICS.record_completion(false, None);
                warn!("Completion request failed: {}", e);
                Err(e)
            }
        }
    }
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}
