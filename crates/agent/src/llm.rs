use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use mission_core::config::{LlmConfig, LlmProvider, LlmProviderConfig};
use mission_core::upload::DocumentKind;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("{provider} request failed: {message}")]
    Transport { provider: &'static str, message: String },
    #[error("{provider} returned HTTP {status}: {body}")]
    Status { provider: &'static str, status: u16, body: String },
    #[error("{provider} response could not be read: {message}")]
    Parse { provider: &'static str, message: String },
    #[error(
        "{provider} cannot read PDF attachments; \
         convert the PDF to an image (PNG or JPG) and upload it again"
    )]
    UnsupportedPdf { provider: &'static str },
    #[error("{provider} did not answer within the remaining time budget")]
    Timeout { provider: &'static str },
    #[error("no LLM providers are configured")]
    NoProviders,
    #[error("all LLM providers failed: {}", .0.join("; "))]
    Exhausted(Vec<String>),
}

/// Binary document forwarded to a model alongside the prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub kind: DocumentKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    pub attachment: Option<Attachment>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &'static str;
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError>;
}

/// Chat-completions client for OpenAI and OpenAI-compatible servers (Ollama).
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    kind: LlmProvider,
    model: String,
    base_url: String,
    api_key: Option<SecretString>,
    max_tokens: u32,
}

impl OpenAiCompatibleClient {
    pub fn new(http: reqwest::Client, config: &LlmProviderConfig, max_tokens: u32) -> Self {
        Self {
            http,
            kind: config.kind,
            model: config.model.clone(),
            base_url: config.resolved_base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_tokens,
        }
    }

    fn body(&self, request: &LlmRequest) -> Result<Value, LlmError> {
        let mut content = vec![json!({ "type": "text", "text": request.prompt })];
        if let Some(attachment) = &request.attachment {
            if !attachment.kind.is_image() {
                return Err(LlmError::UnsupportedPdf { provider: self.provider() });
            }
            content.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!(
                        "data:{};base64,{}",
                        attachment.kind.mime_type(),
                        attachment.base64()
                    )
                }
            }));
        }

        Ok(json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": content }
            ]
        }))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider(&self) -> &'static str {
        self.kind.as_str()
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let provider = self.provider();
        let body = self.body(request)?;
        let mut builder = self.http.post(format!("{}/v1/chat/completions", self.base_url));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let payload = send_json(provider, builder.json(&body)).await?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| LlmError::Parse {
                provider,
                message: "missing choices[0].message.content".to_string(),
            })
    }
}

pub struct AnthropicClient {
    http: reqwest::Client,
    model: String,
    base_url: String,
    api_key: Option<SecretString>,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, config: &LlmProviderConfig, max_tokens: u32) -> Self {
        Self {
            http,
            model: config.model.clone(),
            base_url: config.resolved_base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_tokens,
        }
    }

    fn body(&self, request: &LlmRequest) -> Value {
        let mut content = Vec::new();
        if let Some(attachment) = &request.attachment {
            let source = json!({
                "type": "base64",
                "media_type": attachment.kind.mime_type(),
                "data": attachment.base64(),
            });
            let block_type = if attachment.kind.is_image() { "image" } else { "document" };
            content.push(json!({ "type": block_type, "source": source }));
        }
        content.push(json!({ "type": "text", "text": request.prompt }));

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": request.system,
            "messages": [{ "role": "user", "content": content }]
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> &'static str {
        LlmProvider::Anthropic.as_str()
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let provider = self.provider();
        let mut builder = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("anthropic-version", ANTHROPIC_VERSION);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-api-key", api_key.expose_secret());
        }

        let payload = send_json(provider, builder.json(&self.body(request))).await?;
        let text: String = payload
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|block| block.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::Parse { provider, message: "no text content blocks".to_string() });
        }
        Ok(text)
    }
}

async fn send_json(
    provider: &'static str,
    builder: reqwest::RequestBuilder,
) -> Result<Value, LlmError> {
    let response = builder
        .send()
        .await
        .map_err(|error| LlmError::Transport { provider, message: error.to_string() })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status { provider, status: status.as_u16(), body });
    }

    response.json::<Value>().await.map_err(|error| LlmError::Parse {
        provider,
        message: error.to_string(),
    })
}

/// Ordered provider list sharing one time budget. Each provider gets
/// whatever is left of the budget when its turn comes.
#[derive(Clone)]
pub struct FailoverChain {
    clients: Vec<Arc<dyn LlmClient>>,
    budget: Duration,
}

impl FailoverChain {
    pub fn new(clients: Vec<Arc<dyn LlmClient>>, budget: Duration) -> Self {
        Self { clients, budget }
    }

    pub fn from_config(config: &LlmConfig, http: reqwest::Client) -> Result<Self, LlmError> {
        if config.providers.is_empty() {
            return Err(LlmError::NoProviders);
        }

        let clients = config
            .providers
            .iter()
            .map(|provider| -> Arc<dyn LlmClient> {
                match provider.kind {
                    LlmProvider::Anthropic => {
                        Arc::new(AnthropicClient::new(http.clone(), provider, config.max_tokens))
                    }
                    LlmProvider::OpenAi | LlmProvider::Ollama => Arc::new(
                        OpenAiCompatibleClient::new(http.clone(), provider, config.max_tokens),
                    ),
                }
            })
            .collect();

        Ok(Self::new(clients, Duration::from_secs(config.budget_secs)))
    }

    pub fn providers(&self) -> Vec<&'static str> {
        self.clients.iter().map(|client| client.provider()).collect()
    }

    pub async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        if self.clients.is_empty() {
            return Err(LlmError::NoProviders);
        }

        let deadline = Instant::now() + self.budget;
        let mut failures = Vec::new();

        for (position, client) in self.clients.iter().enumerate() {
            let provider = client.provider();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                failures.push(LlmError::Timeout { provider }.to_string());
                break;
            }

            match tokio::time::timeout(remaining, client.complete(request)).await {
                Ok(Ok(text)) => {
                    info!(
                        event_name = "analysis.llm.provider_succeeded",
                        provider,
                        position,
                        "llm provider answered"
                    );
                    return Ok(text);
                }
                Ok(Err(error)) => {
                    warn!(
                        event_name = "analysis.llm.provider_failed",
                        provider,
                        position,
                        error = %error,
                        "llm provider failed; trying next provider"
                    );
                    failures.push(error.to_string());
                }
                Err(_) => {
                    warn!(
                        event_name = "analysis.llm.provider_timed_out",
                        provider,
                        position,
                        "llm provider exhausted the remaining budget"
                    );
                    failures.push(LlmError::Timeout { provider }.to_string());
                }
            }
        }

        Err(LlmError::Exhausted(failures))
    }
}
