//! Chat-completions client.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::LlmConfig;
use crate::models::ChatMessage;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx answer; `body` is the raw response text
    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Tool-choice policy; the model always decides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
}

/// One chat-completions request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<serde_json::Value>,
    pub tool_choice: ToolChoice,
}

/// Sends conversations to a chat-completions endpoint and returns the first
/// choice's message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<ChatMessage>;
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    tools: &'a [serde_json::Value],
    tool_choice: ToolChoice,
}

/// [`ChatCompletionClient`] over HTTP with bearer authentication
#[derive(Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpChatClient {
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatCompletionClient for HttpChatClient {
    async fn complete(&self, request: CompletionRequest) -> LlmResult<ChatMessage> {
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            tools: &request.tools,
            tool_choice: request.tool_choice,
        };

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        first_choice_message(&text)
    }
}

/// Extract `choices[0].message` from a chat-completions response body
fn first_choice_message(body: &str) -> LlmResult<ChatMessage> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let message = json["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .map(|choice| choice["message"].clone())
        .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

    serde_json::from_value(message).map_err(|e| LlmError::InvalidResponse(e.to_string()))
}
