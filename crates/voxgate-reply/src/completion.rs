//! Client for an OpenAI-compatible chat completion endpoint.

use crate::error::ReplyError;
use serde::Serialize;
use serde_json::Value;

/// Spoken when the completion service answers with a non-success status.
pub const TROUBLE_REPLY: &str = "I am having trouble right now. Please try again later.";

/// Spoken when the completion service answers without any usable text.
pub const UNCLEAR_REPLY: &str = "Sorry, I did not understand. Could you rephrase?";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;
pub const DEFAULT_MAX_TOKENS: u32 = 120;

/// Request parameters for the completion service.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    /// Full URL of the chat completions endpoint.
    pub endpoint: String,
    /// Bearer credential.
    pub api_key: String,
    pub model: String,
    /// System instruction sent ahead of the caller's words.
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionSettings {
    /// Settings with the default endpoint, model, and sampling parameters.
    pub fn new(api_key: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: system_prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

/// Sends single-turn exchanges to the completion service.
///
/// Holds a shared `reqwest::Client`; cloning is cheap.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    settings: CompletionSettings,
}

impl CompletionClient {
    pub fn new(http: reqwest::Client, settings: CompletionSettings) -> Self {
        Self { http, settings }
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// Asks the service to answer `user_text`.
    ///
    /// A non-success status yields [`TROUBLE_REPLY`]; a success without
    /// `choices[0].message.content` yields [`UNCLEAR_REPLY`]. Transport and
    /// JSON errors are returned to the caller.
    pub async fn complete(&self, user_text: &str) -> Result<String, ReplyError> {
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.settings.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        tracing::debug!(
            endpoint = %self.settings.endpoint,
            model = %self.settings.model,
            "sending completion request"
        );

        let response = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "completion service returned an error status");
            return Ok(TROUBLE_REPLY.to_string());
        }

        let bytes = response.bytes().await?;
        let parsed: Value = serde_json::from_slice(&bytes)?;

        match extract_content(&parsed) {
            Some(text) => Ok(text.to_string()),
            None => {
                tracing::warn!("completion response carried no message content");
                Ok(UNCLEAR_REPLY.to_string())
            }
        }
    }
}

/// Returns the trimmed first choice's message content, if there is any text.
fn extract_content(response: &Value) -> Option<&str> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
