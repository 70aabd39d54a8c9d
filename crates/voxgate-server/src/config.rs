//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use voxgate_reply::completion::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use voxgate_reply::CompletionSettings;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// What the assistant says and how it sounds.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host used in callback URLs when a request carries neither
    /// `X-Forwarded-Host` nor `Host`.
    ///
    /// Must be set to the public host in production: the default
    /// [`DEFAULT_FALLBACK_HOST`] is not reachable by the carrier.
    #[serde(default = "default_fallback_host")]
    pub fallback_host: String,
}

impl ServerConfig {
    /// Whether callback URLs may still point at the local default host.
    pub fn uses_default_fallback_host(&self) -> bool {
        self.fallback_host.trim() == DEFAULT_FALLBACK_HOST
    }
}

/// Assistant persona.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Carrier voice identifier used for every spoken line.
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Spoken when a call starts.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// System instruction for the completion service.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

/// Completion service configuration.
///
/// Without an `api_key` replies come from the built-in rule table.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voxgate_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

/// Fallback host used when none is configured.
pub const DEFAULT_FALLBACK_HOST: &str = "localhost:3000";

fn default_fallback_host() -> String {
    DEFAULT_FALLBACK_HOST.to_string()
}

fn default_voice() -> String {
    "Polly.Joanna".to_string()
}

fn default_greeting() -> String {
    "Hi, this is your assistant. How can I help you today?".to_string()
}

fn default_system_prompt() -> String {
    "You are a concise, friendly phone assistant. Speak in short, natural sentences.".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            fallback_host: default_fallback_host(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            greeting: default_greeting(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Completion request settings, or `None` when no usable credential is
    /// configured.
    pub fn completion_settings(&self) -> Option<CompletionSettings> {
        let api_key = self
            .completion
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())?;

        Some(CompletionSettings {
            endpoint: self.completion.endpoint.clone(),
            api_key: api_key.to_string(),
            model: self.completion.model.clone(),
            system_prompt: self.assistant.system_prompt.clone(),
            temperature: self.completion.temperature,
            max_tokens: self.completion.max_tokens,
        })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOXGATE_HOST` overrides `server.host`
/// - `VOXGATE_PORT` overrides `server.port`
/// - `VOXGATE_FALLBACK_HOST` overrides `server.fallback_host`
/// - `ASSISTANT_VOICE` overrides `assistant.voice`
/// - `ASSISTANT_GREETING` overrides `assistant.greeting`
/// - `ASSISTANT_SYSTEM_PROMPT` overrides `assistant.system_prompt`
/// - `OPENAI_API_KEY` overrides `completion.api_key`
/// - `VOXGATE_COMPLETION_ENDPOINT` overrides `completion.endpoint`
/// - `VOXGATE_COMPLETION_MODEL` overrides `completion.model`
/// - `VOXGATE_LOG_LEVEL` overrides `logging.level`
/// - `VOXGATE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// Empty values are ignored.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(host) = var("VOXGATE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("VOXGATE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(fallback_host) = var("VOXGATE_FALLBACK_HOST") {
        config.server.fallback_host = fallback_host;
    }
    if let Some(voice) = var("ASSISTANT_VOICE") {
        config.assistant.voice = voice;
    }
    if let Some(greeting) = var("ASSISTANT_GREETING") {
        config.assistant.greeting = greeting;
    }
    if let Some(prompt) = var("ASSISTANT_SYSTEM_PROMPT") {
        config.assistant.system_prompt = prompt;
    }
    if let Some(api_key) = var("OPENAI_API_KEY") {
        config.completion.api_key = Some(api_key);
    }
    if let Some(endpoint) = var("VOXGATE_COMPLETION_ENDPOINT") {
        config.completion.endpoint = endpoint;
    }
    if let Some(model) = var("VOXGATE_COMPLETION_MODEL") {
        config.completion.model = model;
    }
    if let Some(level) = var("VOXGATE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("VOXGATE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
