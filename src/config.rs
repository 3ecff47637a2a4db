//! Application configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `CHAT_CONTEXT` (sections separated by
//! `__`, e.g. `CHAT_CONTEXT__CONTEXT__MAX_CONTEXT=4096`).

use crate::context::EvictionConfig;
use crate::error::{ContextError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

const ENV_PREFIX: &str = "CHAT_CONTEXT";

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub context: ContextManageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Completion endpoint configuration
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    /// Model name, also used to select the tokenizer encoding
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Chat completions endpoint
    #[serde(default = "default_request_address")]
    pub request_address: String,

    /// API key (read from env OPENAI_API_KEY if not set)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<usize>,
}

fn default_model_name() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_request_address() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            request_address: default_request_address(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Context budget and eviction policy
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContextManageConfig {
    /// Token budget the transcript is trimmed back under
    #[serde(default = "default_max_context")]
    pub max_context: usize,

    /// Optional system prompt seeded at the start of every session
    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub eviction: EvictionConfig,
}

fn default_max_context() -> usize {
    3200
}

impl Default for ContextManageConfig {
    fn default() -> Self {
        Self {
            max_context: default_max_context(),
            system_prompt: None,
            eviction: EvictionConfig::default(),
        }
    }
}

impl ContextManageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_context == 0 {
            return Err(ContextError::Configuration(
                "max_context must be greater than zero".to_string(),
            ));
        }
        self.eviction.validate()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from `path` (optional) and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.with_env_api_key().validated()
    }

    /// Fill a missing API key from OPENAI_API_KEY
    fn with_env_api_key(mut self) -> Self {
        if self.model.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.model.api_key = Some(SecretString::new(key));
            }
        }
        self
    }

    fn validated(self) -> Result<Self> {
        self.context.validate()?;
        Ok(self)
    }
}
