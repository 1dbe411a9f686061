//! Configuration (layered: defaults < TOML file < env / `.env` < CLI flags).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::control_loop::LoopConfig;
use crate::error::MathChatError;
use crate::util::RetryPolicy;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MCP_URL: &str = "http://127.0.0.1:8000/mcp";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Settings for a client session.
///
/// Built explicitly and handed to constructors; nothing reads it globally.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathChatConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub mcp_url: String,
    pub system_prompt: Option<String>,
    pub max_iterations: usize,
    pub parallel_operations: bool,
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for MathChatConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            mcp_url: DEFAULT_MCP_URL.to_string(),
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallel_operations: true,
            request_timeout_ms: 60_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for MathChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MathChatConfig")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("mcp_url", &self.mcp_url)
            .field("system_prompt", &self.system_prompt)
            .field("max_iterations", &self.max_iterations)
            .field("parallel_operations", &self.parallel_operations)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("retry", &self.retry)
            .finish()
    }
}

impl MathChatConfig {
    /// Read a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MathChatError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            MathChatError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// Defaults overlaid with environment variables (loads `.env` if present).
    pub fn from_env() -> Result<Self, MathChatError> {
        Self::default().with_process_env()
    }

    /// Full resolution: defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, MathChatError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_process_env()
    }

    fn with_process_env(self) -> Result<Self, MathChatError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, MathChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.openai_base_url = url;
        }
        if let Some(model) = non_empty("MATHCHAT_MODEL") {
            self.model = model;
        }
        if let Some(url) = non_empty("MATHCHAT_MCP_URL") {
            self.mcp_url = url;
        }
        if let Some(prompt) = non_empty("MATHCHAT_SYSTEM_PROMPT") {
            self.system_prompt = Some(prompt);
        }
        if let Some(raw) = non_empty("MATHCHAT_MAX_ITERATIONS") {
            self.max_iterations = raw.trim().parse().map_err(|_| {
                MathChatError::Configuration(format!(
                    "MATHCHAT_MAX_ITERATIONS must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        Ok(self)
    }

    /// Reject settings no session could run with.
    pub fn validate(&self) -> Result<(), MathChatError> {
        if self.max_iterations == 0 {
            return Err(MathChatError::Configuration(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(MathChatError::Configuration("model must not be empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(MathChatError::Configuration(
                "request_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig::builder()
            .max_iterations(self.max_iterations)
            .parallel_operations(self.parallel_operations)
            .build()
    }
}
