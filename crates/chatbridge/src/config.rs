//! Configuration management for chatbridge.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. `--backend-url` / CHATBRIDGE_BACKEND_URL
//! 2. Config file (`$CHATBRIDGE_CONFIG` or ~/.chatbridge/config.toml)
//! 3. Default values

use anyhow::{Context, Result};
use chatbridge_core::client::{ClientConfig, DEFAULT_TIMEOUT_SECS};
use chatbridge_core::orchestrator::{OrchestratorConfig, DEFAULT_MODEL, DEFAULT_THREAD_TITLE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Conversation defaults
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL for the backend REST API
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Bearer token for the backend
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_thread_title")]
    pub default_thread_title: String,
}

fn default_backend_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_thread_title() -> String {
    DEFAULT_THREAD_TITLE.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_thread_title: default_thread_title(),
        }
    }
}

impl Config {
    /// Load configuration from the config file, if present.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CHATBRIDGE_CONFIG") {
            PathBuf::from(path)
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".chatbridge")
                .join("config.toml")
        }
    }

    /// Apply a command-line backend URL on top of the file value.
    pub fn with_backend_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.backend.url = url;
        }
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new(&self.backend.url)
            .with_timeout(Duration::from_secs(self.backend.timeout_secs));
        if let Some(ref token) = self.backend.token {
            client = client.with_token(token);
        }
        client
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            default_model: self.chat.default_model.clone(),
            default_thread_title: self.chat.default_thread_title.clone(),
        }
    }
}
