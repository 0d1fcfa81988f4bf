//! Server configuration.
//!
//! Loaded with precedence:
//! 1. Environment variables (CHATBRIDGE_*)
//! 2. Config file (`$CHATBRIDGE_CONFIG` or ~/.chatbridge/server.toml)
//! 3. Default values

use anyhow::{Context, Result};
use chatbridge_core::client::{ClientConfig, DEFAULT_TIMEOUT_SECS};
use chatbridge_core::orchestrator::{OrchestratorConfig, DEFAULT_MODEL, DEFAULT_THREAD_TITLE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where conversations are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Remote REST backend at `backend.url`
    #[default]
    Http,
    /// Process-local store; nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub mode: BackendMode,
    /// Base URL of the backend REST API
    pub url: String,
    /// Bearer token for the backend
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub default_model: String,
    pub default_thread_title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            url: "http://localhost:8000/api/v1".to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            default_thread_title: DEFAULT_THREAD_TITLE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a TOML file, falling back to defaults when it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply CHATBRIDGE_* overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("CHATBRIDGE_BIND") {
            self.server.bind = bind;
        }
        if let Some(format) = lookup("CHATBRIDGE_LOG_FORMAT") {
            self.server.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => anyhow::bail!("Unknown CHATBRIDGE_LOG_FORMAT '{}'", other),
            };
        }
        if let Some(url) = lookup("CHATBRIDGE_BACKEND_URL") {
            if url == "memory" {
                self.backend.mode = BackendMode::Memory;
            } else {
                self.backend.mode = BackendMode::Http;
                self.backend.url = url;
            }
        }
        if let Some(token) = lookup("CHATBRIDGE_BACKEND_TOKEN") {
            self.backend.token = Some(token);
        }
        if let Some(timeout) = lookup("CHATBRIDGE_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = timeout
                .parse()
                .with_context(|| format!("Invalid CHATBRIDGE_BACKEND_TIMEOUT_SECS '{}'", timeout))?;
        }
        if let Some(model) = lookup("CHATBRIDGE_DEFAULT_MODEL") {
            self.chat.default_model = model;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CHATBRIDGE_CONFIG") {
            PathBuf::from(path)
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".chatbridge")
                .join("server.toml")
        }
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
