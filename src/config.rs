use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use validator::Validate;

use crate::telemetry::LogFormat;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub enable_cors: bool,
    #[serde(default = "default_max_body_bytes")]
    #[validate(range(min = 1024))]
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModelConfig {
    /// Serialized model artifact written by the training tooling
    pub artifact_path: PathBuf,
    /// Reject artifacts whose schema differs from the built-in one
    #[serde(default = "default_enforce_builtin_schema")]
    pub enforce_builtin_schema: bool,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_enforce_builtin_schema() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("SHORTFALL__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract().context("failed to read configuration")?;
        cfg.validate().context("invalid configuration")?;
        if cfg.model.artifact_path.as_os_str().is_empty() {
            anyhow::bail!("invalid configuration: model.artifact_path is empty");
        }
        Ok(cfg)
    }
}
