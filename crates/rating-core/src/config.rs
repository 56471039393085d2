use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config as cfg;
use serde::{Deserialize, Serialize};

use crate::Vocabulary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    /// Largest accepted delta payload.
    #[serde(default = "ServerConfig::default_body_limit")]
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_body_limit() -> usize {
        50 * 1024 * 1024
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            body_limit_bytes: Self::default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sparql,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SPARQL endpoint used for both queries and updates
    #[serde(default = "StoreConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "StoreConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    fn default_endpoint() -> String {
        "http://database:8890/sparql".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            endpoint: Self::default_endpoint(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Targets recomputed concurrently within one batch.
    #[serde(default = "PipelineConfig::default_max_concurrency")]
    pub max_concurrency: usize,
}

impl PipelineConfig {
    fn default_max_concurrency() -> usize {
        1
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: Self::default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "rating_api=info,rating_graph=info,tower_http=info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub vocabulary: Vocabulary,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            vocabulary: Vocabulary::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    pub fn default_env() -> String {
        env::var("APP_ENV")
            .ok()
            .or_else(|| env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    /// `RATING_CONFIG_DIR` if set, otherwise `./config`.
    pub fn default_config_dir() -> PathBuf {
        if let Ok(dir) = env::var("RATING_CONFIG_DIR") {
            return PathBuf::from(dir);
        }
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        cwd.join("config")
    }

    /// Load from the default config directory and environment, then validate.
    pub fn load() -> Result<Self> {
        let config_dir = Self::default_config_dir();
        let env_name = Self::default_env();
        let settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Self> {
        let builder = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                cfg::Environment::with_prefix("RATING")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("store.endpoint", env::var("MU_SPARQL_ENDPOINT").ok())
            .context("applying MU_SPARQL_ENDPOINT override")?;

        let settings: Settings = builder
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.server.host.trim().is_empty(),
            "server.host cannot be empty"
        );
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            self.server.body_limit_bytes > 0,
            "server.body_limit_bytes must be > 0"
        );

        if self.store.backend == StoreBackend::Sparql {
            url::Url::parse(&self.store.endpoint)
                .with_context(|| format!("store.endpoint is not a valid URL: {}", self.store.endpoint))?;
        }
        anyhow::ensure!(self.store.timeout_secs > 0, "store.timeout_secs must be > 0");
        anyhow::ensure!(
            self.pipeline.max_concurrency > 0,
            "pipeline.max_concurrency must be > 0"
        );

        let vocabulary = [
            ("vocabulary.rating_predicate", &self.vocabulary.rating_predicate),
            ("vocabulary.about_predicate", &self.vocabulary.about_predicate),
            ("vocabulary.average_predicate", &self.vocabulary.average_predicate),
            ("vocabulary.graph", &self.vocabulary.graph),
        ];
        for (key, value) in vocabulary {
            anyhow::ensure!(!value.trim().is_empty(), "{} cannot be empty", key);
        }

        Ok(())
    }
}
