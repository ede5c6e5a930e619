use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::{ProviderId, RiskThresholds};

const ENV_CONFIG_PATH: &str = "CLAIMCHECK_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

fn default_llm_timeout_ms() -> u64 {
    30_000
}

fn default_provider_timeout_ms() -> u64 {
    6_000
}

fn default_enabled_providers() -> Vec<ProviderId> {
    vec![
        ProviderId::new(ProviderId::NEWS_SEARCH),
        ProviderId::new(ProviderId::FACT_CHECK),
    ]
}

fn default_max_content_chars() -> usize {
    10_000
}

fn default_max_items_per_provider() -> usize {
    3
}

/// Pipeline behaviour configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default)]
    pub risk_thresholds: RiskThresholds,
    /// Dispatch order of the verification fanout
    #[serde(default = "default_enabled_providers")]
    pub enabled_providers: Vec<ProviderId>,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default = "default_max_items_per_provider")]
    pub max_items_per_provider: usize,
    /// Whole-run deadline for requests coming through the API. None = no deadline.
    #[serde(default)]
    pub request_deadline_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm_timeout_ms: default_llm_timeout_ms(),
            provider_timeout_ms: default_provider_timeout_ms(),
            risk_thresholds: RiskThresholds::default(),
            enabled_providers: default_enabled_providers(),
            max_content_chars: default_max_content_chars(),
            max_items_per_provider: default_max_items_per_provider(),
            request_deadline_ms: None,
        }
    }
}

impl PipelineConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_ms.map(Duration::from_millis)
    }

    /// Drop duplicate providers (first occurrence wins) and replace invalid thresholds
    pub fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.enabled_providers.retain(|p| seen.insert(p.clone()));

        if !self.risk_thresholds.is_valid() {
            tracing::warn!(
                thresholds = ?self.risk_thresholds,
                "Risk thresholds must be strictly ascending within (0, 1), using defaults"
            );
            self.risk_thresholds = RiskThresholds::default();
        }

        self
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let pipeline = Self::load_config_file(&config_path)
            .map(|cf| cf.pipeline)
            .unwrap_or_default()
            .normalized();

        Self {
            pipeline,
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => match parse_config(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded configuration from file");
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse config file, using defaults"
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse YAML contents; an empty document yields the defaults
fn parse_config(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
    let contents = contents.trim();
    if contents.is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(contents)
}
