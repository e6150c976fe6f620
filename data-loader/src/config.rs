use figment::providers::{Format, Serialized, Yaml};
use figment::Figment;
use getset::Getters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Configuration for a [`DataLoader`](crate::DataLoader) and its HTTP fetcher
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
#[get = "pub"]
pub struct LoaderConfig {
    /// Whether memoization and deduplication are enabled. When disabled every
    /// call performs its own fetch.
    enabled: bool,
    /// Base URL that relative resource keys are resolved against
    base_url: Option<String>,
    /// Per-request timeout applied by the HTTP fetcher, in milliseconds
    request_timeout_ms: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl LoaderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the request timeout. Sub-millisecond parts are rounded up.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_ms = timeout
            .map(|t| u64::try_from(t.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX));
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Load the configuration from a YAML file, falling back to defaults for
    /// anything the file leaves out.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::extract(Figment::from(Serialized::defaults(Self::default())).merge(Yaml::file(path)))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::extract(Figment::from(Serialized::defaults(Self::default())).merge(Yaml::string(yaml)))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        if let Some(base_url) = &config.base_url {
            surf::Url::parse(base_url).map_err(|err| ConfigError::InvalidBaseUrl {
                url: base_url.clone(),
                message: err.to_string(),
            })?;
        }
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read loader configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("Invalid base URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
