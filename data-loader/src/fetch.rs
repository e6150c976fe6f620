use crate::{
    config::{ConfigError, LoaderConfig},
    error::LoadError,
};
use async_trait::async_trait;
use surf::{Client, Url};
use utils::surf_logging::SurfLogging;

/// Raw response of a fetch, before any status check or decoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The transport a [`DataLoader`](crate::DataLoader) fetches resources with.
///
/// Implementations report transport failures as [`LoadError::Network`]. Status
/// checking and JSON decoding are done by the loader.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<FetchResponse, LoadError>;
}

/// [`Fetch`] implementation over a `surf` HTTP client
#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
    base_url: Option<Url>,
}

impl HttpFetcher {
    pub fn new(config: &LoaderConfig) -> Result<Self, ConfigError> {
        let base_url = match config.base_url() {
            Some(base) => Some(Url::parse(base).map_err(|err| ConfigError::InvalidBaseUrl {
                url: base.clone(),
                message: err.to_string(),
            })?),
            None => None,
        };

        let http: Client = <Client as TryFrom<surf::Config>>::try_from(
            surf::Config::new().set_timeout(config.request_timeout()),
        )
        .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self {
            http: http.with(SurfLogging),
            base_url,
        })
    }

    /// Resolve a resource key against the configured base URL
    pub fn resolve(&self, key: &str) -> Result<Url, LoadError> {
        let url = match &self.base_url {
            Some(base) => base.join(key),
            None => Url::parse(key),
        };
        url.map_err(|err| LoadError::network(key, err))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, key: &str) -> Result<FetchResponse, LoadError> {
        let url = self.resolve(key)?;

        let mut res = self
            .http
            .get(url.as_str())
            .await
            .map_err(|err| LoadError::network(key, err))?;
        let status: u16 = res.status().into();
        let body = res
            .body_bytes()
            .await
            .map_err(|err| LoadError::network(key, err))?;

        Ok(FetchResponse { status, body })
    }
}
