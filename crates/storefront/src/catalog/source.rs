//! Bootstrap sources for the catalog document.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;
use url::Url;

use super::CatalogError;

/// Somewhere the raw catalog document can be fetched from.
pub trait CatalogSource {
    /// Fetch the raw JSON document (an ordered array of products).
    fn fetch_document(&self) -> impl Future<Output = Result<String, CatalogError>> + Send;
}

/// Static document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalogSource {
    async fn fetch_document(&self) -> Result<String, CatalogError> {
        debug!(path = %self.path.display(), "Reading catalog document");
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::Io {
                path: self.path.display().to_string(),
                source,
            })
    }
}

/// Static document served over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpCatalogSource {
    /// Create a source for `url`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Http` if the HTTP client fails to build.
    pub fn new(url: Url) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, url })
    }
}

impl CatalogSource for HttpCatalogSource {
    async fn fetch_document(&self) -> Result<String, CatalogError> {
        debug!(url = %self.url, "Fetching catalog document");
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Source chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredCatalogSource {
    File(FileCatalogSource),
    Http(HttpCatalogSource),
}

impl ConfiguredCatalogSource {
    /// Interpret `location` as an `http(s)` URL, or otherwise a file path.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Http` if the HTTP client fails to build.
    pub fn from_location(location: &str) -> Result<Self, CatalogError> {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Ok(Self::Http(HttpCatalogSource::new(url)?))
            }
            _ => Ok(Self::File(FileCatalogSource::new(location))),
        }
    }
}

impl CatalogSource for ConfiguredCatalogSource {
    async fn fetch_document(&self) -> Result<String, CatalogError> {
        match self {
            Self::File(source) => source.fetch_document().await,
            Self::Http(source) => source.fetch_document().await,
        }
    }
}
