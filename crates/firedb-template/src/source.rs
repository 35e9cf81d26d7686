//! Where template text comes from.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, TemplateError};

/// Fetches template text by location.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<String>;
}

fn fetch_error(location: &str, message: impl ToString) -> TemplateError {
    TemplateError::Fetch {
        path: location.to_string(),
        message: message.to_string(),
    }
}

/// Fetches templates over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("firedb-template/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| fetch_error("<client>", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TemplateSource for HttpSource {
    async fn fetch(&self, location: &str) -> Result<String> {
        debug!(location, "Fetching template over HTTP");
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| fetch_error(location, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(location, format!("HTTP {}", status.as_u16())));
        }
        response.text().await.map_err(|e| fetch_error(location, e))
    }
}

/// Reads templates from the filesystem, relative to an optional root.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

#[async_trait]
impl TemplateSource for FileSource {
    async fn fetch(&self, location: &str) -> Result<String> {
        let path = match &self.root {
            Some(root) => root.join(location),
            None => PathBuf::from(location),
        };
        debug!(path = %path.display(), "Reading template file");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| fetch_error(location, e))
    }
}

/// Fetches `http://` and `https://` locations over HTTP and everything else
/// from the filesystem.
#[derive(Debug, Clone)]
pub struct DefaultSource {
    http: HttpSource,
    files: FileSource,
}

impl DefaultSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: HttpSource::new()?,
            files: FileSource::new(),
        })
    }

    pub fn with_file_root(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            http: HttpSource::new()?,
            files: FileSource::with_root(root),
        })
    }
}

#[async_trait]
impl TemplateSource for DefaultSource {
    async fn fetch(&self, location: &str) -> Result<String> {
        if location.starts_with("http://") || location.starts_with("https://") {
            self.http.fetch(location).await
        } else {
            self.files.fetch(location).await
        }
    }
}
