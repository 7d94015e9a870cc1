//! Retrieval of the documents the generator depends on: template resources and taxpayer records.
//! Both are addressed by a relative path, which a `Transport` resolves against its root.

use async_trait::async_trait;
use std::path::PathBuf;

/// The outcome of a retrieval which reached the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Found(Vec<u8>),
    /// The source answered, but it has nothing at the path.
    Missing,
}

/// Whether intermediate caches may answer the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Default,
    NoCache,
}

/// Failures to reach the source at all, as opposed to a `Fetched::Missing` answer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The source answered with a status which says nothing about the presence of the document.
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid path {0:?}")]
    InvalidPath(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, path: &str, freshness: Freshness) -> Result<Fetched, TransportError>;
}

/// A transport over HTTP, every path is appended to the base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        HttpTransport {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_user_agent(
        base_url: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(900))
            .user_agent(user_agent)
            .build()
            .map_err(|source| TransportError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self::new(client, base_url))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, path: &str, freshness: Freshness) -> Result<Fetched, TransportError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self.client.get(&url);
        if freshness == Freshness::NoCache {
            request = request
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .header(reqwest::header::PRAGMA, "no-cache")
                .header(reqwest::header::EXPIRES, "0");
        }

        let response = request.send().await.map_err(|source| TransportError::Http {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            log::debug!("{} answered with status {}", url, status);
            return Ok(Fetched::Missing);
        }
        if !status.is_success() {
            return Err(TransportError::Status { url, status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| TransportError::Http { url, source })?;
        Ok(Fetched::Found(bytes.to_vec()))
    }
}

/// A transport over a local directory tree laid out like the HTTP one.
pub struct DirectoryTransport {
    root: PathBuf,
}

impl DirectoryTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryTransport { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, TransportError> {
        let relative = std::path::Path::new(path.trim_start_matches('/'));
        // Paths come from record identifiers and form codes, they must stay below the root
        if relative
            .components()
            .any(|component| !matches!(component, std::path::Component::Normal(_)))
        {
            return Err(TransportError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Transport for DirectoryTransport {
    async fn fetch(&self, path: &str, _freshness: Freshness) -> Result<Fetched, TransportError> {
        let file_path = self.resolve(path)?;
        match tokio::fs::read(&file_path).await {
            Ok(bytes) => Ok(Fetched::Found(bytes)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Fetched::Missing),
            Err(source) => Err(TransportError::Io {
                path: file_path,
                source,
            }),
        }
    }
}

/// Picks the transport for a root given either as an `http(s)` URL or as a directory.
pub fn transport_for_root(
    root: &str,
    user_agent: &str,
) -> Result<std::sync::Arc<dyn Transport>, TransportError> {
    if root.starts_with("http://") || root.starts_with("https://") {
        Ok(std::sync::Arc::new(HttpTransport::with_user_agent(
            root, user_agent,
        )?))
    } else {
        Ok(std::sync::Arc::new(DirectoryTransport::new(root)))
    }
}
