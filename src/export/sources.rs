//! Clip source resolution for staging.
//!
//! Clip `src` strings name one of four stores, told apart by prefix:
//!
//! | prefix                 | store                                  |
//! |------------------------|----------------------------------------|
//! | `blob:`                | in-memory blobs registered this session |
//! | `indexeddb://<id>`     | local device store, keyed by clip id   |
//! | `http://`, `https://`  | remote object storage                  |
//! | `file://`, `/...`      | host filesystem                        |

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::foundation::error::{ClipforgeError, ClipforgeResult};

const DEVICE_PREFIX: &str = "indexeddb://";

/// Where a clip's bytes live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceLocator {
    /// Transient in-memory blob; the full `blob:` URL is the key.
    Blob(String),
    /// Local device store entry.
    LocalDevice(String),
    /// Remote URL.
    Remote(String),
    /// Host file.
    File(PathBuf),
}

impl SourceLocator {
    /// Classify a clip `src`.
    pub fn parse(src: &str) -> ClipforgeResult<Self> {
        let src = src.trim();
        if src.is_empty() {
            return Err(ClipforgeError::staging("empty source locator"));
        }
        if src.starts_with("blob:") {
            return Ok(Self::Blob(src.to_string()));
        }
        if let Some(id) = src.strip_prefix(DEVICE_PREFIX) {
            if id.is_empty() || id.contains(['/', '\\']) || id == ".." {
                return Err(ClipforgeError::staging(format!(
                    "invalid local device reference {src:?}"
                )));
            }
            return Ok(Self::LocalDevice(id.to_string()));
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            return Ok(Self::Remote(src.to_string()));
        }
        if let Some(path) = src.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        if Path::new(src).is_absolute() {
            return Ok(Self::File(PathBuf::from(src)));
        }
        Err(ClipforgeError::staging(format!(
            "unsupported source locator {src:?}"
        )))
    }

    /// Short store name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::LocalDevice(_) => "device",
            Self::Remote(_) => "remote",
            Self::File(_) => "file",
        }
    }
}

/// Turns a clip source into bytes.
#[async_trait]
pub trait BlobResolver: Send + Sync {
    /// Fetch the bytes `src` points at.
    async fn resolve(&self, src: &str) -> ClipforgeResult<Vec<u8>>;
}

/// Resolver for all four stores.
#[derive(Debug, Default)]
pub struct DefaultResolver {
    http: reqwest::Client,
    blobs: RwLock<HashMap<String, Arc<Vec<u8>>>>,
    device_dir: Option<PathBuf>,
}

impl DefaultResolver {
    /// Resolver without a device store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `indexeddb://<id>` from files named `<id>` under `dir`.
    pub fn with_device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.device_dir = Some(dir.into());
        self
    }

    /// Use `client` for remote fetches.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Make `bytes` available under the `blob:` URL `url`.
    pub fn register_blob(&self, url: impl Into<String>, bytes: Vec<u8>) -> ClipforgeResult<()> {
        let url = url.into();
        if !url.starts_with("blob:") {
            return Err(ClipforgeError::validation(format!(
                "blob URL must start with \"blob:\", got {url:?}"
            )));
        }
        self.blobs
            .write()
            .map_err(|_| ClipforgeError::staging("blob registry lock poisoned"))?
            .insert(url, Arc::new(bytes));
        Ok(())
    }

    /// Drop a registered blob. Returns whether it existed.
    pub fn revoke_blob(&self, url: &str) -> bool {
        self.blobs
            .write()
            .map(|mut b| b.remove(url).is_some())
            .unwrap_or(false)
    }

    fn blob(&self, url: &str) -> ClipforgeResult<Vec<u8>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| ClipforgeError::staging("blob registry lock poisoned"))?;
        blobs
            .get(url)
            .map(|b| b.as_ref().clone())
            .ok_or_else(|| ClipforgeError::staging(format!("blob {url} is not registered")))
    }

    async fn device(&self, id: &str) -> ClipforgeResult<Vec<u8>> {
        let Some(dir) = &self.device_dir else {
            return Err(ClipforgeError::staging(format!(
                "clip {id} is stored on device but no device store is configured"
            )));
        };
        read_file(&dir.join(id))
            .await
            .map_err(|e| ClipforgeError::staging(format!("clip not found in device store: {id}: {e}")))
    }

    async fn remote(&self, url: &str) -> ClipforgeResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ClipforgeError::staging(format!("fetch {url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClipforgeError::staging(format!("fetch {url}: HTTP {status}")));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| ClipforgeError::staging(format!("fetch {url}: {e}")))?;
        Ok(body.to_vec())
    }
}

async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    use anyhow::Context;
    tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))
}

#[async_trait]
impl BlobResolver for DefaultResolver {
    async fn resolve(&self, src: &str) -> ClipforgeResult<Vec<u8>> {
        let locator = SourceLocator::parse(src)?;
        let bytes = match &locator {
            SourceLocator::Blob(url) => self.blob(url)?,
            SourceLocator::LocalDevice(id) => self.device(id).await?,
            SourceLocator::Remote(url) => self.remote(url).await?,
            SourceLocator::File(path) => read_file(path)
                .await
                .map_err(|e| ClipforgeError::staging(format!("{e:#}")))?,
        };
        if bytes.is_empty() {
            return Err(ClipforgeError::staging(format!("source {src} is empty")));
        }
        tracing::debug!(kind = locator.kind(), bytes = bytes.len(), "source resolved");
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/sources.rs"]
mod tests;
