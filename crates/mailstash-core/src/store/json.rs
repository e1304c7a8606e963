//! JSON-file cache store.
//!
//! The document is a single JSON array of message records, fully rewritten
//! on every save. The default location mirrors the original tool:
//! `Cache/emailCache.json` relative to the working directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{CacheStore, StoreLock};
use crate::message::EmailMessage;
use crate::{Error, Result};

/// Default cache document path.
pub const DEFAULT_CACHE_PATH: &str = "Cache/emailCache.json";

/// File-backed [`CacheStore`] persisting one JSON array document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store for the given document path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    async fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PATH)
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn lock(&self) -> Result<StoreLock> {
        self.ensure_parent_dir().await?;

        let lock_path = self.lock_path();
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(_) => {
                debug!(path = %lock_path.display(), "acquired cache lock");
                Ok(StoreLock::file(lock_path))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::CacheLocked(lock_path)),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self) -> Result<Vec<EmailMessage>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        // A corrupt document propagates; there is no recovery path.
        Ok(serde_json::from_str(&json)?)
    }

    async fn save(&self, messages: &[EmailMessage]) -> Result<()> {
        self.ensure_parent_dir().await?;
        let json = serde_json::to_string_pretty(messages)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), count = messages.len(), "cache document written");
        Ok(())
    }
}
