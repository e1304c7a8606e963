//! Cache document storage.
//!
//! The cache is an explicit resource handed to the service, not a hidden
//! file-path constant: anything implementing [`CacheStore`] works, which is
//! how the tests substitute an in-memory store for the JSON file.

mod json;
mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

pub use json::{DEFAULT_CACHE_PATH, JsonFileStore};
pub use memory::MemoryStore;

use crate::message::EmailMessage;
use crate::Result;

/// Durable storage for the cache document.
///
/// A fetch cycle brackets its load/merge/save sequence with [`lock`]
/// (single-writer discipline): the full document is overwritten on save, so
/// two concurrent writers would silently lose one side's messages otherwise.
///
/// [`lock`]: CacheStore::lock
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Acquires the single-writer lock for a load/merge/save cycle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CacheLocked`] when another writer holds it.
    async fn lock(&self) -> Result<StoreLock>;

    /// Loads the cache document; an absent document is an empty sequence.
    ///
    /// # Errors
    ///
    /// Returns an error when the document exists but cannot be read or
    /// deserialized. Corruption is not recovered.
    async fn load(&self) -> Result<Vec<EmailMessage>>;

    /// Overwrites the cache document with the full sequence.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be written.
    async fn save(&self, messages: &[EmailMessage]) -> Result<()>;
}

/// Held single-writer lock; released on drop.
#[must_use = "dropping the lock releases it"]
pub struct StoreLock {
    inner: LockInner,
}

enum LockInner {
    /// Advisory lock file, removed on drop.
    File(PathBuf),
    /// In-process mutex guard.
    Memory(OwnedMutexGuard<()>),
}

impl StoreLock {
    pub(crate) const fn file(path: PathBuf) -> Self {
        Self {
            inner: LockInner::File(path),
        }
    }

    pub(crate) const fn memory(guard: OwnedMutexGuard<()>) -> Self {
        Self {
            inner: LockInner::Memory(guard),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let LockInner::File(path) = &self.inner {
            // Best effort: a stale lock file is reported on the next acquire.
            if let Err(error) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), %error, "failed to remove lock file");
            }
        }
    }
}

impl std::fmt::Debug for StoreLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            LockInner::File(path) => f.debug_tuple("StoreLock").field(path).finish(),
            LockInner::Memory(_) => f.debug_tuple("StoreLock").field(&"memory").finish(),
        }
    }
}
