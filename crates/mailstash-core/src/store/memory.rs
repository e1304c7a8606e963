//! In-memory cache store, mainly for tests and embedding.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{CacheStore, StoreLock};
use crate::message::EmailMessage;
use crate::Result;

/// A [`CacheStore`] kept entirely in memory.
///
/// Cloning yields a handle to the same underlying document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    messages: Arc<Mutex<Vec<EmailMessage>>>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with messages.
    #[must_use]
    pub fn with_messages(messages: Vec<EmailMessage>) -> Self {
        Self {
            messages: Arc::new(Mutex::new(messages)),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Returns a copy of the current document.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EmailMessage> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn lock(&self) -> Result<StoreLock> {
        // Unlike the file store this waits instead of refusing; in-process
        // callers share a runtime and can queue.
        Ok(StoreLock::memory(Arc::clone(&self.gate).lock_owned().await))
    }

    async fn load(&self) -> Result<Vec<EmailMessage>> {
        Ok(self.snapshot())
    }

    async fn save(&self, messages: &[EmailMessage]) -> Result<()> {
        *self
            .messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = messages.to_vec();
        Ok(())
    }
}
