//! # mailstash-core
//!
//! Core logic for mailstash: a durable local mirror of fetched mail.
//!
//! This crate provides:
//! - The [`EmailMessage`] record and the sort/count/take operations over
//!   sequences of them
//! - The [`CacheStore`] abstraction with JSON-file and in-memory
//!   implementations, including single-writer locking
//! - The [`MailCache`] service: fetch mailbox summaries, deduplicate against
//!   the cache by Message-ID, download only new messages, merge and persist
//! - The [`Assistant`] capability seam for LLM-backed mail digests
//!
//! Failure handling is deliberately fail-fast: connectivity, storage and
//! serialization errors propagate to the caller unchanged, with no retry
//! and no partial results. The one silent coercion — unparseable dates sort
//! as the minimum timestamp — is inherited behavior, kept and tested.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod assistant;
mod error;
pub mod message;
pub mod service;
pub mod store;

pub use assistant::{Assistant, OpenAiAssistant};
pub use error::{Error, Result};
pub use message::{DATE_FORMAT, EmailMessage, count, sort_ascending, sort_descending, take_first};
pub use service::{DEFAULT_FETCH_WINDOW, ImapConfig, ImapSource, MailCache, MailSource, MessageSummary};
pub use store::{CacheStore, DEFAULT_CACHE_PATH, JsonFileStore, MemoryStore, StoreLock};
