//! LLM-backed assistant capability.
//!
//! The cache itself has no use for a language model; this seam exists so a
//! caller can hand fetched mail to a provider and get a textual
//! recommendation back. It is a single capability ("produce a response
//! given instructions and context"), not an agent framework.

mod openai;

use async_trait::async_trait;

pub use openai::OpenAiAssistant;

use crate::Result;

/// Something that can produce a recommended response for a prompt.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Produces a response to `context` under the given `instructions`.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider is unreachable or replies with an
    /// unusable payload.
    async fn advise(&self, instructions: &str, context: &str) -> Result<String>;
}
