//! OpenAI-compatible chat-completions provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Assistant;
use crate::{Error, Result};

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// [`Assistant`] implementation speaking the OpenAI chat-completions API.
///
/// Works against any endpoint that accepts the same request shape.
#[derive(Debug, Clone)]
pub struct OpenAiAssistant {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiAssistant {
    /// Creates a provider with the default endpoint and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Overrides the endpoint URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Overrides the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    async fn advise(&self, instructions: &str, context: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instructions,
                },
                ChatMessage {
                    role: "user",
                    content: context,
                },
            ],
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "requesting completion");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Assistant("response contained no completion".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn advise_round_trips_a_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"Two new messages."}}]}"#,
            )
            .create_async()
            .await;

        let assistant = OpenAiAssistant::new("test-key")
            .with_endpoint(format!("{}/v1/chat/completions", server.url()));

        let reply = assistant
            .advise("Summarize the mail below.", "subject: hi")
            .await
            .unwrap();
        assert_eq!(reply, "Two new messages.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .create_async()
            .await;

        let assistant = OpenAiAssistant::new("test-key")
            .with_endpoint(format!("{}/v1/chat/completions", server.url()));

        assert!(matches!(
            assistant.advise("sys", "ctx").await,
            Err(Error::Http(_))
        ));
    }

    #[tokio::test]
    async fn empty_choices_is_an_assistant_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let assistant = OpenAiAssistant::new("test-key")
            .with_endpoint(format!("{}/v1/chat/completions", server.url()));

        assert!(matches!(
            assistant.advise("sys", "ctx").await,
            Err(Error::Assistant(_))
        ));
    }
}
