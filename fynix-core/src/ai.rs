//! The seam to the AI completion collaborator.
//!
//! Everything in this crate talks to the model through [`Completer`],
//! so tests can script responses instead of hitting an endpoint.

use async_trait::async_trait;

/// Retry budget for collaborator calls; only transient failures
/// (empty text, network errors) are re-attempted.
pub const COMPLETION_RETRIES: u32 = 2;

/// A prompt -> text completion service.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete_text(&self, request: ollama::Request) -> Result<String, ollama::Error>;
}

#[async_trait]
impl Completer for ollama::Ollama {
    async fn complete_text(&self, request: ollama::Request) -> Result<String, ollama::Error> {
        let response = self.complete_with_retry(request, COMPLETION_RETRIES).await?;
        Ok(response.text)
    }
}
