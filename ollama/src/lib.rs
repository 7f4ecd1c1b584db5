//! Minimal client for Ollama-compatible completion endpoints.
//!
//! This crate provides a focused client for the `/api/generate` route:
//! - Plain prompt -> text completions
//! - Optional system prompt and temperature
//! - Base64 image attachments for vision models
//! - A retry wrapper that re-attempts transient failures only

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";

/// Fixed delay between retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Errors that can occur when using the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether a retry could plausibly change the outcome.
    ///
    /// Empty responses and network failures are transient; API errors
    /// and parse failures are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_) | Error::EmptyResponse)
    }
}

/// Ollama API client.
#[derive(Clone)]
pub struct Ollama {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl Ollama {
    /// Create a new client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a client from the OLLAMA_URL environment variable,
    /// falling back to the default local endpoint.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send a completion request and return the full response.
    pub async fn complete(&self, request: Request) -> Result<Response, Error> {
        let api_request = self.build_api_request(&request);
        let headers = build_headers();

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        if api_response.response.trim().is_empty() {
            return Err(Error::EmptyResponse);
        }

        Ok(Response {
            text: api_response.response,
            model: api_response.model,
        })
    }

    /// Send a completion request, retrying transient failures.
    ///
    /// Re-attempts up to `retries` additional times, only when the
    /// failure is transient (empty response or network error), with a
    /// fixed 500 ms backoff between attempts.
    pub async fn complete_with_retry(
        &self,
        request: Request,
        retries: u32,
    ) -> Result<Response, Error> {
        let mut last_error = Error::EmptyResponse;

        for attempt in 0..=retries {
            match self.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !e.is_transient() || attempt == retries {
                        return Err(e);
                    }
                    last_error = e;
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }

        Err(last_error)
    }

    fn build_api_request(&self, request: &Request) -> ApiRequest {
        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            images: if request.images.is_empty() {
                None
            } else {
                Some(request.images.clone())
            },
            options: request.temperature.map(|t| ApiOptions { temperature: t }),
            stream: false,
        }
    }
}

fn build_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    /// Base64-encoded images for vision models (no data-URL prefix).
    pub images: Vec<String>,
}

impl Request {
    /// Create a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
            system: None,
            temperature: None,
            images: Vec::new(),
        }
    }

    /// Render a role-tagged chat transcript plus a new user message
    /// into a single prompt.
    pub fn from_transcript(history: &[(String, String)], message: &str) -> Self {
        let mut prompt = history
            .iter()
            .map(|(role, content)| format!("{role}: {content}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        if !prompt.is_empty() {
            prompt.push_str("\n\n");
        }
        prompt.push_str("user: ");
        prompt.push_str(message);
        Self::new(prompt)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_image(mut self, base64: impl Into<String>) -> Self {
        self.images.push(base64.into());
        self
    }
}

/// A completion response.
#[derive(Debug, Clone)]
pub struct Response {
    /// The generated text.
    pub text: String,

    /// The model that produced it.
    pub model: String,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ApiOptions>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    response: String,
    #[allow(dead_code)]
    #[serde(default)]
    done: bool,
}
