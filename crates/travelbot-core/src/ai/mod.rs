pub mod gemini;

pub use gemini::GeminiBackend;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::format::{self, FormattedText};
use crate::request::{GenerateRequest, WireContent};

/// Why no response could be obtained.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response body is not valid JSON: {0}")]
    MalformedBody(String),
    #[error("response contained no generated text")]
    MissingText,
}

/// Something that can turn a request into generated text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, CompletionError>;
}

/// A successful answer, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Markup-stripped, trimmed text.
    pub text: String,
    pub formatted: FormattedText,
}

impl Reply {
    pub fn from_raw(raw: &str) -> Self {
        Self {
            text: format::strip_markup(raw),
            formatted: format::format(raw),
        }
    }
}

#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// One backend call per invocation, no retries.
    pub async fn send(&self, contents: Vec<WireContent>) -> Result<Reply, CompletionError> {
        self.send_request(&GenerateRequest { contents }).await
    }

    pub async fn send_request(&self, request: &GenerateRequest) -> Result<Reply, CompletionError> {
        tracing::debug!(turns = request.contents.len(), "sending completion request");
        let raw = self.backend.generate(request).await?;
        Ok(Reply::from_raw(&raw))
    }
}
