use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{CompletionBackend, CompletionError};
use crate::request::GenerateRequest;

const TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";
const ERROR_POINTER: &str = "/error/message";

/// `generateContent` endpoint client. The URL is used as-is, key included.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    url: String,
}

impl GeminiBackend {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }

    pub fn with_timeout(url: &str, timeout: Option<Duration>) -> Result<Self, CompletionError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.pointer(ERROR_POINTER).and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "Something went wrong".to_string());
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value =
            serde_json::from_str(&body).map_err(|e| CompletionError::MalformedBody(e.to_string()))?;

        json.pointer(TEXT_POINTER)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(CompletionError::MissingText)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::build_request;
    use crate::state::Turn;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerateRequest {
        build_request(&[Turn::user("Best beaches?")], "")
    }

    async fn backend_for(server: &MockServer) -> GeminiBackend {
        GeminiBackend::new(&format!("{}/v1/generate", server.uri()))
    }

    #[tokio::test]
    async fn test_posts_contents_and_extracts_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Best beaches?" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "Mirissa" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = backend_for(&server).await.generate(&request()).await.unwrap();
        assert_eq!(text, "Mirissa");
    }

    #[tokio::test]
    async fn test_error_status_carries_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "API key not valid" }
            })))
            .mount(&server)
            .await;

        let err = backend_for(&server).await.generate(&request()).await.unwrap_err();
        match err {
            CompletionError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend_for(&server).await.generate(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedBody(_)));
    }

    #[tokio::test]
    async fn test_missing_candidates_is_missing_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = backend_for(&server).await.generate(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingText));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/generate", listener.local_addr().unwrap());
        drop(listener);

        let err = GeminiBackend::new(&url).generate(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let backend = GeminiBackend::with_timeout(
            &format!("{}/v1/generate", server.uri()),
            Some(Duration::from_millis(50)),
        )
        .unwrap();
        let err = backend.generate(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }
}
