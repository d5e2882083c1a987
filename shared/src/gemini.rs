//! Gemini client for answering free-form voice queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{Config, Error, Result};

/// Spoken when the model answers with an empty string.
pub const EMPTY_ANSWER_FILLER: &str = "I'm not sure what to say about that.";

/// Anything that can turn a prompt into answer text.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Send a prompt and return the answer text.
    async fn query(&self, prompt: &str) -> Result<String>;
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// Single-turn request carrying one text part.
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

/// A content block made of parts.
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single text part.
#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response body from `generateContent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One generated candidate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }

    /// Extract the answer, substituting the filler for blank text.
    pub fn into_answer(self) -> Result<String> {
        let text = self
            .first_text()
            .ok_or_else(|| Error::Decode("No candidate text in Gemini response".to_string()))?
            .trim();

        if text.is_empty() {
            Ok(EMPTY_ANSWER_FILLER.to_string())
        } else {
            Ok(text.to_string())
        }
    }
}

/// Client for the Gemini REST API.
pub struct GeminiClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(http_client: reqwest::Client, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            http_client,
            endpoint,
            api_key,
        }
    }

    /// Create a client for the model and key in `config`.
    pub fn from_config(http_client: reqwest::Client, config: &Config) -> Self {
        Self::new(
            http_client,
            config.gemini_endpoint(),
            config.gemini_api_key.clone(),
        )
    }
}

#[async_trait]
impl QueryClient for GeminiClient {
    async fn query(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Gemini request failed: {} - {}", status, body);
            return Err(Error::Upstream(format!("Gemini returned {}", status)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Decode(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(reason) = parsed.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            info!("Gemini finished with reason {}", reason);
        }

        parsed.into_answer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one HTTP request with a canned response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/v1beta", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn client_for(base: &str, api_key: Option<&str>) -> GeminiClient {
        let http_client = reqwest::Client::builder().no_proxy().build().unwrap();
        GeminiClient::new(
            http_client,
            format!("{}/models/gemini-test:generateContent", base),
            api_key.map(str::to_string),
        )
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateContentRequest::from_prompt("why is the sky blue")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"parts": [{"text": "why is the sky blue"}]}]})
        );
    }

    #[test]
    fn test_extracts_first_candidate_text() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Rayleigh scattering."}], "role": "model"}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_answer().unwrap(), "Rayleigh scattering.");
    }

    #[test]
    fn test_blank_text_uses_filler() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_answer().unwrap(), EMPTY_ANSWER_FILLER);
    }

    #[test]
    fn test_missing_shape_is_decode_error() {
        for json in [
            r#"{}"#,
            r#"{"candidates": []}"#,
            r#"{"candidates": [{"finishReason": "SAFETY"}]}"#,
            r#"{"candidates": [{"content": {"parts": []}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{}]}}]}"#,
        ] {
            let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
            assert!(
                matches!(response.into_answer(), Err(Error::Decode(_))),
                "expected decode error for {}",
                json
            );
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let client = GeminiClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/unreachable".to_string(),
            None,
        );
        let result = client.query("hello").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_query_sends_key_and_prompt() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"candidates": [{"content": {"parts": [{"text": "Hi there."}]}, "finishReason": "STOP"}]}"#,
        )
        .await;

        let answer = client_for(&base, Some("test-key")).query("hello").await.unwrap();
        assert_eq!(answer, "Hi there.");

        let request = server.await.unwrap();
        assert!(
            request.starts_with("POST /v1beta/models/gemini-test:generateContent?key=test-key HTTP/1.1"),
            "unexpected request line: {}",
            request.lines().next().unwrap_or_default()
        );
        assert!(request.ends_with(r#"{"contents":[{"parts":[{"text":"hello"}]}]}"#));
    }

    #[tokio::test]
    async fn test_server_error_is_upstream() {
        let (base, server) = serve_once(
            "500 Internal Server Error",
            r#"{"error": {"code": 500, "message": "backend unavailable"}}"#,
        )
        .await;

        let result = client_for(&base, Some("test-key")).query("hello").await;
        assert!(matches!(result, Err(Error::Upstream(_))), "got {:?}", result);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let (base, server) = serve_once("200 OK", "<html>not json</html>").await;

        let result = client_for(&base, Some("test-key")).query("hello").await;
        assert!(matches!(result, Err(Error::Decode(_))), "got {:?}", result);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client_for(&format!("http://{}/v1beta", addr), Some("test-key"))
            .query("hello")
            .await;
        assert!(matches!(result, Err(Error::Network(_))), "got {:?}", result);
    }
}
