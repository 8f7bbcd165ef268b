//! Generative-language API client

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::draft::{DraftBackend, DraftError};

/// Client for the `generateContent` endpoint.
///
/// When no API key is configured the request goes out without one, which is
/// what a key-holding proxy in front of the real endpoint expects.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

impl GeminiClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
        }
    }

    /// Send one prompt and return the first candidate's text. No retries.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, DraftError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Draft request failed: {}", e);
            DraftError::Transport(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DraftError::Transport(e.to_string()))?;
        tracing::debug!(%status, bytes = body.len(), "draft response received");

        decode_response(&body)
    }
}

impl DraftBackend for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, DraftError> {
        self.generate_text(prompt).await
    }
}

/// Pull the generated text out of a response body, or the remote error.
fn decode_response(body: &str) -> Result<String, DraftError> {
    let response: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        tracing::warn!("Draft response is not the expected JSON: {}", e);
        DraftError::UnexpectedResponse
    })?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text);

    if let Some(text) = text {
        return Ok(text);
    }

    match response.error {
        Some(error) => Err(DraftError::remote(error.message)),
        None => Err(DraftError::UnexpectedResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const OK_BODY: &str = r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#;

    fn local_client(endpoint: String, api_key: Option<&str>) -> GeminiClient {
        GeminiClient {
            client: Client::builder().no_proxy().build().unwrap(),
            endpoint,
            api_key: api_key.map(str::to_string),
        }
    }

    /// Accept one request, answer with `OK_BODY` and return the request head
    /// lowercased.
    async fn serve_once(listener: TcpListener) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            OK_BODY.len(),
            OK_BODY
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        let end = buf
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .unwrap_or(buf.len());
        String::from_utf8_lossy(&buf[..end]).to_lowercase()
    }

    async fn send_to_local_server(api_key: Option<&str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/generate", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener));

        let text = local_client(endpoint, api_key)
            .generate_text("hi")
            .await
            .unwrap();
        assert_eq!(text, "ok");
        server.await.unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let err = local_client("http://127.0.0.1:1/generate".into(), None)
            .generate_text("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::Transport(_)));
    }

    #[tokio::test]
    async fn test_api_key_sent_in_header() {
        let head = send_to_local_server(Some("secret-key")).await;
        assert!(head.starts_with("post /generate "));
        assert!(head.contains("x-goog-api-key: secret-key"));
    }

    #[tokio::test]
    async fn test_no_key_sends_no_key_header() {
        let head = send_to_local_server(None).await;
        assert!(!head.contains("x-goog-api-key"));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "contents": [ { "parts": [ { "text": "hello" } ] } ] })
        );
    }

    #[test]
    fn test_decode_success() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"生成結果"}],"role":"model"}}]}"#;
        assert_eq!(decode_response(body).unwrap(), "生成結果");
    }

    #[test]
    fn test_decode_remote_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            decode_response(body).unwrap_err(),
            DraftError::Remote("API key not valid".into())
        );
    }

    #[test]
    fn test_decode_error_without_message() {
        let body = r#"{"error":{"code":500}}"#;
        assert!(matches!(
            decode_response(body).unwrap_err(),
            DraftError::Remote(_)
        ));
    }

    #[test]
    fn test_decode_empty_candidates() {
        assert_eq!(
            decode_response(r#"{"candidates":[]}"#).unwrap_err(),
            DraftError::UnexpectedResponse
        );
        assert_eq!(
            decode_response("<html>bad gateway</html>").unwrap_err(),
            DraftError::UnexpectedResponse
        );
    }
}
