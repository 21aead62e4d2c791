//! Out-of-band HTTP for the `api_call` tool.
//!
//! GET and POST only. The destination must already have passed the egress
//! guard; redirects are not followed, so a 30x cannot walk the request onto
//! an address the guard never saw. Response bodies are capped before they
//! are handed back to the producer.

use arenaguard_config::ApiCallConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApiMethod {
    Get,
    Post,
}

impl ApiMethod {
    /// Case-insensitive. Anything but GET or POST is refused.
    pub fn parse(method: &str) -> Option<Self> {
        match method.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub url: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiCallError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Transport(String),
}

/// Sends an approved request. Implementations never follow redirects.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiCallError>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    max_response_bytes: usize,
}

impl HttpTransport {
    pub fn new(timeout: Duration, max_response_bytes: usize) -> Result<Self, ApiCallError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ApiCallError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            max_response_bytes,
        })
    }

    pub fn from_config(config: &ApiCallConfig) -> Result<Self, ApiCallError> {
        Self::new(Duration::from_secs(config.timeout_secs), config.max_response_bytes)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiCallError> {
        let mut builder = match request.method {
            ApiMethod::Get => self.client.get(&request.url),
            ApiMethod::Post => self.client.post(&request.url),
        };
        if let (ApiMethod::Post, Some(body)) = (request.method, &request.body) {
            builder = match serde_json::from_str::<Value>(body) {
                Ok(json) => builder.json(&json),
                Err(_) => builder.body(body.clone()),
            };
        }

        let mut response = builder.send().await.map_err(map_reqwest)?;
        let status = response.status().as_u16();

        let mut bytes = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest)? {
            let room = self.max_response_bytes.saturating_sub(bytes.len());
            if chunk.len() > room {
                bytes.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!(
            method = request.method.as_str(),
            status,
            bytes = bytes.len(),
            truncated,
            "api_call completed"
        );

        Ok(ApiResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            truncated,
        })
    }
}

fn map_reqwest(e: reqwest::Error) -> ApiCallError {
    if e.is_timeout() {
        ApiCallError::Timeout
    } else {
        ApiCallError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_and_post() {
        assert_eq!(ApiMethod::parse("get"), Some(ApiMethod::Get));
        assert_eq!(ApiMethod::parse(" POST "), Some(ApiMethod::Post));
        assert_eq!(ApiMethod::parse("DELETE"), None);
        assert_eq!(ApiMethod::parse("PUT"), None);
    }

    #[test]
    fn response_serializes_for_producer() {
        let resp = ApiResponse {
            status: 200,
            body: "{}".into(),
            truncated: false,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], 200);
        assert_eq!(json["truncated"], false);
    }

    #[test]
    fn transport_builds_from_config() {
        assert!(HttpTransport::from_config(&ApiCallConfig::default()).is_ok());
    }
}
