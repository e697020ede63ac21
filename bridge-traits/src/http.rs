//! HTTP transport seam
//!
//! Minimal async HTTP abstraction shared by the remote-system connectors.
//! Keeping the transport behind a trait lets the connectors be exercised
//! against scripted in-memory fakes, and keeps the two authentication
//! conventions (bearer token vs. API-key header) in one place.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// One outbound request, built up method-first.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Overrides the client's default timeout when set.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Delete, url)
    }

    fn with_method(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// OAuth-style bearer token (file storage API).
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Serialize `payload` as the JSON body and set the content type.
    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(payload)
            .map_err(|e| BridgeError::Parse(format!("JSON serialization failed: {}", e)))?;
        self.body = Some(Bytes::from(encoded));
        Ok(self.header("Content-Type", "application/json"))
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Fully-buffered response. Downloads in this pipeline are spreadsheet-sized,
/// so no streaming variant exists.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::Parse(format!("JSON deserialization failed: {}", e)))
    }

    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::Parse(format!("Invalid UTF-8: {}", e)))
    }
}

/// Async HTTP transport. Retry and pacing policy belong to the connectors,
/// not the transport.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = HttpRequest::get("https://api.example.com/fs")
            .bearer_token("tok")
            .header("Accept", "application/json");

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.headers.get("Authorization").unwrap(), "Bearer tok");
        assert_eq!(req.headers.get("Accept").unwrap(), "application/json");
        assert!(req.body.is_none());
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let req = HttpRequest::post("https://api.example.com/slurps")
            .json(&serde_json::json!({"project": "Pluto"}))
            .unwrap();

        assert_eq!(req.headers.get("Content-Type").unwrap(), "application/json");
        assert!(req.body.is_some());
    }

    #[test]
    fn test_response_status_helpers() {
        let resp = HttpResponse {
            status: 204,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(resp.is_success());
        assert!(!resp.is_server_error());
    }
}
