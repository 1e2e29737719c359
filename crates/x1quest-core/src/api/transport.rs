//! HTTP plumbing shared by the authenticator and the request executor.
//!
//! `RequestSpec` describes a call relative to one of the service roots;
//! `Transport` sends a fully-resolved `HttpRequest`. The production
//! transport is reqwest, tests substitute a scripted one.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::ApiError;
use crate::config::Config;

/// Which remote service a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRoot {
    /// Quest and profile API
    Primary,
    /// Testnet faucet API
    Faucet,
}

impl ApiRoot {
    pub fn base_url<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            ApiRoot::Primary => &config.api_base_url,
            ApiRoot::Faucet => &config.faucet_base_url,
        }
    }
}

/// Description of one logical API call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub root: ApiRoot,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn new(root: ApiRoot, method: Method, path: impl Into<String>) -> Self {
        Self {
            root,
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(root: ApiRoot, path: impl Into<String>) -> Self {
        Self::new(root, Method::GET, path)
    }

    pub fn post(root: ApiRoot, path: impl Into<String>) -> Self {
        Self::new(root, Method::POST, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Absolute URL against the configured root
    pub fn url(&self, config: &Config) -> String {
        join_url(self.root.base_url(config), &self.path)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// A resolved request ready to hit the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parse the body as JSON; an empty body is `null`.
    pub fn json(&self) -> Result<Value, ApiError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Body is not JSON: {}", e)))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request. Only transport-level failures are errors here; any
    /// HTTP status comes back as a response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read response body: {}", e)))?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joins_roots() {
        let config = Config::default();
        let spec = RequestSpec::get(ApiRoot::Primary, "/quests");
        assert_eq!(spec.url(&config), "https://testnet-api.x1.one/quests");

        let spec = RequestSpec::get(ApiRoot::Faucet, "testnet/faucet");
        assert_eq!(spec.url(&config), "https://nft-api.x1.one/testnet/faucet");

        assert_eq!(join_url("http://h/", "/me"), "http://h/me");
    }

    #[test]
    fn test_spec_builders() {
        let spec = RequestSpec::post(ApiRoot::Primary, "/quests")
            .with_query("quest_id", "42")
            .with_json(json!({"a": 1}));
        assert_eq!(spec.method, Method::POST);
        assert_eq!(spec.query, vec![("quest_id".to_string(), "42".to_string())]);
        assert_eq!(spec.body, Some(json!({"a": 1})));
    }

    #[test]
    fn test_response_json() {
        assert_eq!(HttpResponse::new(StatusCode::OK, "").json(), Ok(Value::Null));
        assert_eq!(
            HttpResponse::new(StatusCode::OK, r#"{"ok":true}"#).json(),
            Ok(json!({"ok": true}))
        );
        assert!(matches!(
            HttpResponse::new(StatusCode::OK, "<html>").json(),
            Err(ApiError::InvalidResponse(_))
        ));
    }
}
