//! Resilient request execution.
//!
//! Every API call goes through `RequestExecutor::execute`, which attaches the
//! session token, retries transient failures with exponential backoff and
//! re-authenticates once when the service answers 401.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::transport::{HttpRequest, RequestSpec, Transport};
use super::ApiError;
use crate::auth::{token, SessionAuthenticator};
use crate::config::Config;

/// Liveness marker the API's bot filter expects on data calls.
const HUMAN_MARKER_HEADER: &str = "areyouahuman";

/// Owns the in-memory session and applies the retry policy to every call.
///
/// Calls take `&mut self`, so requests made through one executor are
/// serialized and the token is never replaced while a request is in flight.
pub struct RequestExecutor {
    authenticator: SessionAuthenticator,
    transport: Arc<dyn Transport>,
    config: Config,
    token: Option<String>,
}

impl RequestExecutor {
    pub fn new(
        authenticator: SessionAuthenticator,
        transport: Arc<dyn Transport>,
        config: Config,
    ) -> Self {
        Self {
            authenticator,
            transport,
            config,
            token: None,
        }
    }

    /// Seed the in-memory token, e.g. from an earlier `get_valid_token`.
    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.authenticator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute a request and decode the JSON body into `T`.
    pub async fn execute_as<T: DeserializeOwned>(&mut self, spec: &RequestSpec) -> Result<T, ApiError> {
        let value = self.execute(spec).await?;
        serde_json::from_value(value).map_err(|e| {
            ApiError::InvalidResponse(format!("Unexpected response from {}: {}", spec.path, e))
        })
    }

    /// Execute a request under the retry and re-authentication policy.
    pub async fn execute(&mut self, spec: &RequestSpec) -> Result<Value, ApiError> {
        let token = self.current_token().await?;
        let max_attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.retry_base_delay();

        for attempt in 1..=max_attempts {
            match self.send_once(spec, &token).await {
                Ok(value) => return Ok(value),
                Err(ApiError::Unauthorized) => return self.refresh_and_retry(spec).await,
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    warn!(
                        path = %spec.path,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2; // Exponential backoff
                }
                Err(e) => {
                    error!(path = %spec.path, attempts = attempt, error = %e, "Request failed");
                    return Err(ApiError::RequestFailed {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }

        // Loop always returns on the final attempt
        Err(ApiError::RequestFailed {
            attempts: max_attempts,
            message: "Request was not attempted".to_string(),
        })
    }

    /// Token for the next call, refreshed ahead of time when it is missing
    /// or about to expire.
    async fn current_token(&mut self) -> Result<String, ApiError> {
        if let Some(ref token) = self.token {
            if !token::is_expired(token) {
                return Ok(token.clone());
            }
            debug!("In-memory token expired, refreshing");
        }

        let token = self.authenticator.get_valid_token().await.map_err(|e| match e {
            ApiError::AuthenticationFailed(_) => e,
            other => ApiError::AuthenticationFailed(other.to_string()),
        })?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// One sign-in, one retry. A second failure is final.
    async fn refresh_and_retry(&mut self, spec: &RequestSpec) -> Result<Value, ApiError> {
        info!(path = %spec.path, "API returned 401 - refreshing token");

        let token = match self.authenticator.authenticate().await {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "Failed to refresh token");
                return Err(ApiError::TokenRefreshFailed(e.to_string()));
            }
        };
        self.token = Some(token.clone());

        match self.send_once(spec, &token).await {
            Ok(value) => {
                info!(path = %spec.path, "Retry after token refresh succeeded");
                Ok(value)
            }
            Err(e) => {
                error!(path = %spec.path, error = %e, "Retry after token refresh failed");
                Err(ApiError::TokenRefreshFailed(e.to_string()))
            }
        }
    }

    async fn send_once(&self, spec: &RequestSpec, token: &str) -> Result<Value, ApiError> {
        let request = HttpRequest {
            method: spec.method.clone(),
            url: spec.url(&self.config),
            query: spec.query.clone(),
            headers: self.auth_headers(token)?,
            body: spec.body.clone(),
        };

        let response = self.transport.send(request).await?;
        if response.status.is_success() {
            return response.json();
        }

        let err = ApiError::from_status(response.status, &response.body);
        if response.status.as_u16() == 403 || response.body.to_lowercase().contains("captcha") {
            warn!(
                path = %spec.path,
                status = %response.status,
                "Bot protection challenge detected; the service may be blocking automated clients"
            );
        }
        Err(err)
    }

    fn auth_headers(&self, token: &str) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(token)
                .map_err(|e| ApiError::MalformedToken(format!("not a valid header value: {}", e)))?,
        );
        headers.insert(
            HeaderName::from_static(HUMAN_MARKER_HEADER),
            HeaderValue::from_static("true"),
        );
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::ApiRoot;
    use crate::auth::Credential;
    use crate::test_support::{executor_with, fresh_token, ScriptedTransport, TEST_ADDRESS};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    fn me() -> RequestSpec {
        RequestSpec::get(ApiRoot::Primary, "/me")
    }

    #[tokio::test(start_paused = true)]
    async fn test_attaches_headers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let token = fresh_token();
        let transport = ScriptedTransport::new().respond(StatusCode::OK, r#"{"points":5}"#);
        let mut executor = executor_with(&dir, transport.clone()).with_token(token.clone());

        assert_eq!(executor.execute(&me()).await, Ok(json!({"points": 5})));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://api.test/me");
        let headers = &requests[0].headers;
        assert_eq!(headers.get(header::AUTHORIZATION).map(|v| v.as_bytes()), Some(token.as_bytes()));
        assert_eq!(headers.get("areyouahuman").map(|v| v.as_bytes()), Some(&b"true"[..]));
        assert_eq!(
            headers.get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"application/json"[..])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_back_off_then_succeed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new()
            .fail("connection reset")
            .respond(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
            .respond(StatusCode::OK, r#"{"ok":1}"#);
        let mut executor = executor_with(&dir, transport.clone()).with_token(fresh_token());

        let started = Instant::now();
        assert_eq!(executor.execute(&me()).await, Ok(json!({"ok": 1})));
        // 2000ms after the first failure, 4000ms after the second
        assert_eq!(started.elapsed(), Duration::from_millis(6000));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new()
            .fail("timeout")
            .fail("timeout")
            .respond(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":"Database unavailable"}"#);
        let mut executor = executor_with(&dir, transport.clone()).with_token(fresh_token());

        let started = Instant::now();
        assert_eq!(
            executor.execute(&me()).await,
            Err(ApiError::RequestFailed {
                attempts: 3,
                message: "Database unavailable".to_string()
            })
        );
        assert_eq!(started.elapsed(), Duration::from_millis(6000));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_reauthenticates_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let refreshed = fresh_token();
        let transport = ScriptedTransport::new()
            .respond(StatusCode::UNAUTHORIZED, r#"{"message":"jwt expired"}"#)
            .signin(&refreshed)
            .respond(StatusCode::OK, r#"{"address":"0xabc"}"#);
        let mut executor = executor_with(&dir, transport.clone()).with_token(fresh_token());

        let started = Instant::now();
        assert_eq!(executor.execute(&me()).await, Ok(json!({"address": "0xabc"})));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(transport.signin_count(), 1);
        assert_eq!(executor.token(), Some(refreshed.as_str()));

        let last = transport.requests().pop().expect("retried request");
        assert_eq!(
            last.headers.get(header::AUTHORIZATION).map(|v| v.as_bytes()),
            Some(refreshed.as_bytes())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_unauthorized_gives_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new()
            .respond(StatusCode::UNAUTHORIZED, "")
            .signin(&fresh_token())
            .respond(StatusCode::UNAUTHORIZED, "")
            // Would be consumed by a second sign-in if one happened
            .signin(&fresh_token());
        let mut executor = executor_with(&dir, transport.clone()).with_token(fresh_token());

        let result = executor.execute(&me()).await;
        assert!(matches!(result, Err(ApiError::TokenRefreshFailed(_))));
        assert_eq!(transport.signin_count(), 1);
        assert_eq!(transport.remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reauthentication() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new()
            .respond(StatusCode::UNAUTHORIZED, "")
            .respond(StatusCode::OK, "{}")
            .respond(StatusCode::FORBIDDEN, r#"{"error":"Wallet banned"}"#);
        let mut executor = executor_with(&dir, transport.clone()).with_token(fresh_token());

        assert_eq!(
            executor.execute(&me()).await,
            Err(ApiError::TokenRefreshFailed(
                "Authentication failed: Wallet banned".to_string()
            ))
        );
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_after_transient_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new()
            .fail("reset")
            .respond(StatusCode::UNAUTHORIZED, "")
            .signin(&fresh_token())
            .respond(StatusCode::OK, "[]");
        let mut executor = executor_with(&dir, transport.clone()).with_token(fresh_token());

        let started = Instant::now();
        assert_eq!(executor.execute(&me()).await, Ok(json!([])));
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
        assert_eq!(transport.signin_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_proactive_token_from_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cached = fresh_token();
        let transport = ScriptedTransport::new().respond(StatusCode::OK, "{}");
        let mut executor = executor_with(&dir, transport.clone());
        executor
            .authenticator()
            .store()
            .save(&Credential::new(cached.clone(), TEST_ADDRESS));

        assert!(executor.execute(&me()).await.is_ok());
        assert_eq!(transport.signin_count(), 0);
        assert_eq!(executor.token(), Some(cached.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_proactive_refresh_of_expired_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fresh = fresh_token();
        let transport = ScriptedTransport::new()
            .signin(&fresh)
            .respond(StatusCode::OK, "{}");
        let mut executor = executor_with(&dir, transport.clone())
            .with_token(crate::test_support::token_expiring_at(0));

        assert!(executor.execute(&me()).await.is_ok());
        assert_eq!(transport.signin_count(), 1);
        assert_eq!(executor.token(), Some(fresh.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsendable_token_is_refreshed_not_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fresh = fresh_token();
        let transport = ScriptedTransport::new()
            .signin(&fresh)
            .respond(StatusCode::OK, r#"{"points":1}"#);
        let mut executor =
            executor_with(&dir, transport.clone()).with_token(format!("{}\n", fresh_token()));

        let started = Instant::now();
        assert_eq!(executor.execute(&me()).await, Ok(json!({"points": 1})));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(transport.signin_count(), 1);
        assert_eq!(executor.token(), Some(fresh.as_str()));

        let requests = transport.requests();
        let sent = requests.last().expect("data request");
        assert_eq!(
            sent.headers.get(header::AUTHORIZATION).map(|v| v.as_bytes()),
            Some(fresh.as_bytes())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsendable_cached_token_triggers_sign_in() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fresh = fresh_token();
        let transport = ScriptedTransport::new()
            .signin(&fresh)
            .respond(StatusCode::OK, "{}");
        let mut executor = executor_with(&dir, transport.clone());
        executor
            .authenticator()
            .store()
            .save(&Credential::new(format!("{}\n", fresh_token()), TEST_ADDRESS));

        assert!(executor.execute(&me()).await.is_ok());
        assert_eq!(transport.signin_count(), 1);
        assert_eq!(executor.token(), Some(fresh.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_sign_in_failure_is_not_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new()
            .respond(StatusCode::OK, "{}")
            .respond(StatusCode::OK, "{}");
        let mut executor = executor_with(&dir, transport.clone());

        assert_eq!(
            executor.execute(&me()).await,
            Err(ApiError::AuthenticationFailed("No token in response".to_string()))
        );
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_as_decodes() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Points {
            points: i64,
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let transport = ScriptedTransport::new()
            .respond(StatusCode::OK, r#"{"points":12}"#)
            .respond(StatusCode::OK, r#"{"points":"many"}"#);
        let mut executor = executor_with(&dir, transport).with_token(fresh_token());

        assert_eq!(executor.execute_as::<Points>(&me()).await, Ok(Points { points: 12 }));
        assert!(matches!(
            executor.execute_as::<Points>(&me()).await,
            Err(ApiError::InvalidResponse(_))
        ));
    }
}
