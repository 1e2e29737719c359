//! Shared fixtures for unit tests: a fixed wallet, token builders and a
//! transport that replays scripted responses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use reqwest::{Method, StatusCode};

use crate::api::transport::{HttpRequest, HttpResponse, Transport};
use crate::api::{ApiError, RequestExecutor};
use crate::auth::{SessionAuthenticator, TokenStore, WalletSigner};
use crate::config::Config;

pub const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const TEST_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

static TOKEN_SERIAL: AtomicUsize = AtomicUsize::new(0);

/// JWT-shaped token whose `exp` claim is `exp` seconds since the epoch.
/// Every call yields a distinct token.
pub fn token_expiring_at(exp: i64) -> String {
    let serial = TOKEN_SERIAL.fetch_add(1, Ordering::Relaxed);
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{},"jti":{}}}"#, exp, serial));
    format!("{}.{}.signature", header, claims)
}

/// Token valid for the next hour
pub fn fresh_token() -> String {
    token_expiring_at(Utc::now().timestamp() + 3600)
}

pub fn test_config() -> Config {
    Config {
        api_base_url: "http://api.test".to_string(),
        faucet_base_url: "http://faucet.test".to_string(),
        rpc_url: "http://rpc.test/".to_string(),
        ..Config::default()
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<HttpResponse, ApiError>>,
    requests: Vec<HttpRequest>,
}

/// Replays queued responses in order and records every request it sees.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: StatusCode, body: impl Into<String>) -> Self {
        self.push(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Err(ApiError::Network(message.to_string())));
        self
    }

    /// Queue the two responses of a successful sign-in issuing `token`.
    pub fn signin(self, token: &str) -> Self {
        self.respond(StatusCode::OK, "{}")
            .respond(StatusCode::OK, format!(r#"{{"token":"{}"}}"#, token))
    }

    fn push(&self, response: Result<HttpResponse, ApiError>) {
        self.script
            .lock()
            .expect("script lock")
            .responses
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().expect("script lock").requests.clone()
    }

    /// Number of sign-in submissions (`POST /signin`) seen so far
    pub fn signin_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == Method::POST && r.url.ends_with("/signin"))
            .count()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock").responses.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut script = self.script.lock().expect("script lock");
        script.requests.push(request);
        script
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted response".to_string())))
    }
}

pub fn authenticator_with(dir: &tempfile::TempDir, transport: ScriptedTransport) -> SessionAuthenticator {
    let signer = WalletSigner::from_hex(TEST_KEY).expect("test key");
    SessionAuthenticator::new(
        Arc::new(signer),
        TokenStore::new(dir.path().join("tokens.json")),
        Arc::new(transport),
        test_config(),
    )
}

pub fn executor_with(dir: &tempfile::TempDir, transport: ScriptedTransport) -> RequestExecutor {
    executor_with_config(dir, transport, test_config())
}

pub fn executor_with_config(
    dir: &tempfile::TempDir,
    transport: ScriptedTransport,
    config: Config,
) -> RequestExecutor {
    RequestExecutor::new(
        authenticator_with(dir, transport.clone()),
        Arc::new(transport),
        config,
    )
}
