//! Sign-in handshake against the X1 API.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::session::{Credential, TokenStore};
use super::signer::Signer;
use super::token;
use crate::api::transport::{join_url, HttpRequest, Transport};
use crate::api::ApiError;
use crate::config::Config;

/// Browser identity the sign-in endpoint's bot filter expects.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("origin", "https://testnet.x1ecochain.com"),
    ("referer", "https://testnet.x1ecochain.com/"),
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36",
    ),
    ("accept", "*/*"),
    ("accept-language", "en-US,en;q=0.9"),
    ("sec-ch-ua", "\"Brave\";v=\"143\", \"Chromium\";v=\"143\", \"Not A(Brand\";v=\"24\""),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "cross-site"),
    ("sec-gpc", "1"),
];

#[derive(Debug, Deserialize)]
struct SigninResponse {
    token: Option<String>,
    user: Option<SigninUser>,
}

#[derive(Debug, Deserialize)]
struct SigninUser {
    address: Option<String>,
}

/// Output of signing the sign-in challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedChallenge {
    pub signature: String,
    pub address: String,
    pub message: String,
}

/// Exchanges wallet signatures for session tokens and keeps the token file
/// current.
#[derive(Clone)]
pub struct SessionAuthenticator {
    signer: Arc<dyn Signer>,
    store: TokenStore,
    transport: Arc<dyn Transport>,
    config: Config,
}

impl SessionAuthenticator {
    pub fn new(
        signer: Arc<dyn Signer>,
        store: TokenStore,
        transport: Arc<dyn Transport>,
        config: Config,
    ) -> Self {
        Self {
            signer,
            store,
            transport,
            config,
        }
    }

    /// Identity tokens must be bound to
    pub fn address(&self) -> String {
        self.signer.address()
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Sign the configured challenge for this wallet.
    pub async fn sign_challenge(&self) -> Result<SignedChallenge, ApiError> {
        let address = self.signer.address();
        let message = self.config.challenge_for(&address);
        debug!(address = %address, message = %message, "Signing sign-in challenge");

        let signature = self.signer.sign_message(&message).await?;
        Ok(SignedChallenge {
            signature,
            address,
            message,
        })
    }

    /// Run the full sign-in handshake and persist the new token.
    pub async fn authenticate(&self) -> Result<String, ApiError> {
        let signed = self
            .sign_challenge()
            .await
            .map_err(|e| ApiError::AuthenticationFailed(e.to_string()))?;

        self.handshake(&signed.address).await;

        info!(address = %signed.address, "Requesting session token");
        let request = HttpRequest {
            method: Method::POST,
            url: self.signin_url(),
            query: Vec::new(),
            headers: browser_headers(true),
            body: Some(json!({ "signature": signed.signature })),
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ApiError::AuthenticationFailed(e.to_string()))?;

        if !response.status.is_success() {
            let message = ApiError::describe_body(&response.body);
            warn!(status = %response.status, error = %message, "Sign-in rejected");
            return Err(ApiError::AuthenticationFailed(message));
        }

        let parsed: SigninResponse = serde_json::from_str(&response.body).map_err(|e| {
            ApiError::AuthenticationFailed(format!("Failed to parse sign-in response: {}", e))
        })?;

        let token = parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::AuthenticationFailed("No token in response".to_string()))?;

        if let Some(api_address) = parsed.user.and_then(|u| u.address) {
            if api_address.eq_ignore_ascii_case(&signed.address) {
                debug!(address = %api_address, "Sign-in address verified");
            } else {
                warn!(
                    signed = %signed.address,
                    returned = %api_address,
                    "Sign-in returned a different address; keeping token"
                );
            }
        }

        self.store.save(&Credential::new(token.clone(), signed.address));
        info!("New session token saved");
        Ok(token)
    }

    /// Return the cached token when it is still usable, otherwise sign in.
    pub async fn get_valid_token(&self) -> Result<String, ApiError> {
        let expected = self.signer.address();

        match self.store.load() {
            Some(credential) if token::is_usable(&credential, &expected) => {
                debug!(age_minutes = credential.age_minutes(), "Using cached token");
                return Ok(credential.token);
            }
            Some(credential) if !credential.identity.eq_ignore_ascii_case(&expected) => {
                info!(
                    cached = %credential.identity,
                    expected = %expected,
                    "Cached token belongs to a different address"
                );
            }
            Some(_) => info!("Cached token expired"),
            None => info!("No cached token"),
        }

        self.authenticate().await
    }

    /// Optional pre-flight `GET /signin`; failures only get logged.
    async fn handshake(&self, address: &str) {
        let request = HttpRequest {
            method: Method::GET,
            url: self.signin_url(),
            query: vec![("address".to_string(), address.to_string())],
            headers: browser_headers(false),
            body: None,
        };

        match self.transport.send(request).await {
            Ok(response) if response.status.is_success() => debug!("Sign-in handshake ok"),
            Ok(response) => warn!(status = %response.status, "Sign-in handshake rejected"),
            Err(e) => warn!(error = %e, "Sign-in handshake failed"),
        }
    }

    fn signin_url(&self) -> String {
        join_url(&self.config.api_base_url, "/signin")
    }
}

fn browser_headers(with_json_body: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &(name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    if with_json_body {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }
    headers
}
