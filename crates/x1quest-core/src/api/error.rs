use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("{message}")]
    RequestFailed { attempts: u32, message: String },

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Credential storage error: {0}")]
    Credential(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Fallback when an error payload carries nothing readable
const UNKNOWN_ERROR: &str = "Unknown error occurred";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an error from a non-success HTTP status and its raw body.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            code => ApiError::Remote {
                status: code,
                message: Self::describe_body(body),
            },
        }
    }

    /// Normalize a raw response body into one readable message.
    /// JSON bodies go through `describe_error`; anything else is used verbatim.
    pub fn describe_body(body: &str) -> String {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return UNKNOWN_ERROR.to_string();
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => describe_error(&value),
            Err(_) => Self::truncate_body(trimmed),
        }
    }

    /// True for failures the generic backoff policy should retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ApiError::Unauthorized
                | ApiError::AuthenticationFailed(_)
                | ApiError::TokenRefreshFailed(_)
                | ApiError::InvalidKey(_)
                | ApiError::MalformedToken(_)
        )
    }
}

/// Reduce a remote error payload to a single human-readable message.
///
/// Tried in order: an `errors` list, `message`, `error`, `code`, a JSON dump
/// of the payload, and finally a generic fallback.
pub fn describe_error(payload: &Value) -> String {
    match payload {
        Value::Null => UNKNOWN_ERROR.to_string(),
        Value::String(s) if s.is_empty() => UNKNOWN_ERROR.to_string(),
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            if let Some(Value::Array(errors)) = map.get("errors") {
                let messages: Vec<String> = errors
                    .iter()
                    .map(|e| match e.get("message") {
                        Some(Value::String(m)) => m.clone(),
                        _ => scalar_text(e),
                    })
                    .collect();
                return format!("Multiple errors: {}", messages.join(", "));
            }
            for key in ["message", "error"] {
                if let Some(text) = map.get(key).and_then(non_empty_text) {
                    return text;
                }
            }
            if let Some(code) = map.get("code").and_then(non_empty_text) {
                return format!("Error Code: {}", code);
            }
            payload.to_string()
        }
        other => other.to_string(),
    }
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
