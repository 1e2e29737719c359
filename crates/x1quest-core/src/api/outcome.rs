use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::ApiError;

/// Success-or-error envelope handed to callers outside the library.
///
/// Serializes as `{"ok": true, "data": ...}` or `{"ok": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(String),
}

impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(message) => Some(message),
        }
    }
}

impl<T> From<Result<T, ApiError>> for Outcome<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Outcome::Success(data),
            Err(e) => Outcome::Failure(e.to_string()),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        match self {
            Outcome::Success(data) => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("data", data)?;
            }
            Outcome::Failure(message) => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("error", message)?;
            }
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let outcome: Outcome<Vec<u32>> = Ok(vec![1, 2]).into();
        assert!(outcome.is_ok());
        assert_eq!(
            serde_json::to_value(&outcome).expect("serializes"),
            json!({"ok": true, "data": [1, 2]})
        );
    }

    #[test]
    fn test_failure_envelope() {
        let outcome: Outcome<()> = Err(ApiError::TokenRefreshFailed("bad signature".to_string())).into();
        assert!(!outcome.is_ok());
        assert_eq!(outcome.error(), Some("Token refresh failed: bad signature"));
        assert_eq!(
            serde_json::to_value(&outcome).expect("serializes"),
            json!({"ok": false, "error": "Token refresh failed: bad signature"})
        );
    }
}
