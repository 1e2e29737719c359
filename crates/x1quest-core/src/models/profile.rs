use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::quest::{deserialize_amount, deserialize_null_default, deserialize_optional_count};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedAccount {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Wallet profile from GET /me
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub address: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub points: f64,
    #[serde(default, deserialize_with = "deserialize_optional_count")]
    pub rank: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub linked_accounts: Vec<LinkedAccount>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Profile {
    /// Parse a /me body, which is either the profile itself or wraps it in
    /// a `user` object.
    pub fn from_response(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
                serde_json::from_value(map.remove("user").unwrap_or_default())
            }
            other => serde_json::from_value(other),
        }
    }

    pub fn rank_display(&self) -> String {
        self.rank
            .map(|r| format!("#{}", r))
            .unwrap_or_else(|| "N/A".to_string())
    }
}
