use serde::{Deserialize, Serialize};

use super::quest::deserialize_string_or_number;

/// Result of GET /testnet/faucet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaucetClaim {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub amount: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub next_claim: Option<String>,
}

fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Amount(#[serde(deserialize_with = "deserialize_string_or_number")] String);

    Ok(Option::<Amount>::deserialize(deserializer)?.map(|a| a.0))
}
