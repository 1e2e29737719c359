//! Wallet message signing.
//!
//! `Signer` is the seam the authenticator signs through; `WalletSigner` is
//! the local-key implementation producing Ethereum `personal_sign`
//! signatures, which is what the X1 sign-in endpoint verifies.

use async_trait::async_trait;
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::api::ApiError;

/// Something that owns a wallet identity and can sign text messages with it.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Checksummed `0x` address of the signing key
    fn address(&self) -> String;

    /// Sign `message` and return the `0x`-prefixed 65-byte signature
    async fn sign_message(&self, message: &str) -> Result<String, ApiError>;
}

pub struct WalletSigner {
    key: SigningKey,
    address: String,
}

impl WalletSigner {
    /// Build a signer from a hex private key, with or without `0x`.
    pub fn from_hex(private_key: &str) -> Result<Self, ApiError> {
        let trimmed = private_key.trim();
        let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let raw = hex::decode(hex_key).map_err(|e| ApiError::InvalidKey(e.to_string()))?;
        let key = SigningKey::from_slice(&raw).map_err(|e| ApiError::InvalidKey(e.to_string()))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    /// EIP-191 digest of a text message
    fn message_digest(message: &str) -> Keccak256 {
        let mut digest = Keccak256::new();
        digest.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
        digest.update(message.as_bytes());
        digest
    }
}

impl std::fmt::Debug for WalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for WalletSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign_message(&self, message: &str) -> Result<String, ApiError> {
        let (signature, recovery_id) = self
            .key
            .sign_digest_recoverable(Self::message_digest(message))
            .map_err(|e| ApiError::InvalidKey(e.to_string()))?;

        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(27 + recovery_id.to_byte());
        Ok(format!("0x{}", hex::encode(bytes)))
    }
}

/// Derive the checksummed address of a public key.
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.as_affine().to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    to_checksum_address(&hex::encode(&hash[12..]))
}

/// EIP-55 mixed-case checksum encoding of a 40-char hex address.
pub fn to_checksum_address(address: &str) -> String {
    let lower = address.trim_start_matches("0x").to_ascii_lowercase();
    let hash = hex::encode(Keccak256::digest(lower.as_bytes()));

    let checksummed: String = lower
        .chars()
        .zip(hash.chars())
        .map(|(c, h)| {
            if c.is_ascii_alphabetic() && h.to_digit(16).unwrap_or(0) >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();
    format!("0x{}", checksummed)
}
