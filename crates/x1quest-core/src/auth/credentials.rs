use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "x1quest";
const KEY_ENTRY: &str = "wallet-private-key";

/// Wallet private key in the OS keychain
pub struct CredentialStore;

impl CredentialStore {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, KEY_ENTRY).context("Failed to open keychain entry")
    }

    /// Save the key, trimmed, replacing any stored one
    pub fn store_key(private_key: &str) -> Result<()> {
        Self::entry()?
            .set_password(private_key.trim())
            .context("Failed to store private key in keychain")
    }

    /// The stored key; errors when none has been saved
    pub fn get_key() -> Result<String> {
        Self::entry()?
            .get_password()
            .context("Failed to retrieve private key from keychain")
    }

    /// Remove the stored key; errors when there is nothing to remove
    pub fn delete_key() -> Result<()> {
        Self::entry()?
            .delete_credential()
            .context("Failed to delete private key from keychain")
    }

    /// Whether a key can be read back from the keychain
    pub fn has_key() -> bool {
        Self::get_key().is_ok()
    }
}
