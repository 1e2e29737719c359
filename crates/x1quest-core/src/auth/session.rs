use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// A session token together with the wallet it was issued for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "x1_auth_token")]
    pub token: String,
    #[serde(rename = "wallet_address")]
    pub identity: String,
    #[serde(rename = "generated_at")]
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            identity: identity.into(),
            issued_at: Utc::now(),
        }
    }

    /// Age of the credential in whole minutes (for display)
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.issued_at).num_minutes().max(0)
    }
}

/// Persists the single cached credential as JSON.
///
/// Both directions fail soft: a missing or corrupt file reads as "no
/// credential" and a failed write only costs a sign-in on the next run.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached credential, if any
    pub fn load(&self) -> Option<Credential> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No token file");
            return None;
        }
        match self.read() {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token file");
                None
            }
        }
    }

    /// Replace the cached credential
    pub fn save(&self, credential: &Credential) {
        if let Err(e) = self.write(credential) {
            warn!(path = %self.path.display(), error = %e, "Failed to save token file");
        }
    }

    /// Remove the cached credential
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }

    fn read(&self) -> Result<Credential> {
        let contents = std::fs::read_to_string(&self.path).context("Failed to read token file")?;
        serde_json::from_str(&contents).context("Failed to parse token file")
    }

    fn write(&self, credential: &Credential) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;
        let contents = serde_json::to_string_pretty(credential)?;

        // Unique temp file beside the target, then swap it in whole
        let mut tmp = NamedTempFile::new_in(parent).context("Failed to create temp token file")?;
        tmp.write_all(contents.as_bytes())
            .context("Failed to write temp token file")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .context("Failed to replace token file")?;
        debug!(path = %self.path.display(), identity = %credential.identity, "Token file saved");
        Ok(())
    }
}
