//! Wallet authentication and session management.
//!
//! This module provides:
//! - `Signer` / `WalletSigner`: Ethereum `personal_sign` over the challenge
//! - `SessionAuthenticator`: sign-in handshake and token refresh
//! - `TokenStore`: the cached session token on disk
//! - `CredentialStore`: the wallet key in the OS keychain
//!
//! Tokens are reused until one minute before their `exp` claim.

pub mod authenticator;
pub mod credentials;
pub mod session;
pub mod signer;
pub mod token;

pub use authenticator::{SessionAuthenticator, SignedChallenge};
pub use credentials::CredentialStore;
pub use session::{Credential, TokenStore};
pub use signer::{Signer, WalletSigner};
