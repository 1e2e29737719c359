//! HTTP client layer for the X1 testnet services.
//!
//! `QuestClient` is the entry point. It drives a `RequestExecutor`, which
//! owns the session token and applies the retry and re-authentication
//! policy, over a pluggable `Transport`.
//!
//! The API authenticates with a raw session token in the `Authorization`
//! header, obtained by signing a challenge with the wallet key.

pub mod chain;
pub mod client;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod transport;

pub use chain::{Balance, ChainClient};
pub use client::QuestClient;
pub use error::{describe_error, ApiError};
pub use executor::RequestExecutor;
pub use outcome::Outcome;
pub use transport::{ApiRoot, ReqwestTransport, RequestSpec, Transport};
