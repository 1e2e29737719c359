//! Core library for the X1 EcoChain testnet quest client.
//!
//! Wallet sign-in, session token caching, resilient API calls and the
//! sequential quest batch runner live here; the `x1quest` binary is a thin
//! shell over `QuestClient`.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use api::{ApiError, Outcome, QuestClient};
pub use config::Config;
