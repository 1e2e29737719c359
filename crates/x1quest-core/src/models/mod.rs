//! Data models for X1 API entities.
//!
//! - `Quest`: quest listing entries with category and periodicity
//! - `Profile`: wallet profile from `/me`
//! - `FaucetClaim`: testnet faucet claim details
//! - `BatchResult`, `BatchSummary`: per-quest outcomes of batch runs

pub mod batch;
pub mod faucet;
pub mod profile;
pub mod quest;

pub use batch::{BatchOutcome, BatchResult, BatchSummary};
pub use faucet::FaucetClaim;
pub use profile::{LinkedAccount, Profile};
pub use quest::{Periodicity, Quest, QuestCategory};
