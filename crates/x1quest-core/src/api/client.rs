//! Caller-facing client for the X1 testnet quest API.
//!
//! `QuestClient` bundles the request executor (session token, retries,
//! re-authentication) with the read-only chain client. One instance per
//! wallet; calls take `&mut self` and run one at a time.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info};

use super::chain::{Balance, ChainClient};
use super::executor::RequestExecutor;
use super::transport::{ApiRoot, ReqwestTransport, RequestSpec, Transport};
use super::ApiError;
use crate::auth::{SessionAuthenticator, Signer, TokenStore};
use crate::config::Config;
use crate::models::{BatchResult, FaucetClaim, Profile, Quest};
use crate::orchestrator;

pub struct QuestClient {
    executor: RequestExecutor,
    chain: ChainClient,
}

impl QuestClient {
    /// Client over HTTPS with the token file from `config`.
    pub fn new(config: Config, signer: Arc<dyn Signer>) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config)?);
        let store = TokenStore::new(config.tokens_path()?);
        Ok(Self::from_parts(config, signer, store, transport))
    }

    pub fn from_parts(
        config: Config,
        signer: Arc<dyn Signer>,
        store: TokenStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let authenticator =
            SessionAuthenticator::new(signer, store, transport.clone(), config.clone());
        let chain = ChainClient::new(transport.clone(), config.rpc_url.clone());
        Self {
            executor: RequestExecutor::new(authenticator, transport, config),
            chain,
        }
    }

    /// Wallet address requests are made for
    pub fn address(&self) -> String {
        self.executor.authenticator().address()
    }

    pub fn authenticator(&self) -> &SessionAuthenticator {
        self.executor.authenticator()
    }

    // ===== Profile & quests =====

    pub async fn get_profile(&mut self) -> Result<Profile, ApiError> {
        let value = self
            .executor
            .execute(&RequestSpec::get(ApiRoot::Primary, "/me"))
            .await?;
        Profile::from_response(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Unexpected profile: {}", e)))
    }

    pub async fn list_quests(&mut self) -> Result<Vec<Quest>, ApiError> {
        let quests: Vec<Quest> = self
            .executor
            .execute_as(&RequestSpec::get(ApiRoot::Primary, "/quests"))
            .await?;
        debug!(count = quests.len(), "Fetched quests");
        Ok(quests)
    }

    /// Complete one quest; the raw response body is returned as-is.
    pub async fn complete_quest(&mut self, quest_id: &str) -> Result<Value, ApiError> {
        info!(quest_id = quest_id, "Completing quest");
        self.executor
            .execute(&orchestrator::complete_quest_request(quest_id))
            .await
    }

    pub async fn claim_faucet(&mut self) -> Result<FaucetClaim, ApiError> {
        let address = self.address();
        info!(address = %address, "Claiming testnet faucet");
        let spec = RequestSpec::get(ApiRoot::Faucet, "/testnet/faucet").with_query("address", address);
        self.executor.execute_as(&spec).await
    }

    // ===== Batches =====

    pub async fn list_daily_pending(&mut self) -> Result<Vec<Quest>, ApiError> {
        let quests = self.list_quests().await?;
        Ok(orchestrator::list_pending(quests, orchestrator::is_daily_pending))
    }

    pub async fn complete_all_daily(&mut self) -> Result<Vec<BatchResult>, ApiError> {
        let pending = self.list_daily_pending().await?;
        if pending.is_empty() {
            info!("No pending daily quests");
            return Ok(Vec::new());
        }
        Ok(self.run_batch(&pending).await)
    }

    pub async fn list_social_pending(&mut self) -> Result<Vec<Quest>, ApiError> {
        let quests = self.list_quests().await?;
        Ok(orchestrator::list_pending(quests, orchestrator::is_social_pending))
    }

    pub async fn complete_all_social(&mut self) -> Result<Vec<BatchResult>, ApiError> {
        let pending = self.list_social_pending().await?;
        if pending.is_empty() {
            info!("No pending social quests");
            return Ok(Vec::new());
        }
        Ok(self.run_batch(&pending).await)
    }

    async fn run_batch(&mut self, pending: &[Quest]) -> Vec<BatchResult> {
        let pacing = self.executor.config().quest_pacing();
        orchestrator::complete_all(&mut self.executor, pending, pacing).await
    }

    // ===== Chain =====

    /// Native X1T balance of the wallet
    pub async fn get_balance(&self) -> Result<Balance, ApiError> {
        self.chain.get_balance(&self.address()).await
    }
}
