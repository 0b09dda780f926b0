//! Transaction lifecycle manager.
//!
//! # Responsibilities
//! - Build a transaction with a fresh gas price and check the sender can pay
//! - Sign and submit through the identity
//! - Poll for a receipt, replacing underpriced transactions on the way
//! - Persist a deployment record once a deployed address is observed
//!
//! # State machine
//! ```text
//! Built → Signed → Submitted ─┬─ receipt ───────────────→ Confirmed
//!                      ▲      ├─ gas below network ─→ Stuck → Resubmitted ┐
//!                      │      └─ budget exhausted ──────────→ TimedOut     │
//!                      └──────────────────────────────────────────────────┘
//! ```
//!
//! # Design Decisions
//! - Clock and network are injected, so stuck/timeout paths run without
//!   wall-clock delay in tests
//! - Resubmission is the only silent retry; it keeps the nonce, so at most
//!   one of the competing transactions can be mined
//! - A store failure after confirmation is reported with the address and
//!   hash; the on-chain state is not rolled back

use alloy::network::TransactionBuilder;
use alloy::primitives::{TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::contract::ContractHandle;
use crate::blockchain::identity::SigningIdentity;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, PendingTransaction, TxReceipt, TxState,
};
use crate::config::validation::MIN_GAS_BUMP_PERCENT;
use crate::config::LifecycleConfig;
use crate::metadata::{DeploymentRecord, MetadataStore, StoreError};
use crate::observability::metrics;

/// Time source for the confirmation loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polling and gas policy.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    /// Run the stuck check on every n-th poll.
    pub stuck_check_every: u32,
    /// Replacement gas price as a percentage of the stuck one.
    pub gas_bump_percent: u32,
    pub deploy_gas_limit: u64,
}

impl From<&LifecycleConfig> for LifecycleSettings {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_attempts: config.max_attempts,
            stuck_check_every: config.stuck_check_every,
            gas_bump_percent: config.gas_bump_percent.max(MIN_GAS_BUMP_PERCENT),
            deploy_gas_limit: config.deploy_gas_limit,
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from(&LifecycleConfig::default())
    }
}

/// Errors from a full lifecycle run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Chain(#[from] BlockchainError),

    /// Confirmed on-chain, but the record could not be written.
    #[error("Contract deployed at {contract_address} (tx {tx_hash}) but the record could not be stored: {source}")]
    Persistence {
        contract_address: String,
        tx_hash: TxHash,
        #[source]
        source: StoreError,
    },
}

/// How the gas limit is chosen at build time.
#[derive(Debug, Clone, Copy)]
enum GasLimit {
    Fixed(u64),
    Estimate,
}

/// Drives transactions of one identity to confirmation.
pub struct TransactionManager {
    identity: SigningIdentity,
    settings: LifecycleSettings,
    clock: Arc<dyn Clock>,
}

impl TransactionManager {
    pub fn new(identity: SigningIdentity, settings: LifecycleSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity,
            settings,
            clock,
        }
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    /// Deploy a contract and record it.
    ///
    /// No record is written unless a receipt with a deployed address was
    /// observed.
    pub async fn deploy(
        &self,
        handle: &ContractHandle,
        contract_name: &str,
        args: &[Value],
        network: &str,
        store: &dyn MetadataStore,
    ) -> Result<DeploymentRecord, LifecycleError> {
        tracing::info!(
            contract = %contract_name,
            user = %self.identity.name(),
            address = %self.identity.address(),
            network = %network,
            "Deploying contract"
        );

        let request = handle.build_constructor_transaction(args)?;
        let receipt = match self
            .execute(request, GasLimit::Fixed(self.settings.deploy_gas_limit))
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                metrics::record_deployment(network, "failed");
                return Err(e.into());
            }
        };

        let Some(contract_address) = receipt.contract_address else {
            metrics::record_deployment(network, "failed");
            return Err(BlockchainError::Reverted {
                tx_hash: receipt.transaction_hash,
                reason: "receipt carries no contract address".to_string(),
            }
            .into());
        };

        let record = DeploymentRecord {
            contract_name: contract_name.to_string(),
            contract_address,
            deployer_name: self.identity.name().to_string(),
            deployer_address: self.identity.address(),
            network: network.to_string(),
            deployment_tx_hash: receipt.transaction_hash,
            deployment_timestamp: self.clock.now(),
        };

        if let Err(source) = store.insert(record.clone()).await {
            tracing::error!(
                contract = %contract_name,
                address = %contract_address,
                tx_hash = %receipt.transaction_hash,
                error = %source,
                "Deployment confirmed but not recorded; manual reconciliation required"
            );
            metrics::record_deployment(network, "unrecorded");
            return Err(LifecycleError::Persistence {
                contract_address: contract_address.to_checksum(None),
                tx_hash: receipt.transaction_hash,
                source,
            });
        }

        metrics::record_deployment(network, "success");
        tracing::info!(
            contract = %contract_name,
            address = %contract_address,
            tx_hash = %receipt.transaction_hash,
            "Contract deployed"
        );
        Ok(record)
    }

    /// Call a state-changing function and wait for it to be mined.
    pub async fn transact(
        &self,
        handle: &ContractHandle,
        function: &str,
        args: &[Value],
    ) -> Result<TxReceipt, LifecycleError> {
        let request = handle.build_call_transaction(function, args)?;
        Ok(self.execute(request, GasLimit::Estimate).await?)
    }

    async fn execute(&self, request: TransactionRequest, gas_limit: GasLimit) -> BlockchainResult<TxReceipt> {
        let gas_price = self.identity.gas_price().await?;
        let nonce = self.identity.nonce().await?;
        let request = request
            .with_from(self.identity.address())
            .with_nonce(nonce)
            .with_gas_price(gas_price);

        let gas_limit = match gas_limit {
            GasLimit::Fixed(limit) => limit,
            GasLimit::Estimate => self.identity.client().estimate_gas(request.clone()).await?,
        };
        let request = request.with_gas_limit(gas_limit);

        self.ensure_funds(gas_limit, gas_price).await?;
        self.transition(TxState::Built, None);

        let raw = self.identity.sign(request.clone()).await?;
        self.transition(TxState::Signed, None);

        let hash = self.identity.send(raw).await?;
        self.transition(TxState::Submitted, Some(hash));

        let pending = PendingTransaction {
            hash,
            nonce,
            gas_price,
            submitted_at: self.clock.now(),
            attempts: 0,
            resubmissions: 0,
        };
        self.confirm(request, pending).await
    }

    async fn ensure_funds(&self, gas_limit: u64, gas_price: u128) -> BlockchainResult<()> {
        let required = U256::from(gas_limit).saturating_mul(U256::from(gas_price));
        let available = self.identity.balance().await?;
        if available < required {
            tracing::warn!(
                user = %self.identity.name(),
                required = %required,
                available = %available,
                "Insufficient funds for gas"
            );
            return Err(BlockchainError::InsufficientFunds { required, available });
        }
        Ok(())
    }

    /// Poll until a receipt appears or the attempt budget runs out.
    async fn confirm(
        &self,
        request: TransactionRequest,
        mut pending: PendingTransaction,
    ) -> BlockchainResult<TxReceipt> {
        let client = self.identity.client();

        while pending.attempts < self.settings.max_attempts {
            pending.attempts += 1;

            match client.get_receipt(pending.hash).await {
                Ok(Some(receipt)) if receipt.status => {
                    self.transition(TxState::Confirmed, Some(receipt.transaction_hash));
                    tracing::info!(
                        tx_hash = %receipt.transaction_hash,
                        block = ?receipt.block_number,
                        attempts = pending.attempts,
                        resubmissions = pending.resubmissions,
                        "Transaction confirmed"
                    );
                    return Ok(receipt);
                }
                Ok(Some(receipt)) => {
                    return Err(BlockchainError::Reverted {
                        tx_hash: receipt.transaction_hash,
                        reason: "execution failed".to_string(),
                    });
                }
                Ok(None) => {
                    tracing::debug!(
                        tx_hash = %pending.hash,
                        attempt = pending.attempts,
                        max_attempts = self.settings.max_attempts,
                        "Waiting for confirmation"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        tx_hash = %pending.hash,
                        attempt = pending.attempts,
                        error = %e,
                        "Receipt lookup failed; treating as not yet mined"
                    );
                }
            }

            if pending.attempts >= self.settings.max_attempts {
                break;
            }

            if self.settings.stuck_check_every > 0
                && pending.attempts % self.settings.stuck_check_every == 0
            {
                if let Err(e) = self.replace_if_stuck(&request, &mut pending).await {
                    tracing::warn!(tx_hash = %pending.hash, error = %e, "Stuck check failed");
                }
            }

            self.clock.sleep(self.settings.poll_interval).await;
        }

        self.transition(TxState::TimedOut, Some(pending.hash));
        metrics::record_timeout();
        let elapsed = self.clock.now() - pending.submitted_at;
        tracing::error!(
            tx_hash = %pending.hash,
            attempts = pending.attempts,
            elapsed_secs = elapsed.num_seconds(),
            "Transaction not confirmed"
        );
        Err(BlockchainError::Timeout {
            tx_hash: pending.hash,
            attempts: pending.attempts,
        })
    }

    /// Resubmit with the same nonce if the pending gas price has fallen
    /// below the network price.
    async fn replace_if_stuck(
        &self,
        request: &TransactionRequest,
        pending: &mut PendingTransaction,
    ) -> BlockchainResult<()> {
        let client = self.identity.client();

        let tx_price = match client.get_pending_transaction(pending.hash).await? {
            Some(info) if info.block_number.is_some() => return Ok(()),
            Some(info) => info.gas_price,
            None => pending.gas_price,
        };
        let network_price = client.get_gas_price().await?;
        if tx_price >= network_price {
            return Ok(());
        }

        self.transition(TxState::Stuck, Some(pending.hash));
        let new_price = bump_gas_price(tx_price, self.settings.gas_bump_percent).max(network_price);

        let raw = self
            .identity
            .sign(request.clone().with_nonce(pending.nonce).with_gas_price(new_price))
            .await?;
        let new_hash = self.identity.send(raw).await?;

        tracing::warn!(
            old_hash = %pending.hash,
            new_hash = %new_hash,
            nonce = pending.nonce,
            old_gas_price = tx_price,
            new_gas_price = new_price,
            network_gas_price = network_price,
            "Resubmitted stuck transaction"
        );
        metrics::record_resubmission();

        pending.hash = new_hash;
        pending.gas_price = new_price;
        pending.submitted_at = self.clock.now();
        pending.resubmissions += 1;
        self.transition(TxState::Resubmitted, Some(new_hash));
        self.transition(TxState::Submitted, Some(new_hash));
        Ok(())
    }

    fn transition(&self, state: TxState, tx_hash: Option<TxHash>) {
        match tx_hash {
            Some(hash) => tracing::debug!(user = %self.identity.name(), tx_hash = %hash, state = %state, "Transaction state"),
            None => tracing::debug!(user = %self.identity.name(), state = %state, "Transaction state"),
        }
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("identity", &self.identity)
            .field("settings", &self.settings)
            .finish()
    }
}

/// `ceil(price × percent / 100)`.
pub fn bump_gas_price(price: u128, percent: u32) -> u128 {
    price.saturating_mul(percent as u128).saturating_add(99) / 100
}
