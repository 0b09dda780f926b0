//! Ledger RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to one JSON-RPC endpoint and validate it eagerly
//! - Query chain state (balances, nonces, gas price, receipts, pool entries)
//! - Submit raw signed transactions
//! - Map every failure to a transport error; never retry internally

use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, PendingTxInfo, TxReceipt,
};
use crate::config::env::obscure_url;
use crate::config::NetworkConfig;
use crate::observability::metrics;

/// Primitive operations against a single ledger endpoint.
///
/// Implementations hold no per-call mutable state, so one client can serve
/// concurrent requests without locking.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Native balance of an address, in wei.
    async fn get_balance(&self, address: Address) -> BlockchainResult<U256>;

    /// Next nonce for an address.
    async fn get_nonce(&self, address: Address) -> BlockchainResult<u64>;

    /// Current gas price, in wei.
    async fn get_gas_price(&self) -> BlockchainResult<u128>;

    /// Submit an EIP-2718 encoded signed transaction.
    async fn submit_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash>;

    /// Receipt for a mined transaction; `None` while it is still pending.
    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<TxReceipt>>;

    /// Transaction as known to the node; `None` if dropped or unknown.
    async fn get_pending_transaction(&self, hash: TxHash)
        -> BlockchainResult<Option<PendingTxInfo>>;

    /// Gas estimate for a transaction request.
    async fn estimate_gas(&self, tx: TransactionRequest) -> BlockchainResult<u64>;

    /// Execute a read-only call. Reverts surface as `ContractLogic`.
    async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes>;
}

/// Creates network clients for configured networks.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self, network: &NetworkConfig) -> BlockchainResult<Arc<dyn NetworkClient>>;
}

/// Alloy-backed JSON-RPC client.
#[derive(Clone)]
pub struct RpcClient {
    provider: Arc<dyn Provider + Send + Sync>,
    url: String,
    chain_id: u64,
    timeout_duration: Duration,
}

impl RpcClient {
    /// Create a client and probe the endpoint.
    ///
    /// Fails with `Connection` if the endpoint does not answer `eth_chainId`,
    /// and with `ChainMismatch` if it answers for a different chain.
    pub async fn connect(network: &NetworkConfig, timeout_duration: Duration) -> BlockchainResult<Self> {
        let display_url = obscure_url(&network.url);
        let url: url::Url = network.url.parse().map_err(|e| BlockchainError::Connection {
            url: display_url.clone(),
            reason: format!("invalid RPC URL: {}", e),
        })?;

        let provider = Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>;
        let client = Self {
            provider,
            url: display_url,
            chain_id: network.chain_id,
            timeout_duration,
        };

        let actual = client
            .get_chain_id()
            .await
            .map_err(|e| BlockchainError::Connection {
                url: client.url.clone(),
                reason: e.to_string(),
            })?;
        if actual.0 != network.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: network.chain_id,
                actual: actual.0,
            });
        }

        tracing::info!(
            rpc_url = %client.url,
            chain_id = client.chain_id,
            "Connected to ledger node"
        );
        Ok(client)
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.timed("get_chain_id", self.provider.get_chain_id())
            .await
            .map(ChainId)
    }

    async fn timed<F, T, E>(&self, operation: &'static str, fut: F) -> BlockchainResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                metrics::record_rpc_error(operation);
                tracing::warn!(rpc_url = %self.url, operation, error = %e, "RPC error");
                Err(BlockchainError::transport(operation, e))
            }
            Err(_) => {
                metrics::record_rpc_error(operation);
                tracing::warn!(rpc_url = %self.url, operation, "RPC timeout");
                Err(BlockchainError::transport(
                    operation,
                    format!("timed out after {}s", self.timeout_duration.as_secs()),
                ))
            }
        }
    }
}

#[async_trait]
impl NetworkClient for RpcClient {
    async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.timed("get_balance", self.provider.get_balance(address)).await
    }

    async fn get_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.timed("get_nonce", self.provider.get_transaction_count(address))
            .await
    }

    async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.timed("get_gas_price", self.provider.get_gas_price()).await
    }

    async fn submit_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let pending = self
            .timed(
                "submit_raw_transaction",
                self.provider.send_raw_transaction(raw.as_ref()),
            )
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<TxReceipt>> {
        let receipt = self
            .timed("get_receipt", self.provider.get_transaction_receipt(hash))
            .await?;
        Ok(receipt.map(|r| TxReceipt {
            transaction_hash: r.transaction_hash,
            contract_address: r.contract_address,
            status: r.status(),
            block_number: r.block_number,
        }))
    }

    async fn get_pending_transaction(
        &self,
        hash: TxHash,
    ) -> BlockchainResult<Option<PendingTxInfo>> {
        let tx = self
            .timed(
                "get_pending_transaction",
                self.provider.get_transaction_by_hash(hash),
            )
            .await?;
        Ok(tx.map(|tx| PendingTxInfo {
            hash,
            nonce: tx.nonce(),
            gas_price: tx.gas_price().unwrap_or_else(|| tx.max_fee_per_gas()),
            block_number: tx.block_number,
        }))
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> BlockchainResult<u64> {
        match timeout(self.timeout_duration, self.provider.estimate_gas(tx)).await {
            Ok(Ok(gas)) => Ok(gas),
            Ok(Err(e)) => Err(classify_call_error("estimate_gas", e)),
            Err(_) => Err(BlockchainError::transport("estimate_gas", "timed out")),
        }
    }

    async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        match timeout(self.timeout_duration, self.provider.call(tx)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(classify_call_error("call", e)),
            Err(_) => Err(BlockchainError::transport("call", "timed out")),
        }
    }
}

/// Distinguish an execution revert from a transport failure.
fn classify_call_error(operation: &'static str, error: impl std::fmt::Display) -> BlockchainError {
    let message = error.to_string();
    if message.to_ascii_lowercase().contains("revert") {
        BlockchainError::ContractLogic(message)
    } else {
        metrics::record_rpc_error(operation);
        BlockchainError::transport(operation, message)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("rpc_url", &self.url)
            .field("chain_id", &self.chain_id)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

/// Factory producing [`RpcClient`]s with a shared timeout.
#[derive(Debug, Clone)]
pub struct RpcClientFactory {
    timeout: Duration,
}

impl RpcClientFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ClientFactory for RpcClientFactory {
    async fn connect(&self, network: &NetworkConfig) -> BlockchainResult<Arc<dyn NetworkClient>> {
        let client = RpcClient::connect(network, self.timeout).await?;
        Ok(Arc::new(client))
    }
}
