//! Store interface.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use thiserror::Error;

use super::record::DeploymentRecord;

/// Errors raised by metadata stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Deployment {address} / {tx_hash} is already recorded")]
    Duplicate { address: Address, tx_hash: TxHash },
}

/// Durable deployment log.
///
/// The lifecycle manager is the only writer.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Append one record. Fails with `Duplicate` if its key exists.
    async fn insert(&self, record: DeploymentRecord) -> Result<(), StoreError>;

    /// Every record, in insertion order.
    async fn list_all(&self) -> Result<Vec<DeploymentRecord>, StoreError>;

    /// Whether the backing storage exists and is usable.
    async fn schema_ready(&self) -> bool;
}
