//! In-memory store.
//!
//! Data is lost on restart; used by tests and local experiments.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::record::DeploymentRecord;
use super::store::{MetadataStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Vec<DeploymentRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn insert(&self, record: DeploymentRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.key() == record.key()) {
            return Err(StoreError::Duplicate {
                address: record.contract_address,
                tx_hash: record.deployment_tx_hash,
            });
        }
        records.push(record);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<DeploymentRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn schema_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_record;

    #[tokio::test]
    async fn test_insert_and_list() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.insert(sample_record(1)).await.unwrap();
        store.insert(sample_record(2)).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all, vec![sample_record(1), sample_record(2)]);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let store = MemoryStore::new();
        store.insert(sample_record(1)).await.unwrap();
        let err = store.insert(sample_record(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.len().await, 1);
    }
}
