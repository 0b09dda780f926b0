//! JSON-lines file store.
//!
//! One record per line, appended and synced under a mutex. Duplicate
//! detection reads the file back before each append, which is fine for
//! the volumes a deployment log sees.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::record::DeploymentRecord;
use super::store::{MetadataStore, StoreError};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log file (and parent directories) if it does not exist.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        tracing::info!(path = %self.path.display(), "Metadata store initialized");
        Ok(())
    }

    async fn read_records(&self) -> Result<Vec<DeploymentRecord>, StoreError> {
        let content = fs::read_to_string(&self.path).await?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl MetadataStore for FileStore {
    async fn insert(&self, record: DeploymentRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let existing = self.read_records().await?;
        if existing.iter().any(|r| r.key() == record.key()) {
            return Err(StoreError::Duplicate {
                address: record.contract_address,
                tx_hash: record.deployment_tx_hash,
            });
        }

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;

        tracing::info!(
            contract = %record.contract_name,
            address = %record.contract_address,
            tx_hash = %record.deployment_tx_hash,
            network = %record.network,
            "Deployment recorded"
        );
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<DeploymentRecord>, StoreError> {
        self.read_records().await
    }

    async fn schema_ready(&self) -> bool {
        match fs::metadata(&self.path).await {
            Ok(meta) => meta.is_file(),
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Metadata store not available");
                false
            }
        }
    }
}
