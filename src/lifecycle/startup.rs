//! Startup orchestration.
//!
//! Builds the shared application state from a validated configuration.
//! Any failure here is fatal; the listener is bound only afterwards.

use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{RpcClientFactory, TokioClock};
use crate::compiler::{ArtifactError, ArtifactStore, SolcCompiler};
use crate::config::AppConfig;
use crate::http::AppState;
use crate::lifecycle::InFlight;
use crate::metadata::{FileStore, MetadataStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Metadata store at '{0}' is not ready")]
    StoreNotReady(String),

    #[error("Failed to initialize metadata store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to prepare artifact directories: {0}")]
    Artifacts(#[from] ArtifactError),
}

/// Wire production implementations behind every seam.
pub async fn build_state(config: AppConfig) -> Result<AppState, StartupError> {
    let store = FileStore::new(&config.storage.metadata_path);
    if config.storage.create_if_missing {
        store.initialize().await?;
    }
    if !store.schema_ready().await {
        return Err(StartupError::StoreNotReady(config.storage.metadata_path.clone()));
    }

    let artifacts = ArtifactStore::from_config(&config.compiler);
    artifacts.ensure_dirs().await?;

    tracing::info!(
        metadata_path = %config.storage.metadata_path,
        build_dir = %config.compiler.build_dir,
        solc = %config.compiler.solc_path,
        "Subsystems initialized"
    );

    Ok(AppState {
        clients: Arc::new(RpcClientFactory::new(config.rpc.timeout())),
        store: Arc::new(store) as Arc<dyn MetadataStore>,
        artifacts: Arc::new(artifacts),
        compiler: Arc::new(SolcCompiler::new(&config.compiler.solc_path)),
        clock: Arc::new(TokioClock),
        tasks: InFlight::new(),
        config: Arc::new(config),
    })
}
