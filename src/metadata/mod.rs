//! Durable record of contract deployments.
//!
//! # Design Decisions
//! - Append-only: records are written once by the lifecycle manager and
//!   never updated or deleted
//! - `(contract_address, deployment_tx_hash)` is unique
//! - Readiness is checked once at startup; a store that is not ready stops
//!   the process from serving

pub mod file;
pub mod memory;
pub mod record;
pub mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{DeploymentRecord, DeploymentView};
pub use store::{MetadataStore, StoreError};
