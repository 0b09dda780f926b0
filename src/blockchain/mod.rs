//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! AppConfig (networks, accounts)
//!     → client.rs (one RPC endpoint, timeouts, liveness probe)
//!     → identity.rs (named signer bound to a network)
//!     → contract.rs (interface descriptor + bytecode or address)
//!     → lifecycle.rs (build, sign, submit, confirm, resubmit, record)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from the resolved configuration
//! - Never log private keys; masked forms only
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contract;
pub mod identity;
pub mod lifecycle;
pub mod types;

pub use client::{ClientFactory, NetworkClient, RpcClient, RpcClientFactory};
pub use contract::{ContractArtifact, ContractHandle};
pub use identity::SigningIdentity;
pub use lifecycle::{Clock, LifecycleError, LifecycleSettings, TokioClock, TransactionManager};
pub use types::{BlockchainError, BlockchainResult, ChainId, TxReceipt, TxState};
