//! Chain-specific types and error definitions.

use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// The requested network is not configured.
    #[error("Invalid network: {0}")]
    NetworkNotFound(String),

    /// The requested identity is not configured.
    #[error("User '{0}' not found in the configuration")]
    IdentityNotFound(String),

    /// The identity's secret is missing, unresolved or malformed.
    #[error("Invalid key for user '{user}': {reason}")]
    InvalidKey { user: String, reason: String },

    /// The endpoint did not answer the liveness probe.
    #[error("Failed to connect to node at {url}: {reason}")]
    Connection { url: String, reason: String },

    /// A remote call failed (unreachable, timed out, malformed response).
    #[error("RPC error during {operation}: {reason}")]
    Transport { operation: &'static str, reason: String },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Balance does not cover gas limit times gas price.
    #[error("Insufficient funds: required {required} wei, available {available} wei")]
    InsufficientFunds { required: U256, available: U256 },

    /// A contract call reverted.
    #[error("Contract logic error: {0}")]
    ContractLogic(String),

    /// Arguments or return data did not match the interface descriptor.
    #[error("ABI error: {0}")]
    Abi(String),

    /// Malformed caller input (addresses, hashes).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Building or signing a transaction failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// A mined transaction reported failure.
    #[error("Transaction {tx_hash} reverted: {reason}")]
    Reverted { tx_hash: TxHash, reason: String },

    /// Transaction was not confirmed within the polling budget.
    #[error("Transaction {tx_hash} not confirmed after {attempts} attempts")]
    Timeout { tx_hash: TxHash, attempts: u32 },
}

impl BlockchainError {
    /// Build a transport error from any displayable cause.
    pub fn transport(operation: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// The subset of a transaction receipt the gateway acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    /// Set for contract-creation transactions.
    pub contract_address: Option<Address>,
    /// `true` if execution succeeded.
    pub status: bool,
    pub block_number: Option<u64>,
}

/// A transaction as seen in the node's pool (or chain), as far as the
/// stuck check needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTxInfo {
    pub hash: TxHash,
    pub nonce: u64,
    /// Legacy gas price, or the fee cap for dynamic-fee transactions.
    pub gas_price: u128,
    pub block_number: Option<u64>,
}

/// A submitted transaction awaiting confirmation.
///
/// Lives only inside one confirmation loop; never persisted.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub nonce: u64,
    pub gas_price: u128,
    pub submitted_at: DateTime<Utc>,
    /// Receipt polls made so far across all resubmissions.
    pub attempts: u32,
    /// Replacement submissions made so far.
    pub resubmissions: u32,
}

/// Transaction lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Built,
    Signed,
    Submitted,
    Stuck,
    Resubmitted,
    Confirmed,
    TimedOut,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TxState::Built => "built",
            TxState::Signed => "signed",
            TxState::Submitted => "submitted",
            TxState::Stuck => "stuck",
            TxState::Resubmitted => "resubmitted",
            TxState::Confirmed => "confirmed",
            TxState::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_conversion() {
        let chain_id = ChainId::from(1u64);
        assert_eq!(chain_id.0, 1);
        assert_eq!(u64::from(chain_id), 1);
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::transport("get_balance", "connection refused");
        assert_eq!(err.to_string(), "RPC error during get_balance: connection refused");

        let err = BlockchainError::InsufficientFunds {
            required: U256::from(600),
            available: U256::from(500),
        };
        assert!(err.to_string().contains("600"));

        let err = BlockchainError::Timeout {
            tx_hash: TxHash::ZERO,
            attempts: 50,
        };
        assert!(err.to_string().contains("50 attempts"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TxState::TimedOut.to_string(), "timed_out");
        assert_eq!(TxState::Resubmitted.to_string(), "resubmitted");
    }
}
