//! Error responses.
//!
//! Every failure leaves the API as `{"detail": "..."}` with a status code
//! chosen by error kind:
//!
//! | kind                                   | status |
//! |----------------------------------------|--------|
//! | configuration / identity / bad input   | 400    |
//! | missing compiled artifact              | 404    |
//! | insufficient funds                     | 402    |
//! | contract logic (revert)                | 422    |
//! | connection / transport                 | 502    |
//! | confirmation timeout                   | 504    |
//! | persistence and everything else        | 500    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::blockchain::{BlockchainError, LifecycleError};
use crate::compiler::ArtifactError;
use crate::metadata::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.detail)
    }
}

impl From<BlockchainError> for ApiError {
    fn from(err: BlockchainError) -> Self {
        let status = match &err {
            BlockchainError::NetworkNotFound(_)
            | BlockchainError::IdentityNotFound(_)
            | BlockchainError::InvalidKey { .. }
            | BlockchainError::ChainMismatch { .. }
            | BlockchainError::Abi(_)
            | BlockchainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BlockchainError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            BlockchainError::ContractLogic(_) | BlockchainError::Reverted { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BlockchainError::Connection { .. } | BlockchainError::Transport { .. } => {
                StatusCode::BAD_GATEWAY
            }
            BlockchainError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            BlockchainError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Chain(e) => e.into(),
            persistence @ LifecycleError::Persistence { .. } => Self::internal(persistence.to_string()),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        let status = match &err {
            ArtifactError::NotFound(_) => StatusCode::NOT_FOUND,
            ArtifactError::InvalidName(_) => StatusCode::BAD_REQUEST,
            ArtifactError::Malformed { .. } | ArtifactError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), detail = %self.detail, "Request failed");
        } else {
            tracing::warn!(status = self.status.as_u16(), detail = %self.detail, "Request rejected");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{TxHash, U256};

    #[test]
    fn test_blockchain_error_status() {
        let cases = [
            (BlockchainError::NetworkNotFound("x".into()), 400),
            (BlockchainError::IdentityNotFound("x".into()), 400),
            (
                BlockchainError::InsufficientFunds {
                    required: U256::from(2),
                    available: U256::from(1),
                },
                402,
            ),
            (BlockchainError::ContractLogic("revert".into()), 422),
            (BlockchainError::transport("get_receipt", "refused"), 502),
            (
                BlockchainError::Timeout {
                    tx_hash: TxHash::ZERO,
                    attempts: 50,
                },
                504,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status.as_u16(), status);
        }
    }

    #[test]
    fn test_persistence_is_500_with_address() {
        let err = LifecycleError::Persistence {
            contract_address: "0xAbC0000000000000000000000000000000000001".to_string(),
            tx_hash: TxHash::repeat_byte(0x11),
            source: StoreError::Io(std::io::Error::other("disk full")),
        };
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.detail.contains("0xAbC0000000000000000000000000000000000001"));
        assert!(api.detail.contains("0x1111"));
    }

    #[test]
    fn test_missing_artifact_is_404() {
        let api = ApiError::from(ArtifactError::NotFound("Lottery".into()));
        assert_eq!(api.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_shape() {
        let response = ApiError::bad_request("Invalid network: mars").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"detail": "Invalid network: mars"}));
    }
}
