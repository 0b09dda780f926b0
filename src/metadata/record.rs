//! Deployment record types.

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub contract_address: Address,
    pub deployer_name: String,
    pub deployer_address: Address,
    pub network: String,
    pub deployment_tx_hash: TxHash,
    /// UTC, serialized as RFC 3339.
    pub deployment_timestamp: DateTime<Utc>,
}

impl DeploymentRecord {
    /// The uniqueness key.
    pub fn key(&self) -> (Address, TxHash) {
        (self.contract_address, self.deployment_tx_hash)
    }
}

/// A record as returned by the listing endpoint, with the network's
/// block explorer attached when one is configured.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentView {
    #[serde(flatten)]
    pub record: DeploymentRecord,
    pub explorer_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DeploymentRecord {
        DeploymentRecord {
            contract_name: "Inbox".to_string(),
            contract_address: Address::repeat_byte(0xab),
            deployer_name: "alice".to_string(),
            deployer_address: Address::repeat_byte(0x01),
            network: "sepolia".to_string(),
            deployment_tx_hash: TxHash::repeat_byte(0x22),
            deployment_timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["contract_name"], "Inbox");
        assert_eq!(json["network"], "sepolia");
        assert_eq!(json["deployment_timestamp"], "2024-05-01T12:00:00Z");
        assert!(json["deployment_tx_hash"].as_str().unwrap().starts_with("0x2222"));

        let back: DeploymentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_view_flattens_record() {
        let view = DeploymentView {
            record: sample(),
            explorer_url: Some("https://sepolia.etherscan.io".to_string()),
        };
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["contract_name"], "Inbox");
        assert_eq!(json["explorer_url"], "https://sepolia.etherscan.io");
    }
}
