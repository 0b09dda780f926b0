//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All sections derive `Deserialize` and carry defaults so a minimal file only
//! needs `[networks]` and `[accounts]`.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub api_server: ApiServerConfig,

    /// Ledgers the gateway can talk to, keyed by network name.
    pub networks: BTreeMap<String, NetworkConfig>,

    /// Named signing identities, keyed by display name.
    pub accounts: BTreeMap<String, AccountConfig>,

    /// RPC client settings shared by every network.
    pub rpc: RpcConfig,

    /// Confirmation polling and gas escalation policy.
    pub lifecycle: LifecycleConfig,

    /// Deployment metadata persistence.
    pub storage: StorageConfig,

    /// Compiler and artifact locations.
    pub compiler: CompilerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Look up a network by name.
    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.get(name)
    }

    /// Names of all configured networks, sorted.
    pub fn network_names(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }

    /// Names of all configured identities, sorted.
    pub fn account_names(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Upper bound on a single request, in seconds.
    ///
    /// Must exceed the worst-case confirmation wait or deploy responses are
    /// cut off (the deployment itself still runs to completion).
    pub request_timeout_secs: u64,

    /// Maximum accepted upload size for contract sources, in bytes.
    pub max_upload_bytes: usize,

    /// How long in-flight requests may keep running after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl ApiServerConfig {
    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8040,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            request_timeout_secs: 330,
            max_upload_bytes: 1024 * 1024,
            shutdown_grace_secs: 300,
        }
    }
}

/// A single ledger endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,

    /// Chain ID used for EIP-155 replay protection.
    pub chain_id: u64,

    /// Block explorer base URL shown next to deployment records.
    #[serde(default)]
    pub explorer: Option<String>,
}

/// A named signer.
///
/// The private key never leaves this struct except through
/// [`crate::blockchain::identity::SigningIdentity`], and it is not serializable.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Public address as written in the config file.
    #[serde(default)]
    pub address: String,

    /// Hex-encoded signing key, usually a `${VAR}` placeholder in the file.
    #[serde(default = "empty_secret", deserialize_with = "deserialize_secret")]
    pub private_key: SecretString,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// RPC client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Transaction lifecycle policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Delay between receipt polls, in seconds.
    pub poll_interval_secs: u64,

    /// Receipt polls before giving up.
    pub max_attempts: u32,

    /// Check for an underpriced pending transaction every N polls.
    pub stuck_check_every: u32,

    /// Replacement gas price as a percentage of the stuck one (120 = x1.2, the minimum).
    pub gas_bump_percent: u32,

    /// Fixed gas limit for contract creation.
    pub deploy_gas_limit: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_attempts: 50,
            stuck_check_every: 10,
            gas_bump_percent: 120,
            deploy_gas_limit: 1_500_000,
        }
    }
}

/// Deployment record storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the append-only deployment log (JSON lines).
    pub metadata_path: String,

    /// Create the log on startup when it does not exist yet.
    pub create_if_missing: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metadata_path: "data/deployments.jsonl".to_string(),
            create_if_missing: true,
        }
    }
}

/// Compiler and artifact directories.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Path or name of the `solc` executable.
    pub solc_path: String,

    /// Directory holding `<Name>ABI.json` / `<Name>BIN.json` artifacts.
    pub build_dir: String,

    /// Directory where uploaded sources are kept.
    pub uploads_dir: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            solc_path: "solc".to_string(),
            build_dir: "build".to_string(),
            uploads_dir: "uploads".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api_server.port, 8040);
        assert_eq!(config.lifecycle.max_attempts, 50);
        assert_eq!(config.lifecycle.poll_interval_secs, 5);
        assert_eq!(config.lifecycle.stuck_check_every, 10);
        assert_eq!(config.lifecycle.deploy_gas_limit, 1_500_000);
        assert!(config.networks.is_empty());
    }

    #[test]
    fn test_parse_minimal() {
        let config: AppConfig = toml::from_str(
            r#"
            [networks.sepolia]
            name = "sepolia"
            url = "https://sepolia.example/v3/key"
            chain_id = 11155111
            explorer = "https://sepolia.etherscan.io"

            [accounts]
            alice = { address = "0xAlice", private_key = "0xabc" }
            "#,
        )
        .unwrap();

        let sepolia = config.network("sepolia").unwrap();
        assert_eq!(sepolia.chain_id, 11155111);
        assert_eq!(sepolia.explorer.as_deref(), Some("https://sepolia.etherscan.io"));
        assert_eq!(config.accounts["alice"].private_key.expose_secret(), "0xabc");
        assert_eq!(config.account_names(), vec!["alice".to_string()]);
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let config: AppConfig = toml::from_str(
            r#"
            [accounts]
            bob = { address = "0xBob", private_key = "0xdeadbeefcafe" }
            "#,
        )
        .unwrap();
        let debug = format!("{:?}", config.accounts["bob"]);
        assert!(!debug.contains("deadbeefcafe"));
    }
}
