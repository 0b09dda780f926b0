//! Named signing identities.
//!
//! # Security
//! - Keys come only from the resolved configuration, never from requests
//! - Keys are never logged or serialized; diagnostics show the address only
//! - An identity lives for one request and is dropped with it

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::blockchain::client::NetworkClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::env::has_placeholder;
use crate::config::{AccountConfig, NetworkConfig};

/// A named signer bound to one network.
pub struct SigningIdentity {
    name: String,
    address: Address,
    wallet: EthereumWallet,
    chain_id: u64,
    client: Arc<dyn NetworkClient>,
}

impl SigningIdentity {
    /// Resolve `name` from the configured accounts and bind it to `network`.
    ///
    /// # Errors
    /// - `IdentityNotFound` if `name` is not configured
    /// - `InvalidKey` if the key is empty, an unresolved placeholder, or not a
    ///   valid secp256k1 key
    pub fn resolve(
        name: &str,
        accounts: &BTreeMap<String, AccountConfig>,
        network: &NetworkConfig,
        client: Arc<dyn NetworkClient>,
    ) -> BlockchainResult<Self> {
        let account = accounts
            .get(name)
            .ok_or_else(|| BlockchainError::IdentityNotFound(name.to_string()))?;

        let signer = parse_signer(name, account.private_key.expose_secret())?;
        let address = signer.address();

        if let Ok(configured) = account.address.parse::<Address>() {
            if configured != address {
                tracing::warn!(
                    user = %name,
                    configured = %configured,
                    derived = %address,
                    "Configured address does not match signing key; using derived address"
                );
            }
        }

        tracing::debug!(user = %name, address = %address, chain_id = network.chain_id, "Identity resolved");

        Ok(Self {
            name: name.to_string(),
            address,
            wallet: EthereumWallet::from(signer),
            chain_id: network.chain_id,
            client,
        })
    }

    /// Display name from configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address derived from the signing key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Chain ID used for replay protection.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The network client this identity sends through.
    pub fn client(&self) -> &Arc<dyn NetworkClient> {
        &self.client
    }

    pub async fn balance(&self) -> BlockchainResult<U256> {
        self.client.get_balance(self.address).await
    }

    pub async fn nonce(&self) -> BlockchainResult<u64> {
        self.client.get_nonce(self.address).await
    }

    pub async fn gas_price(&self) -> BlockchainResult<u128> {
        self.client.get_gas_price().await
    }

    /// Sign a fully populated transaction request.
    ///
    /// The request must carry nonce, gas limit and gas price; sender and
    /// chain ID are filled in here. Returns the EIP-2718 encoding.
    pub async fn sign(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        let tx = tx.with_from(self.address).with_chain_id(self.chain_id);
        let nonce = tx.nonce;
        let gas_price = tx.gas_price;

        let envelope = <TransactionRequest as TransactionBuilder<Ethereum>>::build(tx, &self.wallet)
            .await
            .map_err(|e| BlockchainError::Signing(e.to_string()))?;

        tracing::info!(
            user = %self.name,
            nonce = ?nonce,
            gas_price = ?gas_price,
            "Transaction signed"
        );
        Ok(Bytes::from(envelope.encoded_2718()))
    }

    /// Submit signed bytes through the bound client.
    pub async fn send(&self, signed: Bytes) -> BlockchainResult<TxHash> {
        let hash = self.client.submit_raw_transaction(signed).await?;
        tracing::info!(user = %self.name, tx_hash = %hash, "Transaction sent");
        Ok(hash)
    }
}

fn parse_signer(user: &str, key: &str) -> BlockchainResult<PrivateKeySigner> {
    let invalid = |reason: &str| BlockchainError::InvalidKey {
        user: user.to_string(),
        reason: reason.to_string(),
    };

    if key.trim().is_empty() {
        return Err(invalid("private key is missing"));
    }
    if has_placeholder(key) {
        return Err(invalid("private key placeholder was not resolved from the environment"));
    }

    let key_hex = key.trim().strip_prefix("0x").unwrap_or(key.trim());
    key_hex
        .parse::<PrivateKeySigner>()
        .map_err(|_| invalid("private key is not a valid hex-encoded secp256k1 key"))
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
