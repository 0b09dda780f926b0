//! Test doubles shared by the unit test modules.
//!
//! `ScriptedClient` plays a ledger node whose answers are fixed up front and
//! which records every call; `ManualClock` advances only when slept on.

#![cfg(test)]

use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{keccak256, Address, Bytes, TxHash, TxKind, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::blockchain::client::NetworkClient;
use crate::blockchain::lifecycle::Clock;
use crate::blockchain::types::{BlockchainError, BlockchainResult, PendingTxInfo, TxReceipt};
use crate::config::{AccountConfig, NetworkConfig};
use crate::metadata::{DeploymentRecord, MetadataStore, StoreError};

/// Anvil's first well-known dev account.
pub const ANVIL_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const ANVIL_ADDRESS_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const ANVIL_KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const ANVIL_ADDRESS_1: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

const INBOX_ABI: &str = r#"[
  {"type":"constructor","stateMutability":"nonpayable","inputs":[{"name":"initialMessage","type":"string","internalType":"string"}]},
  {"type":"function","name":"message","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string","internalType":"string"}]},
  {"type":"function","name":"counter","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}]},
  {"type":"function","name":"setMessage","stateMutability":"nonpayable","inputs":[{"name":"newMessage","type":"string","internalType":"string"}],"outputs":[]},
  {"type":"function","name":"doMath","stateMutability":"pure","inputs":[{"name":"a","type":"int256","internalType":"int256"},{"name":"b","type":"int256","internalType":"int256"}],"outputs":[{"name":"sum","type":"int256","internalType":"int256"},{"name":"diff","type":"int256","internalType":"int256"},{"name":"product","type":"int256","internalType":"int256"},{"name":"is_zero","type":"bool","internalType":"bool"}]}
]"#;

pub fn inbox_abi() -> JsonAbi {
    serde_json::from_str(INBOX_ABI).unwrap()
}

pub fn inbox_abi_json() -> &'static str {
    INBOX_ABI
}

pub fn test_network() -> NetworkConfig {
    NetworkConfig {
        url: "http://127.0.0.1:8545".to_string(),
        chain_id: 11155111,
        explorer: Some("https://sepolia.etherscan.io".to_string()),
    }
}

pub fn test_accounts() -> BTreeMap<String, AccountConfig> {
    let mut accounts = BTreeMap::new();
    for (name, address, key) in [
        ("alice", ANVIL_ADDRESS_0, ANVIL_KEY_0),
        ("bob", ANVIL_ADDRESS_1, ANVIL_KEY_1),
    ] {
        accounts.insert(
            name.to_string(),
            AccountConfig {
                address: address.to_string(),
                private_key: SecretString::from(key.to_string()),
            },
        );
    }
    accounts
}

pub fn sample_record(n: u8) -> DeploymentRecord {
    DeploymentRecord {
        contract_name: format!("Contract{}", n),
        contract_address: Address::repeat_byte(n),
        deployer_name: "alice".to_string(),
        deployer_address: ANVIL_ADDRESS_0.parse().unwrap(),
        network: "sepolia".to_string(),
        deployment_tx_hash: TxHash::repeat_byte(n),
        deployment_timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, n as u32).unwrap(),
    }
}

/// A raw transaction as seen by the stub, decoded where possible.
#[derive(Debug, Clone)]
pub struct Submission {
    pub hash: TxHash,
    pub raw: Bytes,
    pub nonce: Option<u64>,
    pub gas_price: Option<u128>,
    pub gas_limit: Option<u64>,
    pub is_create: bool,
}

impl Submission {
    fn decode(raw: Bytes) -> Self {
        let hash = keccak256(&raw);
        match TxEnvelope::decode_2718(&mut raw.as_ref()) {
            Ok(envelope) => Self {
                hash,
                nonce: Some(envelope.nonce()),
                gas_price: envelope.gas_price(),
                gas_limit: Some(envelope.gas_limit()),
                is_create: matches!(envelope.kind(), TxKind::Create),
                raw,
            },
            Err(_) => Self {
                hash,
                raw,
                nonce: None,
                gas_price: None,
                gas_limit: None,
                is_create: false,
            },
        }
    }
}

/// What a pending-transaction lookup reports for a known hash.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PendingView {
    Pending,
    Mined,
    Unknown,
}

struct Script {
    balance: U256,
    nonce: u64,
    gas_price: u128,
    gas_price_after_submit: Option<u128>,
    gas_estimate: u64,
    /// `(submission index, poll of that hash)` at which a receipt appears.
    confirm_at: Option<(usize, usize)>,
    receipt_status: bool,
    contract_address: Address,
    receipt_errors: usize,
    call_output: Bytes,
    call_revert: Option<String>,
    pending_view: PendingView,
}

#[derive(Default)]
struct Log {
    submissions: Vec<Submission>,
    receipt_polls: Vec<TxHash>,
    pending_lookups: usize,
    calls: usize,
}

/// Scripted in-process ledger.
pub struct ScriptedClient {
    script: Script,
    log: Mutex<Log>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self {
            script: Script {
                balance: U256::from(100u128 * 10u128.pow(18)),
                nonce: 0,
                gas_price: 1_000_000_000,
                gas_price_after_submit: None,
                gas_estimate: 100_000,
                confirm_at: Some((0, 1)),
                receipt_status: true,
                contract_address: Address::repeat_byte(0xab),
                receipt_errors: 0,
                call_output: Bytes::new(),
                call_revert: None,
                pending_view: PendingView::Pending,
            },
            log: Mutex::new(Log::default()),
        }
    }
}

impl ScriptedClient {
    pub fn with_balance(mut self, balance: U256) -> Self {
        self.script.balance = balance;
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.script.nonce = nonce;
        self
    }

    pub fn with_gas_price(mut self, price: u128) -> Self {
        self.script.gas_price = price;
        self
    }

    /// Network price reported once anything has been submitted.
    pub fn with_gas_price_after_submit(mut self, price: u128) -> Self {
        self.script.gas_price_after_submit = Some(price);
        self
    }

    pub fn with_gas_estimate(mut self, gas: u64) -> Self {
        self.script.gas_estimate = gas;
        self
    }

    /// Receipt for the `index`-th submission appears on its `poll`-th lookup.
    pub fn confirm_submission(mut self, index: usize, poll: usize) -> Self {
        self.script.confirm_at = Some((index, poll));
        self
    }

    pub fn never_confirm(mut self) -> Self {
        self.script.confirm_at = None;
        self
    }

    pub fn with_failed_receipt(mut self) -> Self {
        self.script.receipt_status = false;
        self
    }

    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.script.contract_address = address;
        self
    }

    /// The first `n` receipt lookups fail with a transport error.
    pub fn with_receipt_errors(mut self, n: usize) -> Self {
        self.script.receipt_errors = n;
        self
    }

    pub fn with_call_output(mut self, output: Bytes) -> Self {
        self.script.call_output = output;
        self
    }

    /// `call` and `estimate_gas` revert with `reason`.
    pub fn with_call_revert(mut self, reason: &str) -> Self {
        self.script.call_revert = Some(reason.to_string());
        self
    }

    /// Pending lookups report every transaction as already in a block.
    pub fn with_pending_mined(mut self) -> Self {
        self.script.pending_view = PendingView::Mined;
        self
    }

    /// Pending lookups never find the transaction.
    pub fn with_pending_unknown(mut self) -> Self {
        self.script.pending_view = PendingView::Unknown;
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.log.lock().unwrap().submissions.clone()
    }

    pub fn receipt_polls(&self) -> Vec<TxHash> {
        self.log.lock().unwrap().receipt_polls.clone()
    }

    pub fn pending_lookups(&self) -> usize {
        self.log.lock().unwrap().pending_lookups
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().calls
    }

    fn revert(&self) -> BlockchainResult<()> {
        match &self.script.call_revert {
            Some(reason) => Err(BlockchainError::ContractLogic(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NetworkClient for ScriptedClient {
    async fn get_balance(&self, _address: Address) -> BlockchainResult<U256> {
        Ok(self.script.balance)
    }

    async fn get_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        Ok(self.script.nonce)
    }

    async fn get_gas_price(&self) -> BlockchainResult<u128> {
        let submitted = !self.log.lock().unwrap().submissions.is_empty();
        Ok(match self.script.gas_price_after_submit {
            Some(price) if submitted => price,
            _ => self.script.gas_price,
        })
    }

    async fn submit_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let submission = Submission::decode(raw);
        let hash = submission.hash;
        self.log.lock().unwrap().submissions.push(submission);
        Ok(hash)
    }

    async fn get_receipt(&self, hash: TxHash) -> BlockchainResult<Option<TxReceipt>> {
        let mut log = self.log.lock().unwrap();
        log.receipt_polls.push(hash);
        if log.receipt_polls.len() <= self.script.receipt_errors {
            return Err(BlockchainError::transport("get_receipt", "connection reset"));
        }

        let Some((index, poll)) = self.script.confirm_at else {
            return Ok(None);
        };
        let Some(submission) = log.submissions.get(index).filter(|s| s.hash == hash) else {
            return Ok(None);
        };
        let polls = log.receipt_polls.iter().filter(|h| **h == hash).count();
        if polls < poll {
            return Ok(None);
        }

        Ok(Some(TxReceipt {
            transaction_hash: hash,
            contract_address: submission.is_create.then_some(self.script.contract_address),
            status: self.script.receipt_status,
            block_number: Some(100 + polls as u64),
        }))
    }

    async fn get_pending_transaction(&self, hash: TxHash) -> BlockchainResult<Option<PendingTxInfo>> {
        let mut log = self.log.lock().unwrap();
        log.pending_lookups += 1;
        if self.script.pending_view == PendingView::Unknown {
            return Ok(None);
        }
        let block_number = (self.script.pending_view == PendingView::Mined).then_some(99);
        Ok(log.submissions.iter().find(|s| s.hash == hash).map(|s| PendingTxInfo {
            hash,
            nonce: s.nonce.unwrap_or_default(),
            gas_price: s.gas_price.unwrap_or_default(),
            block_number,
        }))
    }

    async fn estimate_gas(&self, _tx: TransactionRequest) -> BlockchainResult<u64> {
        self.revert()?;
        Ok(self.script.gas_estimate)
    }

    async fn call(&self, _tx: TransactionRequest) -> BlockchainResult<Bytes> {
        self.log.lock().unwrap().calls += 1;
        self.revert()?;
        Ok(self.script.call_output.clone())
    }
}

/// Clock that only moves when slept on.
pub struct ManualClock {
    start: DateTime<Utc>,
    state: Mutex<(Duration, usize)>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            state: Mutex::new((Duration::ZERO, 0)),
        }
    }
}

impl ManualClock {
    pub fn sleeps(&self) -> usize {
        self.state.lock().unwrap().1
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.state.lock().unwrap().0;
        self.start + chrono::Duration::from_std(elapsed).unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.state.lock().unwrap();
            state.0 += duration;
            state.1 += 1;
        }
        tokio::task::yield_now().await;
    }
}

/// Store whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl MetadataStore for FailingStore {
    async fn insert(&self, _record: DeploymentRecord) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only file system",
        )))
    }

    async fn list_all(&self) -> Result<Vec<DeploymentRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn schema_ready(&self) -> bool {
        false
    }
}
