//! Contract handles: interface descriptor + bytecode or address.
//!
//! Arguments arrive as JSON values and are coerced against the descriptor's
//! ordered parameter types; return data is decoded by the same descriptor
//! and rendered back to JSON.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi, Param};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use serde_json::Value;
use std::sync::Arc;

use crate::blockchain::client::NetworkClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Compiler output for one contract.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// Base name derived from the source filename (`Inbox.sol` → `Inbox`).
    pub name: String,
    /// Interface descriptor.
    pub abi: JsonAbi,
    /// Creation bytecode, absent for interface-only artifacts.
    pub bytecode: Option<Bytes>,
}

#[derive(Debug, Clone)]
enum Target {
    /// Not deployed yet; holds creation bytecode.
    Creation(Bytes),
    /// Deployed at an address.
    Deployed(Address),
}

/// A callable/transactable view of one contract.
#[derive(Clone)]
pub struct ContractHandle {
    abi: JsonAbi,
    target: Target,
    client: Arc<dyn NetworkClient>,
}

impl ContractHandle {
    /// Handle for a constructor call.
    pub fn for_deployment(
        artifact: &ContractArtifact,
        client: Arc<dyn NetworkClient>,
    ) -> BlockchainResult<Self> {
        let bytecode = artifact
            .bytecode
            .clone()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                BlockchainError::Abi(format!("contract '{}' has no bytecode", artifact.name))
            })?;

        Ok(Self {
            abi: artifact.abi.clone(),
            target: Target::Creation(bytecode),
            client,
        })
    }

    /// Handle for a deployed contract.
    pub fn at(abi: JsonAbi, address: Address, client: Arc<dyn NetworkClient>) -> Self {
        Self {
            abi,
            target: Target::Deployed(address),
            client,
        }
    }

    /// Deployed address, if this handle points at one.
    pub fn address(&self) -> Option<Address> {
        match self.target {
            Target::Deployed(address) => Some(address),
            Target::Creation(_) => None,
        }
    }

    /// Unsigned contract-creation transaction (bytecode ++ encoded args).
    pub fn build_constructor_transaction(&self, args: &[Value]) -> BlockchainResult<TransactionRequest> {
        let Target::Creation(bytecode) = &self.target else {
            return Err(BlockchainError::Abi(
                "constructor called on an already deployed contract".to_string(),
            ));
        };

        let mut code = bytecode.to_vec();
        match self.abi.constructor() {
            Some(constructor) => {
                let values = coerce_args("constructor", &constructor.inputs, args)?;
                let encoded = constructor
                    .abi_encode_input(&values)
                    .map_err(|e| BlockchainError::Abi(format!("constructor: {}", e)))?;
                code.extend_from_slice(&encoded);
            }
            None if !args.is_empty() => {
                return Err(BlockchainError::Abi(format!(
                    "constructor takes no arguments, got {}",
                    args.len()
                )));
            }
            None => {}
        }

        Ok(TransactionRequest::default().with_deploy_code(Bytes::from(code)))
    }

    /// Unsigned state-changing call to `function`.
    pub fn build_call_transaction(
        &self,
        function: &str,
        args: &[Value],
    ) -> BlockchainResult<TransactionRequest> {
        let address = self.deployed_address()?;
        let data = self.encode_call(function, args)?;
        Ok(TransactionRequest::default()
            .with_to(address)
            .with_input(data))
    }

    /// Read-only call; no transaction, no gas.
    ///
    /// A revert surfaces as `ContractLogic`; callers decide if it is fatal.
    pub async fn call(&self, function: &str, args: &[Value]) -> BlockchainResult<Vec<DynSolValue>> {
        let address = self.deployed_address()?;
        let (selected, data) = self.select_and_encode(function, args)?;

        let tx = TransactionRequest::default().with_to(address).with_input(data);
        let output = self.client.call(tx).await?;

        selected
            .abi_decode_output(&output)
            .map_err(|e| BlockchainError::Abi(format!("{}: cannot decode output: {}", function, e)))
    }

    fn deployed_address(&self) -> BlockchainResult<Address> {
        self.address().ok_or_else(|| {
            BlockchainError::Abi("contract is not deployed yet".to_string())
        })
    }

    fn encode_call(&self, function: &str, args: &[Value]) -> BlockchainResult<Bytes> {
        self.select_and_encode(function, args).map(|(_, data)| data)
    }

    fn select_and_encode(&self, function: &str, args: &[Value]) -> BlockchainResult<(Function, Bytes)> {
        let candidates = self
            .abi
            .function(function)
            .ok_or_else(|| BlockchainError::Abi(format!("function '{}' not found", function)))?;

        // Overloads are told apart by arity only.
        let selected = candidates
            .iter()
            .find(|f| f.inputs.len() == args.len())
            .ok_or_else(|| {
                BlockchainError::Abi(format!(
                    "function '{}' does not take {} argument(s)",
                    function,
                    args.len()
                ))
            })?;

        let values = coerce_args(function, &selected.inputs, args)?;
        let data = selected
            .abi_encode_input(&values)
            .map_err(|e| BlockchainError::Abi(format!("{}: {}", function, e)))?;
        Ok((selected.clone(), Bytes::from(data)))
    }
}

impl std::fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandle")
            .field("target", &self.target)
            .field("functions", &self.abi.functions.len())
            .finish()
    }
}

/// Coerce JSON arguments to the descriptor's parameter types.
pub fn coerce_args(context: &str, params: &[Param], args: &[Value]) -> BlockchainResult<Vec<DynSolValue>> {
    if params.len() != args.len() {
        return Err(BlockchainError::Abi(format!(
            "{}: expected {} argument(s), got {}",
            context,
            params.len(),
            args.len()
        )));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty: DynSolType = param
                .resolve()
                .map_err(|e| BlockchainError::Abi(format!("{}: {}", context, e)))?;
            coerce_value(&ty, arg).map_err(|reason| {
                BlockchainError::Abi(format!(
                    "{}: argument '{}' ({}): {}",
                    context, param.name, param.ty, reason
                ))
            })
        })
        .collect()
}

fn coerce_value(ty: &DynSolType, arg: &Value) -> Result<DynSolValue, String> {
    let text = match arg {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => arg.to_string(),
        Value::Null => return Err("null is not a valid argument".to_string()),
    };
    ty.coerce_str(&text).map_err(|e| e.to_string())
}

/// Render a decoded value as JSON.
///
/// Integers that fit in 64 bits become JSON numbers; wider ones become
/// decimal strings.
pub fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => {
            let text = i.to_string();
            text.parse::<i64>().map(Value::from).unwrap_or(Value::String(text))
        }
        DynSolValue::Uint(u, _) => {
            let text = u.to_string();
            text.parse::<u64>().map(Value::from).unwrap_or(Value::String(text))
        }
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(b) => Value::String(alloy::hex::encode_prefixed(b)),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(alloy::hex::encode_prefixed(&word[..*size]))
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{inbox_abi, ScriptedClient};
    use alloy::primitives::{I256, TxKind, U256};
    use serde_json::json;

    fn deployed(client: Arc<ScriptedClient>) -> ContractHandle {
        ContractHandle::at(inbox_abi(), Address::repeat_byte(0x11), client)
    }

    fn artifact(abi: JsonAbi, bytecode: &[u8]) -> ContractArtifact {
        ContractArtifact {
            name: "Inbox".to_string(),
            abi,
            bytecode: Some(Bytes::from(bytecode.to_vec())),
        }
    }

    #[test]
    fn test_constructor_appends_encoded_args() {
        let handle = ContractHandle::for_deployment(
            &artifact(inbox_abi(), &[0x60, 0x80]),
            Arc::new(ScriptedClient::default()),
        )
        .unwrap();

        let tx = handle.build_constructor_transaction(&[json!("hello")]).unwrap();
        assert_eq!(tx.to, Some(TxKind::Create));
        let input = tx.input.input().unwrap();
        assert_eq!(&input[..2], &[0x60, 0x80]);
        // offset word + length word + one padded data word
        assert_eq!(input.len(), 2 + 32 * 3);
    }

    #[test]
    fn test_constructor_arity_mismatch() {
        let handle = ContractHandle::for_deployment(
            &artifact(inbox_abi(), &[0x60, 0x80]),
            Arc::new(ScriptedClient::default()),
        )
        .unwrap();
        let err = handle.build_constructor_transaction(&[]).unwrap_err();
        assert!(matches!(err, BlockchainError::Abi(_)));
    }

    #[test]
    fn test_missing_bytecode() {
        let mut art = artifact(inbox_abi(), &[]);
        art.bytecode = None;
        let err = ContractHandle::for_deployment(&art, Arc::new(ScriptedClient::default())).unwrap_err();
        assert!(err.to_string().contains("no bytecode"));
    }

    #[test]
    fn test_build_call_transaction() {
        let handle = deployed(Arc::new(ScriptedClient::default()));
        let tx = handle
            .build_call_transaction("setMessage", &[json!("updated")])
            .unwrap();
        assert_eq!(tx.to, Some(TxKind::Call(Address::repeat_byte(0x11))));

        let abi = inbox_abi();
        let function = &abi.function("setMessage").unwrap()[0];
        let input = tx.input.input().unwrap();
        assert_eq!(&input[..4], function.selector().as_slice());
    }

    #[test]
    fn test_unknown_function() {
        let handle = deployed(Arc::new(ScriptedClient::default()));
        let err = handle.build_call_transaction("selfDestruct", &[]).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_bad_argument_type() {
        let handle = deployed(Arc::new(ScriptedClient::default()));
        let err = handle
            .build_call_transaction("doMath", &[json!("not a number"), json!(2)])
            .unwrap_err();
        assert!(matches!(err, BlockchainError::Abi(_)));
    }

    #[tokio::test]
    async fn test_read_only_call_decodes_tuple() {
        let int = |v: i64| DynSolValue::Int(I256::try_from(v).unwrap(), 256);
        let output = DynSolValue::Tuple(vec![int(5), int(-1), int(6), DynSolValue::Bool(false)])
        .abi_encode_params();
        let client = Arc::new(ScriptedClient::default().with_call_output(Bytes::from(output)));
        let handle = deployed(client.clone());

        let values = handle.call("doMath", &[json!(2), json!(3)]).await.unwrap();
        let rendered: Vec<Value> = values.iter().map(to_json).collect();
        assert_eq!(rendered, vec![json!(5), json!(-1), json!(6), json!(false)]);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_read_only_revert_is_contract_logic() {
        let client = Arc::new(ScriptedClient::default().with_call_revert("execution reverted: empty"));
        let handle = deployed(client);
        let err = handle.call("message", &[]).await.unwrap_err();
        assert!(matches!(err, BlockchainError::ContractLogic(_)));
    }

    #[test]
    fn test_to_json_wide_integers_as_strings() {
        let value = DynSolValue::Uint(U256::MAX, 256);
        assert!(to_json(&value).is_string());
        let value = DynSolValue::Address(Address::repeat_byte(0xab));
        assert_eq!(to_json(&value), json!(Address::repeat_byte(0xab).to_checksum(None)));
    }
}
