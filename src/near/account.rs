use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::types::{BlockReference, FinalExecutionOutcomeView};
use super::NearRpc;
use crate::error::{RpcError, RpcResult};

/// An upstream account able to run view calls and sign function calls.
#[async_trait]
pub trait NearAccount: Send + Sync {
    fn account_id(&self) -> &str;

    /// Run a read-only contract method and return its raw result bytes.
    async fn view_function(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &[u8],
    ) -> RpcResult<Vec<u8>>;

    /// Sign, submit and await a function call.
    async fn function_call(
        &self,
        contract_id: &str,
        method_name: &str,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    ) -> RpcResult<FinalExecutionOutcomeView>;
}

/// Locally known accounts, in a stable order.
pub trait AccountProvider: Send + Sync {
    fn account_ids(&self) -> Vec<String>;

    fn account(&self, account_id: &str) -> Option<Arc<dyn NearAccount>>;
}

/// Unsigned function call handed to a [`TransactionSigner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCallRequest {
    pub signer_id: String,
    pub receiver_id: String,
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
    /// Base58 hash of a recent block, used as the transaction's reference.
    pub block_hash: String,
}

/// Key material lives outside this crate; a signer turns a request into a
/// serialized signed transaction ready for `broadcast_tx_commit`.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_function_call(&self, request: &FunctionCallRequest) -> RpcResult<Vec<u8>>;
}

/// Account backed by the NEAR RPC, signing through an optional signer.
pub struct RpcAccount {
    account_id: String,
    rpc: Arc<dyn NearRpc>,
    signer: Option<Arc<dyn TransactionSigner>>,
}

impl RpcAccount {
    pub fn new(
        account_id: &str,
        rpc: Arc<dyn NearRpc>,
        signer: Option<Arc<dyn TransactionSigner>>,
    ) -> Self {
        Self {
            account_id: account_id.to_string(),
            rpc,
            signer,
        }
    }
}

#[async_trait]
impl NearAccount for RpcAccount {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn view_function(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &[u8],
    ) -> RpcResult<Vec<u8>> {
        let path = format!("call/{}/{}", contract_id, method_name);
        debug!("view_function: {} ({} arg bytes)", path, args.len());
        let response = self
            .rpc
            .query(&path, &bs58::encode(args).into_string())
            .await?;
        Ok(response.result)
    }

    async fn function_call(
        &self,
        contract_id: &str,
        method_name: &str,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    ) -> RpcResult<FinalExecutionOutcomeView> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            RpcError::Upstream(format!(
                "no signer is configured for account {}",
                self.account_id
            ))
        })?;

        let block = self.rpc.block(BlockReference::latest()).await?;
        let request = FunctionCallRequest {
            signer_id: self.account_id.clone(),
            receiver_id: contract_id.to_string(),
            method_name: method_name.to_string(),
            args,
            gas,
            deposit,
            block_hash: block.header.hash,
        };

        let signed = signer.sign_function_call(&request).await?;
        info!(
            "Submitting {}.{} from {} ({} bytes signed)",
            contract_id,
            method_name,
            self.account_id,
            signed.len()
        );
        self.rpc.broadcast_tx_commit(&signed).await
    }
}

/// Fixed set of accounts, usually from configuration.
#[derive(Default)]
pub struct StaticKeyStore {
    order: Vec<String>,
    accounts: HashMap<String, Arc<dyn NearAccount>>,
}

impl StaticKeyStore {
    pub fn new(accounts: Vec<Arc<dyn NearAccount>>) -> Self {
        let mut store = Self::default();
        for account in accounts {
            let id = account.account_id().to_string();
            if store.accounts.insert(id.clone(), account).is_none() {
                store.order.push(id);
            }
        }
        store
    }

    /// RPC-backed accounts for each id, sharing one signer.
    pub fn from_ids(
        ids: &[String],
        rpc: Arc<dyn NearRpc>,
        signer: Option<Arc<dyn TransactionSigner>>,
    ) -> Self {
        Self::new(
            ids.iter()
                .map(|id| {
                    Arc::new(RpcAccount::new(id, rpc.clone(), signer.clone())) as Arc<dyn NearAccount>
                })
                .collect(),
        )
    }
}

impl AccountProvider for StaticKeyStore {
    fn account_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    fn account(&self, account_id: &str) -> Option<Arc<dyn NearAccount>> {
        self.accounts.get(account_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::near::FinalExecutionStatus;
    use crate::test_support::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_view_function_queries_contract_path() {
        let mock = Arc::new(MockNear::new().with_query("call/evm/get_nonce", vec![7]));
        let account = RpcAccount::new("viewer.near", mock.clone(), None);

        let result = account.view_function("evm", "get_nonce", &[1, 2, 3]).await.unwrap();

        assert_eq!(result, vec![7]);
        let queries = mock.recorded_queries.lock().unwrap();
        assert_eq!(
            queries.as_slice(),
            &[("call/evm/get_nonce".to_string(), bs58::encode([1u8, 2, 3]).into_string())]
        );
    }

    #[tokio::test]
    async fn test_function_call_signs_against_latest_block() {
        let sent = transaction(3, "alice.near", vec![function_call("deposit", &[], 9)]);
        let mock = Arc::new(
            MockNear::new()
                .with_block(block(8, 80, Vec::new()))
                .with_broadcast_result(outcome(
                    sent,
                    &hash(80),
                    FinalExecutionStatus::SuccessValue(String::new()),
                    Vec::new(),
                )),
        );
        let signer: Arc<dyn TransactionSigner> = Arc::new(JsonSigner);
        let account = RpcAccount::new("alice.near", mock.clone(), Some(signer));

        let result = account
            .function_call("evm", "deposit", Vec::new(), 100, 9)
            .await
            .unwrap();
        assert_eq!(result.transaction.signer_id, "alice.near");

        let broadcasts = mock.broadcasts.lock().unwrap();
        let signed: Value = serde_json::from_slice(&broadcasts[0]).unwrap();
        assert_eq!(signed["method_name"], "deposit");
        assert_eq!(signed["deposit"], "9");
    }

    #[tokio::test]
    async fn test_function_call_without_signer_fails() {
        let mock = Arc::new(MockNear::new().with_block(block(8, 80, Vec::new())));
        let account = RpcAccount::new("alice.near", mock.clone(), None);

        let err = account
            .function_call("evm", "deposit", Vec::new(), 100, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Upstream(_)));
        assert!(mock.broadcasts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_key_store_keeps_order_and_drops_duplicates() {
        let rpc: Arc<dyn NearRpc> = Arc::new(MockNear::new());
        let ids = vec![
            "b.near".to_string(),
            "a.near".to_string(),
            "b.near".to_string(),
        ];
        let store = StaticKeyStore::from_ids(&ids, rpc, None);
        assert_eq!(store.account_ids(), vec!["b.near", "a.near"]);
        assert!(store.account("a.near").is_some());
        assert!(store.account("c.near").is_none());
    }
}
