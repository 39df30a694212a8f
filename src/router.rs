//! Method table and dispatch.
//!
//! Every method name the server answers is an [`EthMethod`] variant. A
//! variant is either backed by a handler or explicitly unsupported; names
//! outside the table are unknown. The three outcomes map to distinct error
//! codes so clients can tell them apart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{RpcError, RpcResult};
use crate::methods::{eth, net, web3, RpcContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EthMethod {
    NetVersion,
    NetListening,
    NetPeerCount,
    Web3ClientVersion,
    Web3Sha3,
    ChainId,
    ProtocolVersion,
    Syncing,
    GasPrice,
    Accounts,
    BlockNumber,
    GetBalance,
    GetCode,
    GetTransactionCount,
    GetStorageAt,
    GetBlockByHash,
    GetBlockByNumber,
    GetBlockTransactionCountByHash,
    GetBlockTransactionCountByNumber,
    GetTransactionByHash,
    GetTransactionByBlockHashAndIndex,
    GetTransactionByBlockNumberAndIndex,
    GetTransactionReceipt,
    Call,
    SendTransaction,
    // No NEAR counterpart
    SendRawTransaction,
    Sign,
    SignTransaction,
    SignTypedData,
    SignTypedDataV4,
    GetUncleByBlockHashAndIndex,
    GetUncleByBlockNumberAndIndex,
    GetUncleCountByBlockHash,
    GetUncleCountByBlockNumber,
    NewFilter,
    NewBlockFilter,
    NewPendingTransactionFilter,
    UninstallFilter,
    GetFilterChanges,
    GetFilterLogs,
    GetLogs,
    Subscribe,
    Unsubscribe,
    GetWork,
    SubmitWork,
    SubmitHashrate,
    Mining,
    Hashrate,
    Coinbase,
    EstimateGas,
    GetCompilers,
}

impl EthMethod {
    pub const ALL: [EthMethod; 51] = [
        Self::NetVersion,
        Self::NetListening,
        Self::NetPeerCount,
        Self::Web3ClientVersion,
        Self::Web3Sha3,
        Self::ChainId,
        Self::ProtocolVersion,
        Self::Syncing,
        Self::GasPrice,
        Self::Accounts,
        Self::BlockNumber,
        Self::GetBalance,
        Self::GetCode,
        Self::GetTransactionCount,
        Self::GetStorageAt,
        Self::GetBlockByHash,
        Self::GetBlockByNumber,
        Self::GetBlockTransactionCountByHash,
        Self::GetBlockTransactionCountByNumber,
        Self::GetTransactionByHash,
        Self::GetTransactionByBlockHashAndIndex,
        Self::GetTransactionByBlockNumberAndIndex,
        Self::GetTransactionReceipt,
        Self::Call,
        Self::SendTransaction,
        Self::SendRawTransaction,
        Self::Sign,
        Self::SignTransaction,
        Self::SignTypedData,
        Self::SignTypedDataV4,
        Self::GetUncleByBlockHashAndIndex,
        Self::GetUncleByBlockNumberAndIndex,
        Self::GetUncleCountByBlockHash,
        Self::GetUncleCountByBlockNumber,
        Self::NewFilter,
        Self::NewBlockFilter,
        Self::NewPendingTransactionFilter,
        Self::UninstallFilter,
        Self::GetFilterChanges,
        Self::GetFilterLogs,
        Self::GetLogs,
        Self::Subscribe,
        Self::Unsubscribe,
        Self::GetWork,
        Self::SubmitWork,
        Self::SubmitHashrate,
        Self::Mining,
        Self::Hashrate,
        Self::Coinbase,
        Self::EstimateGas,
        Self::GetCompilers,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::NetVersion => "net_version",
            Self::NetListening => "net_listening",
            Self::NetPeerCount => "net_peerCount",
            Self::Web3ClientVersion => "web3_clientVersion",
            Self::Web3Sha3 => "web3_sha3",
            Self::ChainId => "eth_chainId",
            Self::ProtocolVersion => "eth_protocolVersion",
            Self::Syncing => "eth_syncing",
            Self::GasPrice => "eth_gasPrice",
            Self::Accounts => "eth_accounts",
            Self::BlockNumber => "eth_blockNumber",
            Self::GetBalance => "eth_getBalance",
            Self::GetCode => "eth_getCode",
            Self::GetTransactionCount => "eth_getTransactionCount",
            Self::GetStorageAt => "eth_getStorageAt",
            Self::GetBlockByHash => "eth_getBlockByHash",
            Self::GetBlockByNumber => "eth_getBlockByNumber",
            Self::GetBlockTransactionCountByHash => "eth_getBlockTransactionCountByHash",
            Self::GetBlockTransactionCountByNumber => "eth_getBlockTransactionCountByNumber",
            Self::GetTransactionByHash => "eth_getTransactionByHash",
            Self::GetTransactionByBlockHashAndIndex => "eth_getTransactionByBlockHashAndIndex",
            Self::GetTransactionByBlockNumberAndIndex => "eth_getTransactionByBlockNumberAndIndex",
            Self::GetTransactionReceipt => "eth_getTransactionReceipt",
            Self::Call => "eth_call",
            Self::SendTransaction => "eth_sendTransaction",
            Self::SendRawTransaction => "eth_sendRawTransaction",
            Self::Sign => "eth_sign",
            Self::SignTransaction => "eth_signTransaction",
            Self::SignTypedData => "eth_signTypedData",
            Self::SignTypedDataV4 => "eth_signTypedData_v4",
            Self::GetUncleByBlockHashAndIndex => "eth_getUncleByBlockHashAndIndex",
            Self::GetUncleByBlockNumberAndIndex => "eth_getUncleByBlockNumberAndIndex",
            Self::GetUncleCountByBlockHash => "eth_getUncleCountByBlockHash",
            Self::GetUncleCountByBlockNumber => "eth_getUncleCountByBlockNumber",
            Self::NewFilter => "eth_newFilter",
            Self::NewBlockFilter => "eth_newBlockFilter",
            Self::NewPendingTransactionFilter => "eth_newPendingTransactionFilter",
            Self::UninstallFilter => "eth_uninstallFilter",
            Self::GetFilterChanges => "eth_getFilterChanges",
            Self::GetFilterLogs => "eth_getFilterLogs",
            Self::GetLogs => "eth_getLogs",
            Self::Subscribe => "eth_subscribe",
            Self::Unsubscribe => "eth_unsubscribe",
            Self::GetWork => "eth_getWork",
            Self::SubmitWork => "eth_submitWork",
            Self::SubmitHashrate => "eth_submitHashrate",
            Self::Mining => "eth_mining",
            Self::Hashrate => "eth_hashrate",
            Self::Coinbase => "eth_coinbase",
            Self::EstimateGas => "eth_estimateGas",
            Self::GetCompilers => "eth_getCompilers",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Whether the method has a handler.
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            Self::SendRawTransaction
                | Self::Sign
                | Self::SignTransaction
                | Self::SignTypedData
                | Self::SignTypedDataV4
                | Self::GetUncleByBlockHashAndIndex
                | Self::GetUncleByBlockNumberAndIndex
                | Self::GetUncleCountByBlockHash
                | Self::GetUncleCountByBlockNumber
                | Self::NewFilter
                | Self::NewBlockFilter
                | Self::NewPendingTransactionFilter
                | Self::UninstallFilter
                | Self::GetFilterChanges
                | Self::GetFilterLogs
                | Self::GetLogs
                | Self::Subscribe
                | Self::Unsubscribe
                | Self::GetWork
                | Self::SubmitWork
                | Self::SubmitHashrate
                | Self::Mining
                | Self::Hashrate
                | Self::Coinbase
                | Self::EstimateGas
                | Self::GetCompilers
        )
    }
}

/// Inbound `{id, method, params}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcErrorBody {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for JsonRpcErrorBody {
    fn from(err: RpcError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            data: err.data(),
        }
    }
}

/// Outbound envelope carrying exactly one of `result` and `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    pub id: Value,
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorBody>,
}

impl JsonRpcResponse {
    pub fn from_result(id: Value, result: RpcResult<Value>) -> Self {
        let (result, error) = match result {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err.into())),
        };
        Self {
            id,
            jsonrpc: "2.0".to_string(),
            result,
            error,
        }
    }
}

/// Positional parameters from a raw `params` member.
pub fn positional_params(params: Value) -> RpcResult<Vec<Value>> {
    match params {
        Value::Null => Ok(Vec::new()),
        Value::Array(values) => Ok(values),
        other => Err(RpcError::validation(format!(
            "params must be a positional array, got {}",
            other
        ))),
    }
}

#[derive(Clone)]
pub struct Router {
    ctx: Arc<RpcContext>,
}

impl Router {
    pub fn new(ctx: Arc<RpcContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RpcContext {
        &self.ctx
    }

    /// Answer a full request envelope.
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest { id, method, params } = request;
        let result = match positional_params(params) {
            Ok(params) => self.dispatch(&method, &params).await,
            Err(err) => Err(err),
        };
        JsonRpcResponse::from_result(id, result)
    }

    /// Look a method up by name and run it.
    pub async fn dispatch(&self, method: &str, params: &[Value]) -> RpcResult<Value> {
        match EthMethod::from_name(method) {
            Some(method) => self.call(method, params).await,
            None => {
                warn!("Unknown method {} called with {} params", method, params.len());
                Err(RpcError::unknown(method, params))
            }
        }
    }

    /// Run a method, bounded by the configured request timeout.
    ///
    /// The handler runs as its own task. On expiry the caller receives an
    /// upstream error and the task is left to finish in the background; its
    /// result is discarded.
    pub async fn call(&self, method: EthMethod, params: &[Value]) -> RpcResult<Value> {
        let timeout = self.ctx.config.request_timeout();
        let router = self.clone();
        let params = params.to_vec();
        let task = tokio::spawn(async move { router.execute(method, &params).await });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => {
                if let Err(e) = &result {
                    debug!("{} failed: {}", method.name(), e);
                }
                result
            }
            Ok(Err(e)) => {
                error!("{} handler aborted: {}", method.name(), e);
                Err(RpcError::Upstream(format!("{} handler aborted: {}", method.name(), e)))
            }
            Err(_) => {
                warn!("{} timed out after {:?}, discarding its result", method.name(), timeout);
                Err(RpcError::Upstream(format!(
                    "{} timed out after {}s",
                    method.name(),
                    timeout.as_secs()
                )))
            }
        }
    }

    async fn execute(&self, method: EthMethod, params: &[Value]) -> RpcResult<Value> {
        let ctx = self.ctx.as_ref();
        debug!("Dispatching {}", method.name());

        match method {
            EthMethod::NetVersion => net::version(ctx).await,
            EthMethod::NetListening => net::listening(ctx).await,
            EthMethod::NetPeerCount => net::peer_count().await,
            EthMethod::Web3ClientVersion => web3::client_version().await,
            EthMethod::Web3Sha3 => web3::sha3(params).await,
            EthMethod::ChainId => eth::chain_id(ctx).await,
            EthMethod::ProtocolVersion => eth::protocol_version().await,
            EthMethod::Syncing => eth::syncing(ctx).await,
            EthMethod::GasPrice => eth::gas_price(ctx).await,
            EthMethod::Accounts => eth::accounts(ctx).await,
            EthMethod::BlockNumber => eth::block_number(ctx).await,
            EthMethod::GetBalance => eth::get_balance(ctx, params).await,
            EthMethod::GetCode => eth::get_code(ctx, params).await,
            EthMethod::GetTransactionCount => eth::get_transaction_count(ctx, params).await,
            EthMethod::GetStorageAt => eth::get_storage_at(ctx, params).await,
            EthMethod::GetBlockByHash => eth::get_block_by_hash(ctx, params).await,
            EthMethod::GetBlockByNumber => eth::get_block_by_number(ctx, params).await,
            EthMethod::GetBlockTransactionCountByHash => {
                eth::get_block_transaction_count_by_hash(ctx, params).await
            }
            EthMethod::GetBlockTransactionCountByNumber => {
                eth::get_block_transaction_count_by_number(ctx, params).await
            }
            EthMethod::GetTransactionByHash => eth::get_transaction_by_hash(ctx, params).await,
            EthMethod::GetTransactionByBlockHashAndIndex => {
                eth::get_transaction_by_block_hash_and_index(ctx, params).await
            }
            EthMethod::GetTransactionByBlockNumberAndIndex => {
                eth::get_transaction_by_block_number_and_index(ctx, params).await
            }
            EthMethod::GetTransactionReceipt => eth::get_transaction_receipt(ctx, params).await,
            EthMethod::Call => eth::call(ctx, params).await,
            EthMethod::SendTransaction => eth::send_transaction(ctx, params).await,
            unsupported => Err(RpcError::unsupported(unsupported.name())),
        }
    }
}
