use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Base58 transaction root of a chunk without transactions (32 zero bytes).
pub const EMPTY_TX_ROOT: &str = "11111111111111111111111111111111";

/// JSON-RPC request to the NEAR RPC
#[derive(Debug, Serialize)]
pub struct NearRpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: Value,
}

impl NearRpcRequest {
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: "dontcare".to_string(),
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC response from the NEAR RPC
#[derive(Debug, Deserialize)]
pub struct NearRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<NearRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct NearRpcErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    Final,
    Optimistic,
}

/// How a block is addressed in a `block` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReference {
    Height(u64),
    /// Base58 block hash
    Hash(String),
    Finality(Finality),
}

impl BlockReference {
    pub fn latest() -> Self {
        Self::Finality(Finality::Final)
    }

    pub fn to_params(&self) -> Value {
        match self {
            Self::Height(h) => serde_json::json!({ "block_id": h }),
            Self::Hash(hash) => serde_json::json!({ "block_id": hash }),
            Self::Finality(f) => serde_json::json!({ "finality": f }),
        }
    }
}

/// Response from `status`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub chain_id: String,
    pub sync_info: SyncInfo,
    #[serde(default)]
    pub version: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncInfo {
    pub latest_block_hash: String,
    pub latest_block_height: u64,
    #[serde(default)]
    pub latest_block_time: Option<String>,
    pub syncing: bool,
}

/// Response from `block`
#[derive(Debug, Clone, Deserialize)]
pub struct BlockView {
    #[serde(default)]
    pub author: Option<String>,
    pub header: BlockHeaderView,
    pub chunks: Vec<ChunkHeaderView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeaderView {
    pub height: u64,
    pub hash: String,
    pub prev_hash: String,
    /// Nanoseconds since the unix epoch
    pub timestamp: u64,
    /// Decimal yoctoNEAR per gas unit
    pub gas_price: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkHeaderView {
    pub chunk_hash: String,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub tx_root: String,
    #[serde(default)]
    pub shard_id: u64,
    #[serde(default)]
    pub height_created: u64,
}

impl ChunkHeaderView {
    pub fn has_transactions(&self) -> bool {
        self.tx_root != EMPTY_TX_ROOT
    }
}

/// Response from `chunk`
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkView {
    #[serde(default)]
    pub author: Option<String>,
    pub header: ChunkHeaderView,
    pub transactions: Vec<SignedTransactionView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignedTransactionView {
    pub signer_id: String,
    #[serde(default)]
    pub public_key: Option<String>,
    pub nonce: u64,
    pub receiver_id: String,
    pub actions: Vec<ActionView>,
    #[serde(default)]
    pub signature: Option<String>,
    pub hash: String,
}

impl SignedTransactionView {
    /// The first function call carried by the transaction.
    pub fn function_call(&self) -> Option<&FunctionCallAction> {
        self.actions.iter().find_map(|action| match action {
            ActionView::FunctionCall(call) => Some(call),
            _ => None,
        })
    }
}

/// Transaction actions as rendered by the RPC. Unit variants arrive as plain
/// strings, the rest as single-key objects.
#[derive(Debug, Clone, Deserialize)]
pub enum ActionView {
    CreateAccount,
    DeployContract {
        code: String,
    },
    FunctionCall(FunctionCallAction),
    Transfer {
        deposit: String,
    },
    Stake {
        stake: String,
        public_key: String,
    },
    AddKey {
        public_key: String,
        access_key: Value,
    },
    DeleteKey {
        public_key: String,
    },
    DeleteAccount {
        beneficiary_id: String,
    },
}

impl ActionView {
    /// Attached deposit in yoctoNEAR, as sent on the wire.
    pub fn deposit(&self) -> Option<&str> {
        match self {
            Self::FunctionCall(call) => Some(&call.deposit),
            Self::Transfer { deposit } => Some(deposit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    /// Base64 encoded args
    pub args: String,
    pub gas: u64,
    pub deposit: String,
}

/// Response from `tx` / `broadcast_tx_commit`
#[derive(Debug, Clone, Deserialize)]
pub struct FinalExecutionOutcomeView {
    pub status: FinalExecutionStatus,
    pub transaction: SignedTransactionView,
    pub transaction_outcome: ExecutionOutcomeWithIdView,
    pub receipts_outcome: Vec<ExecutionOutcomeWithIdView>,
}

impl FinalExecutionOutcomeView {
    /// Block the transaction was converted to a receipt in.
    pub fn block_hash(&self) -> &str {
        &self.transaction_outcome.block_hash
    }

    /// Gas burnt by the transaction and all of its receipts.
    pub fn gas_burnt(&self) -> u64 {
        self.receipts_outcome
            .iter()
            .map(|r| r.outcome.gas_burnt)
            .fold(self.transaction_outcome.outcome.gas_burnt, u64::saturating_add)
    }

    /// Base64 return payload when the transaction succeeded.
    pub fn success_value(&self) -> Option<&str> {
        match &self.status {
            FinalExecutionStatus::SuccessValue(value) => Some(value),
            _ => None,
        }
    }

    /// Log strings of every receipt, in execution order.
    pub fn logs(&self) -> impl Iterator<Item = &str> {
        self.receipts_outcome
            .iter()
            .flat_map(|r| r.outcome.logs.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum FinalExecutionStatus {
    NotStarted,
    Started,
    Failure(Value),
    SuccessValue(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionOutcomeWithIdView {
    pub id: String,
    pub block_hash: String,
    pub outcome: ExecutionOutcomeView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionOutcomeView {
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub receipt_ids: Vec<String>,
    pub gas_burnt: u64,
    #[serde(default)]
    pub executor_id: Option<String>,
    pub status: ExecutionStatusView,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum ExecutionStatusView {
    Unknown,
    Failure(Value),
    SuccessValue(String),
    SuccessReceiptId(String),
}

/// Response from a `call/<account>/<method>` query
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub result: Vec<u8>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_variants_deserialize() {
        let actions: Vec<ActionView> = serde_json::from_value(json!([
            "CreateAccount",
            { "Transfer": { "deposit": "100" } },
            { "FunctionCall": { "method_name": "call", "args": "AA==", "gas": 10, "deposit": "5" } }
        ]))
        .unwrap();
        assert!(matches!(actions[0], ActionView::CreateAccount));
        assert_eq!(actions[1].deposit(), Some("100"));
        assert_eq!(actions[2].deposit(), Some("5"));
    }

    #[test]
    fn test_block_reference_params() {
        assert_eq!(BlockReference::Height(7).to_params(), json!({ "block_id": 7 }));
        assert_eq!(BlockReference::latest().to_params(), json!({ "finality": "final" }));
    }

    #[test]
    fn test_empty_tx_root_detection() {
        let chunk: ChunkHeaderView = serde_json::from_value(json!({
            "chunk_hash": "abc", "gas_used": 0, "gas_limit": 1000, "tx_root": EMPTY_TX_ROOT
        }))
        .unwrap();
        assert!(!chunk.has_transactions());
    }
}
