//! In-memory NEAR upstream and record builders shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::codec::encode_base64;
use crate::error::{RpcError, RpcResult};
use crate::near::*;

/// Base58 hash made of 32 copies of `n`.
pub fn hash(n: u8) -> String {
    bs58::encode([n; 32]).into_string()
}

pub fn hex_hash(n: u8) -> String {
    format!("0x{}", hex::encode([n; 32]))
}

pub fn chunk_header(n: u8, gas_used: u64, gas_limit: u64, has_txs: bool) -> ChunkHeaderView {
    ChunkHeaderView {
        chunk_hash: hash(n),
        gas_used,
        gas_limit,
        tx_root: if has_txs { hash(0xee) } else { EMPTY_TX_ROOT.to_string() },
        shard_id: 0,
        height_created: 0,
    }
}

pub fn block(height: u64, n: u8, chunks: Vec<ChunkHeaderView>) -> BlockView {
    BlockView {
        author: Some("validator.near".to_string()),
        header: BlockHeaderView {
            height,
            hash: hash(n),
            prev_hash: hash(n.wrapping_sub(1)),
            timestamp: 1_601_510_400_123_456_789,
            gas_price: "100000000".to_string(),
        },
        chunks,
    }
}

pub fn function_call(method: &str, args: &[u8], deposit: u128) -> ActionView {
    ActionView::FunctionCall(FunctionCallAction {
        method_name: method.to_string(),
        args: encode_base64(args),
        gas: 300_000_000_000_000,
        deposit: deposit.to_string(),
    })
}

pub fn transaction(n: u8, signer: &str, actions: Vec<ActionView>) -> SignedTransactionView {
    SignedTransactionView {
        signer_id: signer.to_string(),
        public_key: None,
        nonce: n as u64,
        receiver_id: "evm".to_string(),
        actions,
        signature: None,
        hash: hash(n),
    }
}

pub fn chunk(header: ChunkHeaderView, transactions: Vec<SignedTransactionView>) -> ChunkView {
    ChunkView {
        author: None,
        header,
        transactions,
    }
}

pub fn outcome(
    tx: SignedTransactionView,
    block_hash: &str,
    status: FinalExecutionStatus,
    logs: Vec<String>,
) -> FinalExecutionOutcomeView {
    let receipt_status = match &status {
        FinalExecutionStatus::SuccessValue(v) => ExecutionStatusView::SuccessValue(v.clone()),
        FinalExecutionStatus::Failure(f) => ExecutionStatusView::Failure(f.clone()),
        _ => ExecutionStatusView::Unknown,
    };
    FinalExecutionOutcomeView {
        status,
        transaction_outcome: ExecutionOutcomeWithIdView {
            id: tx.hash.clone(),
            block_hash: block_hash.to_string(),
            outcome: ExecutionOutcomeView {
                logs: Vec::new(),
                receipt_ids: vec![hash(0xaa)],
                gas_burnt: 2_000,
                executor_id: Some(tx.signer_id.clone()),
                status: ExecutionStatusView::SuccessReceiptId(hash(0xaa)),
            },
        },
        receipts_outcome: vec![ExecutionOutcomeWithIdView {
            id: hash(0xaa),
            block_hash: block_hash.to_string(),
            outcome: ExecutionOutcomeView {
                logs,
                receipt_ids: Vec::new(),
                gas_burnt: 3_000,
                executor_id: Some("evm".to_string()),
                status: receipt_status,
            },
        }],
        transaction: tx,
    }
}

/// Scriptable [`NearRpc`] double.
#[derive(Default)]
pub struct MockNear {
    pub status: Option<StatusResponse>,
    blocks: HashMap<String, BlockView>,
    heights: HashMap<u64, String>,
    latest: Option<String>,
    chunks: HashMap<String, (ChunkView, Duration)>,
    outcomes: HashMap<(String, String), (FinalExecutionOutcomeView, Duration)>,
    failing: HashSet<String>,
    queries: HashMap<String, Vec<u8>>,
    broadcast_result: Option<FinalExecutionOutcomeView>,

    pub chunk_calls: AtomicUsize,
    pub tx_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Tracked fetches that ran to the end of their delay
    pub completed: AtomicUsize,
    pub fetch_order: Mutex<Vec<String>>,
    pub recorded_queries: Mutex<Vec<(String, String)>>,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl MockNear {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, height: u64, syncing: bool) -> Self {
        self.status = Some(StatusResponse {
            chain_id: "localnet".to_string(),
            sync_info: SyncInfo {
                latest_block_hash: hash(1),
                latest_block_height: height,
                latest_block_time: None,
                syncing,
            },
            version: None,
        });
        self
    }

    /// Register a block; the most recently added one answers `final`.
    pub fn with_block(mut self, block: BlockView) -> Self {
        self.heights.insert(block.header.height, block.header.hash.clone());
        self.latest = Some(block.header.hash.clone());
        self.blocks.insert(block.header.hash.clone(), block);
        self
    }

    pub fn with_chunk(mut self, chunk: ChunkView, delay: Duration) -> Self {
        self.chunks
            .insert(chunk.header.chunk_hash.clone(), (chunk, delay));
        self
    }

    pub fn with_outcome(mut self, outcome: FinalExecutionOutcomeView, delay: Duration) -> Self {
        let key = (
            outcome.transaction.hash.clone(),
            outcome.transaction.signer_id.clone(),
        );
        self.outcomes.insert(key, (outcome, delay));
        self
    }

    /// Make every lookup of this chunk or transaction hash fail.
    pub fn failing(mut self, hash: &str) -> Self {
        self.failing.insert(hash.to_string());
        self
    }

    pub fn with_query(mut self, path: &str, result: Vec<u8>) -> Self {
        self.queries.insert(path.to_string(), result);
        self
    }

    pub fn with_broadcast_result(mut self, outcome: FinalExecutionOutcomeView) -> Self {
        self.broadcast_result = Some(outcome);
        self
    }

    async fn track<T>(&self, key: &str, delay: Duration, value: T) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.fetch_order.lock().unwrap().push(key.to_string());
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        value
    }
}

#[async_trait]
impl NearRpc for MockNear {
    async fn status(&self) -> RpcResult<StatusResponse> {
        self.status
            .clone()
            .ok_or_else(|| RpcError::upstream("node unreachable"))
    }

    async fn block(&self, reference: BlockReference) -> RpcResult<BlockView> {
        let hash = match &reference {
            BlockReference::Hash(h) => Some(h.clone()),
            BlockReference::Height(h) => self.heights.get(h).cloned(),
            BlockReference::Finality(_) => self.latest.clone(),
        };
        hash.and_then(|h| self.blocks.get(&h).cloned())
            .ok_or_else(|| RpcError::upstream(format!("block {:?} not found", reference)))
    }

    async fn chunk(&self, chunk_hash: &str) -> RpcResult<ChunkView> {
        self.chunk_calls.fetch_add(1, Ordering::SeqCst);
        let (chunk, delay) = self
            .chunks
            .get(chunk_hash)
            .cloned()
            .ok_or_else(|| RpcError::upstream(format!("chunk {} not found", chunk_hash)))?;
        let chunk = self.track(chunk_hash, delay, chunk).await;
        if self.failing.contains(chunk_hash) {
            return Err(RpcError::upstream(format!("chunk {} unavailable", chunk_hash)));
        }
        Ok(chunk)
    }

    async fn tx_status(
        &self,
        tx_hash: &str,
        account_id: &str,
    ) -> RpcResult<FinalExecutionOutcomeView> {
        self.tx_calls.fetch_add(1, Ordering::SeqCst);
        let key = (tx_hash.to_string(), account_id.to_string());
        let (outcome, delay) = self.outcomes.get(&key).cloned().ok_or_else(|| {
            RpcError::upstream(format!("transaction {} by {} not found", tx_hash, account_id))
        })?;
        let outcome = self.track(tx_hash, delay, outcome).await;
        if self.failing.contains(tx_hash) {
            return Err(RpcError::upstream(format!("transaction {} unavailable", tx_hash)));
        }
        Ok(outcome)
    }

    async fn query(&self, path: &str, data: &str) -> RpcResult<QueryResponse> {
        self.recorded_queries
            .lock()
            .unwrap()
            .push((path.to_string(), data.to_string()));
        let result = self
            .queries
            .get(path)
            .cloned()
            .ok_or_else(|| RpcError::upstream(format!("query {} failed", path)))?;
        Ok(QueryResponse {
            result,
            logs: Vec::new(),
            block_height: None,
            block_hash: None,
        })
    }

    async fn broadcast_tx_commit(&self, signed_tx: &[u8]) -> RpcResult<FinalExecutionOutcomeView> {
        self.broadcasts.lock().unwrap().push(signed_tx.to_vec());
        self.broadcast_result
            .clone()
            .ok_or_else(|| RpcError::upstream("broadcast rejected"))
    }
}

/// Signer that "signs" by serializing the request as JSON.
pub struct JsonSigner;

#[async_trait]
impl TransactionSigner for JsonSigner {
    async fn sign_function_call(&self, request: &FunctionCallRequest) -> RpcResult<Vec<u8>> {
        let body: Value = json!({
            "signer_id": request.signer_id,
            "receiver_id": request.receiver_id,
            "method_name": request.method_name,
            "args": hex::encode(&request.args),
            "deposit": request.deposit.to_string(),
        });
        Ok(serde_json::to_vec(&body)?)
    }
}
