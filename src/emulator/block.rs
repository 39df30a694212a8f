use serde::{Deserialize, Serialize};
use tracing::debug;

use super::transaction::{map_full_transaction, EthTransaction};
use crate::codec::{base58_to_hex, convert_timestamp, encode_quantity};
use crate::error::{RpcError, RpcResult};
use crate::hydrator::{FullTransaction, HydratedBlock};
use crate::near::BlockHeaderView;

/// keccak256(rlp([])), the uncle hash of a block without uncles.
pub const EMPTY_UNCLES_HASH: &str =
    "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347";
/// Root of an empty trie.
pub const EMPTY_TRIE_ROOT: &str =
    "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421";

/// Either the composite hashes or the full objects of a block's transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    Hashes(Vec<String>),
    Full(Vec<EthTransaction>),
}

impl BlockTransactions {
    pub fn len(&self) -> usize {
        match self {
            Self::Hashes(h) => h.len(),
            Self::Full(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// EVM-formatted block object.
/// Maps a hydrated NEAR block to EVM block format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthBlock {
    /// Block height
    pub number: String,
    pub hash: String,
    pub parent_hash: String,
    /// Nonce (no proof of work, always zero)
    pub nonce: String,
    pub sha3_uncles: String,
    pub logs_bloom: String,
    pub transactions_root: String,
    pub state_root: String,
    pub receipts_root: String,
    /// Zero address; NEAR block producers have no EVM identity
    pub miner: String,
    pub difficulty: String,
    pub total_difficulty: String,
    pub extra_data: String,
    pub size: String,
    /// Largest chunk gas limit; null when the block has no chunks
    pub gas_limit: Option<String>,
    /// Sum of chunk gas used; null when the block has no chunks
    pub gas_used: Option<String>,
    /// Milliseconds since the epoch
    pub timestamp: String,
    pub transactions: BlockTransactions,
    pub uncles: Vec<String>,
}

impl EthBlock {
    /// Header fields shared by mapped and placeholder blocks.
    fn from_header(header: &BlockHeaderView, transactions: BlockTransactions) -> RpcResult<Self> {
        Ok(EthBlock {
            number: encode_quantity(header.height),
            hash: base58_to_hex(&header.hash)?,
            parent_hash: base58_to_hex(&header.prev_hash)?,
            nonce: "0x0000000000000000".to_string(),
            sha3_uncles: EMPTY_UNCLES_HASH.to_string(),
            logs_bloom: format!("0x{}", "0".repeat(512)),
            transactions_root: EMPTY_TRIE_ROOT.to_string(),
            state_root: EMPTY_TRIE_ROOT.to_string(),
            receipts_root: EMPTY_TRIE_ROOT.to_string(),
            miner: format!("0x{}", "0".repeat(40)),
            difficulty: "0x0".to_string(),
            total_difficulty: "0x0".to_string(),
            extra_data: "0x".to_string(),
            size: "0x0".to_string(),
            gas_limit: None,
            gas_used: None,
            timestamp: convert_timestamp(header.timestamp),
            transactions,
            uncles: Vec::new(),
        })
    }

    /// Block with null gas fields, for blocks that carry no chunks.
    pub fn without_chunks(block: &HydratedBlock) -> RpcResult<Self> {
        Self::from_header(&block.header, BlockTransactions::Hashes(Vec::new()))
    }
}

/// Sum of chunk gas used and the largest chunk gas limit.
///
/// Both are undefined for a block without chunks, which is an error rather
/// than zero.
pub fn aggregate_gas(block: &HydratedBlock) -> RpcResult<(u64, u64)> {
    if block.chunks.is_empty() {
        return Err(RpcError::validation(format!(
            "block {} has no chunks to aggregate gas over",
            block.header.height
        )));
    }

    let used = block
        .chunks
        .iter()
        .try_fold(0u64, |sum, c| sum.checked_add(c.gas_used))
        .ok_or_else(|| RpcError::upstream("chunk gas used overflows u64"))?;
    let limit = block.chunks.iter().map(|c| c.gas_limit).max().unwrap_or_default();

    Ok((used, limit))
}

/// Composite hashes of every transaction, in block order.
pub fn transaction_hashes(block: &HydratedBlock) -> RpcResult<Vec<String>> {
    block.transactions.iter().map(|t| t.key().encode()).collect()
}

/// Map a hydrated block, listing its transactions by composite hash.
pub fn map_block(block: &HydratedBlock) -> RpcResult<EthBlock> {
    let hashes = transaction_hashes(block)?;
    with_gas(block, BlockTransactions::Hashes(hashes))
}

/// Map a hydrated block with full transaction objects.
///
/// `transactions` are the outcome-merged records of every transaction of the
/// block, in block order, as produced by
/// [`Hydrator::hydrate_all_transactions`](crate::hydrator::Hydrator::hydrate_all_transactions).
pub fn map_block_full(block: &HydratedBlock, transactions: &[FullTransaction]) -> RpcResult<EthBlock> {
    if transactions.len() != block.transactions.len() {
        return Err(RpcError::Upstream(format!(
            "block {} lists {} transactions but {} outcomes were fetched",
            block.header.height,
            block.transactions.len(),
            transactions.len()
        )));
    }

    let mapped = transactions
        .iter()
        .enumerate()
        .map(|(i, tx)| map_full_transaction(tx, i as u64))
        .collect::<RpcResult<Vec<_>>>()?;
    with_gas(block, BlockTransactions::Full(mapped))
}

fn with_gas(block: &HydratedBlock, transactions: BlockTransactions) -> RpcResult<EthBlock> {
    let (gas_used, gas_limit) = aggregate_gas(block)?;

    debug!(
        "Mapped block {}: {} chunks, {} transactions, gas {}/{}",
        block.header.height,
        block.chunks.len(),
        transactions.len(),
        gas_used,
        gas_limit
    );

    let mut eth_block = EthBlock::from_header(&block.header, transactions)?;
    eth_block.gas_used = Some(encode_quantity(gas_used));
    eth_block.gas_limit = Some(encode_quantity(gas_limit));
    Ok(eth_block)
}
