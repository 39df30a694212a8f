//! Expands NEAR block summaries into fully populated records.
//!
//! A block goes through `summary -> chunks fetched -> transactions flattened`
//! in [`Hydrator::hydrate_block`], and optionally `-> outcomes fetched` in
//! [`Hydrator::hydrate_all_transactions`]. Fetches inside one stage are
//! issued together and joined; a failure in any of them fails the stage with
//! every collected error.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::codec::CompositeHash;
use crate::error::{RpcError, RpcResult};
use crate::near::{
    BlockHeaderView, BlockView, ChunkHeaderView, FinalExecutionOutcomeView, NearRpc,
    SignedTransactionView,
};

/// A chunk with its transactions and the context of its block.
#[derive(Debug, Clone)]
pub struct HydratedChunk {
    pub chunk_hash: String,
    pub transactions: Vec<SignedTransactionView>,
    pub block_hash: String,
    pub block_height: u64,
    pub gas_price: String,
}

/// A transaction stub tagged with the block it was included in.
#[derive(Debug, Clone)]
pub struct HydratedTransaction {
    pub tx: SignedTransactionView,
    pub block_hash: String,
    pub block_height: u64,
    pub gas_price: String,
}

impl HydratedTransaction {
    pub fn key(&self) -> CompositeHash {
        CompositeHash::new(&self.tx.hash, &self.tx.signer_id)
    }
}

/// A block whose chunks have been fetched and flattened.
#[derive(Debug, Clone)]
pub struct HydratedBlock {
    pub header: BlockHeaderView,
    pub chunks: Vec<ChunkHeaderView>,
    /// Chunk order, then order within the chunk.
    pub transactions: Vec<HydratedTransaction>,
}

impl HydratedBlock {
    /// Position of a transaction within the block.
    pub fn position(&self, key: &CompositeHash) -> Option<usize> {
        self.transactions
            .iter()
            .position(|t| t.tx.hash == key.tx_hash && t.tx.signer_id == key.account_id)
    }
}

/// A transaction stub merged with its final outcome.
#[derive(Debug, Clone)]
pub struct FullTransaction {
    pub tx: HydratedTransaction,
    pub outcome: FinalExecutionOutcomeView,
}

#[derive(Clone)]
pub struct Hydrator {
    rpc: Arc<dyn NearRpc>,
}

impl Hydrator {
    pub fn new(rpc: Arc<dyn NearRpc>) -> Self {
        Self { rpc }
    }

    /// Fetch the transactions of one chunk.
    ///
    /// Chunks whose transaction root is the empty sentinel are answered
    /// without a network call.
    pub async fn hydrate_chunk(
        &self,
        chunk: &ChunkHeaderView,
        header: &BlockHeaderView,
    ) -> RpcResult<HydratedChunk> {
        let transactions = if chunk.has_transactions() {
            debug!("Fetching chunk {} of block {}", chunk.chunk_hash, header.height);
            self.rpc.chunk(&chunk.chunk_hash).await?.transactions
        } else {
            Vec::new()
        };

        Ok(HydratedChunk {
            chunk_hash: chunk.chunk_hash.clone(),
            transactions,
            block_hash: header.hash.clone(),
            block_height: header.height,
            gas_price: header.gas_price.clone(),
        })
    }

    /// Fetch every chunk of the block concurrently and flatten their
    /// transactions in chunk order.
    pub async fn hydrate_block(&self, block: BlockView) -> RpcResult<HydratedBlock> {
        let BlockView { header, chunks, .. } = block;

        let fetches = chunks
            .iter()
            .map(|chunk| self.hydrate_chunk(chunk, &header));
        let hydrated = collect_all(join_all(fetches).await)?;

        let transactions = hydrated
            .into_iter()
            .flat_map(|chunk| {
                let HydratedChunk {
                    transactions,
                    block_hash,
                    block_height,
                    gas_price,
                    ..
                } = chunk;
                transactions.into_iter().map(move |tx| HydratedTransaction {
                    tx,
                    block_hash: block_hash.clone(),
                    block_height,
                    gas_price: gas_price.clone(),
                })
            })
            .collect::<Vec<_>>();

        debug!(
            "Hydrated block {}: {} chunks, {} transactions",
            header.height,
            chunks.len(),
            transactions.len()
        );

        Ok(HydratedBlock {
            header,
            chunks,
            transactions,
        })
    }

    /// Fetch the outcome of the transaction at `index` of a hydrated block.
    pub async fn hydrate_transaction(
        &self,
        block: &HydratedBlock,
        index: usize,
    ) -> RpcResult<FullTransaction> {
        let tx = block.transactions.get(index).ok_or_else(|| {
            RpcError::validation(format!(
                "transaction index {} out of range for block {} ({} transactions)",
                index,
                block.header.height,
                block.transactions.len()
            ))
        })?;

        let key = tx.key();
        let outcome = self.rpc.tx_status(&key.tx_hash, &key.account_id).await?;

        Ok(FullTransaction {
            tx: tx.clone(),
            outcome,
        })
    }

    /// Fetch the outcomes of every transaction of a block concurrently.
    pub async fn hydrate_all_transactions(
        &self,
        block: &HydratedBlock,
    ) -> RpcResult<Vec<FullTransaction>> {
        let fetches = (0..block.transactions.len()).map(|i| self.hydrate_transaction(block, i));
        collect_all(join_all(fetches).await)
    }
}

/// All successes in order, or every failure at once.
fn collect_all<T>(results: Vec<RpcResult<T>>) -> RpcResult<Vec<T>> {
    let mut values = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        warn!("{} of {} hydration fetches failed", errors.len(), values.len() + errors.len());
        Err(RpcError::AggregateHydration(errors))
    }
}
