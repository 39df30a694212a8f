//! NEAR RPC collaborators.
//!
//! Everything that talks to the upstream chain goes through the [`NearRpc`]
//! and [`NearAccount`] traits so the hydrator and handlers can be driven by
//! an in-memory double in tests.

pub mod account;
pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::RpcResult;

pub use account::{
    AccountProvider, FunctionCallRequest, NearAccount, RpcAccount, StaticKeyStore,
    TransactionSigner,
};
pub use client::NearClient;
pub use types::*;

/// Upstream NEAR RPC operations this adapter relies on.
#[async_trait]
pub trait NearRpc: Send + Sync {
    async fn status(&self) -> RpcResult<StatusResponse>;

    async fn block(&self, reference: BlockReference) -> RpcResult<BlockView>;

    /// Fetch a chunk by its base58 hash.
    async fn chunk(&self, chunk_hash: &str) -> RpcResult<ChunkView>;

    /// Fetch the final outcome of a transaction sent by `account_id`.
    async fn tx_status(&self, tx_hash: &str, account_id: &str)
        -> RpcResult<FinalExecutionOutcomeView>;

    /// Raw `query` with a path such as `call/<account>/<method>` and base58 data.
    async fn query(&self, path: &str, data: &str) -> RpcResult<QueryResponse>;

    /// Submit a signed transaction and wait for its final outcome.
    async fn broadcast_tx_commit(&self, signed_tx: &[u8]) -> RpcResult<FinalExecutionOutcomeView>;
}
