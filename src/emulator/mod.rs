//! Maps hydrated NEAR records to EVM-shaped JSON-RPC objects.

pub mod block;
pub mod logs;
pub mod receipt;
pub mod sync;
pub mod transaction;

pub use block::{
    aggregate_gas, map_block, map_block_full, transaction_hashes, BlockTransactions, EthBlock,
};
pub use logs::{parse_log, EthLog, ParsedLog};
pub use receipt::{map_receipt, EthReceipt};
pub use sync::{map_sync_status, SyncStatus};
pub use transaction::{
    map_full_transaction, map_transaction, parse_decimal, summarize_call, CallSummary,
    EthTransaction,
};
