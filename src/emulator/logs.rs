use serde::{Deserialize, Serialize};

use crate::codec::remove_0x;
use crate::error::{RpcError, RpcResult};

/// Hex characters per 32-byte topic.
const TOPIC_HEX_LEN: usize = 64;

/// EVM log entry as returned inside receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthLog {
    pub log_index: String,
    pub block_number: String,
    pub block_hash: String,
    pub transaction_hash: String,
    pub transaction_index: String,
    pub address: Option<String>,
    pub data: String,
    pub topics: Vec<String>,
    pub removed: bool,
}

/// Topics and data carried by one EVM contract log string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLog {
    pub topics: Vec<String>,
    pub data: String,
}

/// Split a log emitted by the EVM contract.
///
/// The log is hex text: one byte with the topic count N, N 32-byte topics,
/// then the data.
pub fn parse_log(raw: &str) -> RpcResult<ParsedLog> {
    let body = remove_0x(raw);
    if body.len() < 2 {
        return Err(RpcError::validation(format!("log {:?} has no topic count", raw)));
    }
    if body.len() % 2 != 0 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RpcError::validation(format!("log {:?} is not hex", raw)));
    }

    let count = usize::from_str_radix(&body[..2], 16)
        .map_err(|e| RpcError::validation(format!("bad topic count in log: {}", e)))?;
    let topics_end = 2 + count * TOPIC_HEX_LEN;
    if body.len() < topics_end {
        return Err(RpcError::validation(format!(
            "log declares {} topics but holds only {} hex chars after the count",
            count,
            body.len() - 2
        )));
    }

    let topics = (0..count)
        .map(|i| {
            let start = 2 + i * TOPIC_HEX_LEN;
            format!("0x{}", body[start..start + TOPIC_HEX_LEN].to_lowercase())
        })
        .collect();

    Ok(ParsedLog {
        topics,
        data: format!("0x{}", body[topics_end..].to_lowercase()),
    })
}
