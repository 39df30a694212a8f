use serde::{Deserialize, Serialize};

use super::logs::{parse_log, EthLog};
use super::transaction::summarize_call;
use crate::codec::{
    base58_to_hex, decode_base64, derive_address_hex, encode_hex, encode_quantity, CompositeHash,
};
use crate::error::{RpcError, RpcResult};
use crate::near::{BlockHeaderView, FinalExecutionOutcomeView};

/// EVM-formatted transaction receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthReceipt {
    pub transaction_hash: String,
    pub transaction_index: String,
    pub block_hash: String,
    pub block_number: String,
    pub from: String,
    pub to: Option<String>,
    pub cumulative_gas_used: String,
    pub gas_used: String,
    /// Set only when the transaction created a contract
    pub contract_address: Option<String>,
    pub logs: Vec<EthLog>,
    pub logs_bloom: String,
    /// 0x1 on success, 0x0 on failure
    pub status: String,
}

/// Map a final execution outcome to a receipt.
///
/// `header` is the block the transaction was included in.
pub fn map_receipt(
    header: &BlockHeaderView,
    outcome: &FinalExecutionOutcomeView,
    tx_index: u64,
) -> RpcResult<EthReceipt> {
    let tx = &outcome.transaction;
    let summary = summarize_call(tx)?;
    let transaction_hash = CompositeHash::new(&tx.hash, &tx.signer_id).encode()?;
    let block_hash = base58_to_hex(&header.hash)?;
    let block_number = encode_quantity(header.height);
    let transaction_index = encode_quantity(tx_index);

    let contract_address = match outcome.success_value() {
        Some(payload) if summary.creates_contract && !payload.is_empty() => {
            Some(created_address(payload)?)
        }
        _ => None,
    };

    let log_address = summary.to.clone().or_else(|| contract_address.clone());
    let logs = outcome
        .logs()
        .enumerate()
        .map(|(i, raw)| {
            let parsed = parse_log(raw)?;
            Ok(EthLog {
                log_index: encode_quantity(i as u64),
                block_number: block_number.clone(),
                block_hash: block_hash.clone(),
                transaction_hash: transaction_hash.clone(),
                transaction_index: transaction_index.clone(),
                address: log_address.clone(),
                data: parsed.data,
                topics: parsed.topics,
                removed: false,
            })
        })
        .collect::<RpcResult<Vec<_>>>()?;

    let gas_used = encode_quantity(outcome.gas_burnt());
    let status = if outcome.success_value().is_some() { "0x1" } else { "0x0" };

    Ok(EthReceipt {
        transaction_hash,
        transaction_index,
        block_hash,
        block_number,
        from: derive_address_hex(&tx.signer_id)?,
        to: summary.to,
        cumulative_gas_used: gas_used.clone(),
        gas_used,
        contract_address,
        logs,
        logs_bloom: format!("0x{}", "0".repeat(512)),
        status: status.to_string(),
    })
}

/// The deploy result payload is the 20-byte address of the new contract.
fn created_address(payload: &str) -> RpcResult<String> {
    let bytes = decode_base64(payload)?;
    if bytes.len() != 20 {
        return Err(RpcError::Upstream(format!(
            "contract creation returned {} bytes, expected a 20-byte address",
            bytes.len()
        )));
    }
    Ok(encode_hex(&bytes))
}
