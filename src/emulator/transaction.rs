use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{
    base58_to_hex, decode_base64, decode_call_args, decode_signed_transaction,
    decode_transfer_args, decode_withdraw_args, derive_address_hex, encode_hex, encode_quantity,
    encode_quantity_u256, CompositeHash,
};
use crate::error::{RpcError, RpcResult};
use crate::hydrator::{FullTransaction, HydratedTransaction};
use crate::near::SignedTransactionView;

/// Placeholder signature component (32 zero bytes).
pub const EMPTY_SIGNATURE_WORD: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// EVM-formatted transaction object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthTransaction {
    /// Composite `0x<hash>:<signer>` key
    pub hash: String,
    pub nonce: String,
    pub block_hash: String,
    pub block_number: String,
    pub transaction_index: String,
    pub from: String,
    /// None for contract creation
    pub to: Option<String>,
    pub gas: String,
    pub gas_price: String,
    pub value: String,
    pub input: String,
    pub v: String,
    pub r: String,
    pub s: String,
}

/// What a NEAR transaction means in EVM terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSummary {
    /// Contract method invoked, if the transaction carries a function call
    pub method: Option<String>,
    pub to: Option<String>,
    pub value: U256,
    pub input: String,
    /// Attached gas of the function call
    pub gas: u64,
    pub creates_contract: bool,
}

/// Work out destination, value and input from a transaction's actions.
///
/// The value defaults to the sum of attached deposits. A transaction without
/// actions has no defined value and is rejected.
pub fn summarize_call(tx: &SignedTransactionView) -> RpcResult<CallSummary> {
    if tx.actions.is_empty() {
        return Err(RpcError::validation(format!(
            "transaction {} has no actions",
            tx.hash
        )));
    }

    let deposits = attached_deposit(tx)?;

    let call = match tx.function_call() {
        Some(call) => call,
        None => {
            return Ok(CallSummary {
                method: None,
                to: Some(derive_address_hex(&tx.receiver_id)?),
                value: deposits,
                input: "0x".to_string(),
                gas: 0,
                creates_contract: false,
            })
        }
    };

    let args = decode_base64(&call.args)?;
    let mut summary = CallSummary {
        method: Some(call.method_name.clone()),
        to: None,
        value: deposits,
        input: "0x".to_string(),
        gas: call.gas,
        creates_contract: false,
    };

    match call.method_name.as_str() {
        "call" => {
            let decoded = decode_call_args(&args)?;
            summary.to = Some(encode_hex(&decoded.address));
            summary.input = encode_hex(&decoded.input);
        }
        "deploy_code" => {
            summary.input = encode_hex(&args);
            summary.creates_contract = true;
        }
        "raw_call" => {
            let decoded = decode_signed_transaction(&args)?;
            summary.to = decoded.to.map(|a| encode_hex(&a));
            summary.value = decoded.value;
            summary.input = encode_hex(&decoded.data);
            summary.creates_contract = decoded.is_contract_creation();
        }
        "deposit" => {
            summary.to = Some(derive_address_hex(&tx.signer_id)?);
        }
        "transfer" => {
            let decoded = decode_transfer_args(&args)?;
            summary.to = Some(encode_hex(&decoded.address));
            summary.value = decoded.amount;
        }
        "withdraw" => {
            let decoded = decode_withdraw_args(&args)?;
            summary.to = Some(derive_address_hex(&decoded.account_id)?);
            summary.value = decoded.amount;
        }
        other => {
            debug!("Unrecognised EVM method {}, passing args through", other);
            summary.to = Some(derive_address_hex(&tx.receiver_id)?);
            summary.input = encode_hex(&args);
        }
    }

    Ok(summary)
}

/// Sum of deposits attached across all actions.
fn attached_deposit(tx: &SignedTransactionView) -> RpcResult<U256> {
    tx.actions
        .iter()
        .filter_map(|a| a.deposit())
        .try_fold(U256::ZERO, |sum, deposit| {
            let amount = parse_decimal(deposit, "deposit")?;
            sum.checked_add(U256::from(amount))
                .ok_or_else(|| RpcError::validation("attached deposits overflow"))
        })
}

/// Parse a decimal u128 as sent by the NEAR RPC (balances, gas prices).
pub fn parse_decimal(value: &str, what: &str) -> RpcResult<u128> {
    value
        .parse::<u128>()
        .map_err(|e| RpcError::Upstream(format!("malformed {} {:?}: {}", what, value, e)))
}

/// Map a hydrated NEAR transaction to its EVM shape.
pub fn map_transaction(tx: &HydratedTransaction, tx_index: u64) -> RpcResult<EthTransaction> {
    map_signed(&tx.tx, &tx.block_hash, tx.block_height, &tx.gas_price, tx_index)
}

/// Map a transaction merged with its final outcome.
///
/// The signed transaction and block hash are taken from the outcome; height
/// and gas price from the block the stub was listed in.
pub fn map_full_transaction(full: &FullTransaction, tx_index: u64) -> RpcResult<EthTransaction> {
    let signed = &full.outcome.transaction;
    if signed.hash != full.tx.tx.hash || signed.signer_id != full.tx.tx.signer_id {
        return Err(RpcError::Upstream(format!(
            "outcome of {} by {} describes {} by {}",
            full.tx.tx.hash, full.tx.tx.signer_id, signed.hash, signed.signer_id
        )));
    }
    map_signed(
        signed,
        full.outcome.block_hash(),
        full.tx.block_height,
        &full.tx.gas_price,
        tx_index,
    )
}

fn map_signed(
    tx: &SignedTransactionView,
    block_hash: &str,
    block_height: u64,
    gas_price: &str,
    tx_index: u64,
) -> RpcResult<EthTransaction> {
    let summary = summarize_call(tx)?;

    Ok(EthTransaction {
        hash: CompositeHash::new(&tx.hash, &tx.signer_id).encode()?,
        nonce: encode_quantity(tx.nonce),
        block_hash: base58_to_hex(block_hash)?,
        block_number: encode_quantity(block_height),
        transaction_index: encode_quantity(tx_index),
        from: derive_address_hex(&tx.signer_id)?,
        to: summary.to,
        gas: encode_quantity(summary.gas),
        gas_price: encode_quantity(parse_decimal(gas_price, "gas price")?),
        value: encode_quantity_u256(summary.value),
        input: summary.input,
        v: "0x0".to_string(),
        r: EMPTY_SIGNATURE_WORD.to_string(),
        s: EMPTY_SIGNATURE_WORD.to_string(),
    })
}
