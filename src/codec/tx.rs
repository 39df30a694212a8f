use alloy_primitives::U256;
use rlp::Rlp;
use sha3::{Digest, Keccak256};
use tracing::debug;

use crate::error::{RpcError, RpcResult};

/// Decoded legacy signed Ethereum transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvmTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// Recipient address (None for contract creation)
    pub to: Option<[u8; 20]>,
    pub value: U256,
    pub data: Vec<u8>,
    /// Chain ID recovered from `v` (EIP-155)
    pub chain_id: Option<u64>,
    pub v: u64,
    pub r: Vec<u8>,
    pub s: Vec<u8>,
    /// keccak256 of the raw encoding
    pub tx_hash: [u8; 32],
}

impl DecodedEvmTransaction {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// RLP-decode a signed legacy transaction:
/// `[nonce, gasPrice, gasLimit, to, value, data, v, r, s]`.
pub fn decode_signed_transaction(raw_tx: &[u8]) -> RpcResult<DecodedEvmTransaction> {
    let rlp = Rlp::new(raw_tx);

    if !rlp.is_list() {
        return Err(RpcError::validation("transaction RLP is not a list"));
    }

    let item_count = rlp.item_count().map_err(rlp_error)?;
    if item_count != 9 {
        return Err(RpcError::validation(format!(
            "unexpected RLP item count: {} (expected 9)",
            item_count
        )));
    }

    let nonce: u64 = rlp.val_at(0).map_err(rlp_error)?;
    let gas_price = u256_at(&rlp, 1)?;
    let gas_limit: u64 = rlp.val_at(2).map_err(rlp_error)?;

    let to_bytes = bytes_at(&rlp, 3)?;
    let to = match to_bytes.len() {
        0 => None,
        20 => {
            let mut addr = [0u8; 20];
            addr.copy_from_slice(to_bytes);
            Some(addr)
        }
        n => {
            return Err(RpcError::validation(format!(
                "transaction recipient must be 0 or 20 bytes, got {}",
                n
            )))
        }
    };

    let value = u256_at(&rlp, 4)?;
    let data = bytes_at(&rlp, 5)?.to_vec();

    let v: u64 = rlp.val_at(6).map_err(rlp_error)?;
    let r = bytes_at(&rlp, 7)?.to_vec();
    let s = bytes_at(&rlp, 8)?.to_vec();

    // EIP-155 chain ID extraction
    let chain_id = if v >= 35 { Some((v - 35) / 2) } else { None };

    let mut tx_hash = [0u8; 32];
    tx_hash.copy_from_slice(&Keccak256::digest(raw_tx));

    debug!(
        "Decoded signed tx: nonce={}, to={:?}, data_len={}",
        nonce,
        to.map(hex::encode),
        data.len()
    );

    Ok(DecodedEvmTransaction {
        nonce,
        gas_price,
        gas_limit,
        to,
        value,
        data,
        chain_id,
        v,
        r,
        s,
        tx_hash,
    })
}

fn bytes_at<'a>(rlp: &Rlp<'a>, index: usize) -> RpcResult<&'a [u8]> {
    rlp.at(index)
        .and_then(|item| item.data())
        .map_err(rlp_error)
}

fn u256_at(rlp: &Rlp, index: usize) -> RpcResult<U256> {
    let bytes = bytes_at(rlp, index)?;
    U256::try_from_be_slice(bytes)
        .ok_or_else(|| RpcError::validation(format!("RLP item {} exceeds 256 bits", index)))
}

fn rlp_error(err: rlp::DecoderError) -> RpcError {
    RpcError::validation(format!("RLP parse error: {}", err))
}
