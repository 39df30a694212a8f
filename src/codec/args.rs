//! Fixed-layout argument buffers understood by the EVM contract.
//!
//! Layouts (all integers big-endian unless stated):
//!
//! ```text
//! call:     address(20) | len(4, little-endian) | input(len)
//! transfer: address(20) | amount(32)
//! withdraw: len(4, little-endian) | account_id(len) | amount(32)
//! storage:  address(20) | key(32)
//! ```

use alloy_primitives::U256;

use crate::error::{RpcError, RpcResult};

pub const ADDRESS_LEN: usize = 20;
pub const WORD_LEN: usize = 32;
const LEN_PREFIX: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArgs {
    pub address: [u8; ADDRESS_LEN],
    pub input: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferArgs {
    pub address: [u8; ADDRESS_LEN],
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawArgs {
    pub account_id: String,
    pub amount: U256,
}

pub fn encode_call_args(address: &[u8; ADDRESS_LEN], input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ADDRESS_LEN + LEN_PREFIX + input.len());
    out.extend_from_slice(address);
    out.extend_from_slice(&(input.len() as u32).to_le_bytes());
    out.extend_from_slice(input);
    out
}

pub fn decode_call_args(bytes: &[u8]) -> RpcResult<CallArgs> {
    if bytes.len() < ADDRESS_LEN + LEN_PREFIX {
        return Err(RpcError::validation(format!(
            "call args too short: {} bytes",
            bytes.len()
        )));
    }
    let (address, rest) = split_address(bytes);
    let (input, trailing) = read_length_prefixed(rest, "call input")?;
    if !trailing.is_empty() {
        return Err(RpcError::validation(format!(
            "call args carry {} trailing bytes",
            trailing.len()
        )));
    }
    Ok(CallArgs {
        address,
        input: input.to_vec(),
    })
}

pub fn encode_transfer_args(address: &[u8; ADDRESS_LEN], amount: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(ADDRESS_LEN + WORD_LEN);
    out.extend_from_slice(address);
    out.extend_from_slice(&amount.to_be_bytes::<WORD_LEN>());
    out
}

pub fn decode_transfer_args(bytes: &[u8]) -> RpcResult<TransferArgs> {
    if bytes.len() != ADDRESS_LEN + WORD_LEN {
        return Err(RpcError::validation(format!(
            "transfer args must be {} bytes, got {}",
            ADDRESS_LEN + WORD_LEN,
            bytes.len()
        )));
    }
    let (address, rest) = split_address(bytes);
    Ok(TransferArgs {
        address,
        amount: U256::from_be_slice(rest),
    })
}

pub fn encode_withdraw_args(account_id: &str, amount: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(LEN_PREFIX + account_id.len() + WORD_LEN);
    out.extend_from_slice(&(account_id.len() as u32).to_le_bytes());
    out.extend_from_slice(account_id.as_bytes());
    out.extend_from_slice(&amount.to_be_bytes::<WORD_LEN>());
    out
}

pub fn decode_withdraw_args(bytes: &[u8]) -> RpcResult<WithdrawArgs> {
    let (account, rest) = read_length_prefixed(bytes, "withdraw account")?;
    if rest.len() != WORD_LEN {
        return Err(RpcError::validation(format!(
            "withdraw amount must be {} bytes, got {}",
            WORD_LEN,
            rest.len()
        )));
    }
    let account_id = String::from_utf8(account.to_vec())
        .map_err(|_| RpcError::validation("withdraw account is not utf-8"))?;
    Ok(WithdrawArgs {
        account_id,
        amount: U256::from_be_slice(rest),
    })
}

/// Args for `get_storage_at`.
pub fn encode_storage_args(address: &[u8; ADDRESS_LEN], key: &[u8; WORD_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ADDRESS_LEN + WORD_LEN);
    out.extend_from_slice(address);
    out.extend_from_slice(key);
    out
}

fn split_address(bytes: &[u8]) -> ([u8; ADDRESS_LEN], &[u8]) {
    let mut address = [0u8; ADDRESS_LEN];
    address.copy_from_slice(&bytes[..ADDRESS_LEN]);
    (address, &bytes[ADDRESS_LEN..])
}

fn read_length_prefixed<'a>(bytes: &'a [u8], what: &str) -> RpcResult<(&'a [u8], &'a [u8])> {
    if bytes.len() < LEN_PREFIX {
        return Err(RpcError::validation(format!("{} is missing its length", what)));
    }
    let mut len_bytes = [0u8; LEN_PREFIX];
    len_bytes.copy_from_slice(&bytes[..LEN_PREFIX]);
    let len = u32::from_le_bytes(len_bytes) as usize;
    let body = &bytes[LEN_PREFIX..];
    if body.len() < len {
        return Err(RpcError::validation(format!(
            "{} declares {} bytes but only {} remain",
            what,
            len,
            body.len()
        )));
    }
    Ok(body.split_at(len))
}
