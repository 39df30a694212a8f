use std::str::FromStr;

use super::address::is_valid_account_id;
use super::hex::{base58_to_hex, hex_to_base58, remove_0x};
use crate::error::{RpcError, RpcResult};

/// Transaction key exposed to Ethereum clients: `0x<hex hash>:<signer>`.
///
/// NEAR transaction hashes are only unique per signer, so the signer travels
/// with the hash and both halves are needed to look the outcome up again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeHash {
    /// Base58 NEAR transaction hash
    pub tx_hash: String,
    pub account_id: String,
}

impl CompositeHash {
    pub fn new(tx_hash: &str, account_id: &str) -> Self {
        Self {
            tx_hash: tx_hash.to_string(),
            account_id: account_id.to_string(),
        }
    }

    /// Render as `0x<hex>:<account>`.
    pub fn encode(&self) -> RpcResult<String> {
        Ok(format!("{}:{}", base58_to_hex(&self.tx_hash)?, self.account_id))
    }
}

impl FromStr for CompositeHash {
    type Err = RpcError;

    fn from_str(s: &str) -> RpcResult<Self> {
        let (hash, account_id) = s.split_once(':').ok_or_else(|| {
            RpcError::validation(format!(
                "transaction hash {:?} must have the form <hash>:<account>",
                s
            ))
        })?;
        if remove_0x(hash).len() != 64 {
            return Err(RpcError::validation(format!(
                "transaction hash {:?} is not 32 bytes",
                hash
            )));
        }
        if !is_valid_account_id(account_id) {
            return Err(RpcError::validation(format!(
                "invalid signer account in transaction hash: {:?}",
                account_id
            )));
        }
        Ok(Self {
            tx_hash: hex_to_base58(hash)?,
            account_id: account_id.to_string(),
        })
    }
}
