use serde_json::Value;
use sha3::{Digest, Keccak256};
use tracing::debug;

use super::params::require_data;
use crate::codec::encode_hex;
use crate::error::RpcResult;

/// Handler for web3_clientVersion
/// Returns the client version string.
pub async fn client_version() -> RpcResult<Value> {
    let version = format!("NearWeb3Rpc/{}", env!("CARGO_PKG_VERSION"));
    debug!("web3_clientVersion -> {}", version);
    Ok(Value::String(version))
}

/// Handler for web3_sha3
/// Returns the Keccak-256 hash of the given data.
pub async fn sha3(params: &[Value]) -> RpcResult<Value> {
    let data = require_data(params, 0, "web3_sha3")?;
    let result = encode_hex(&Keccak256::digest(&data));

    debug!("web3_sha3: input_len={} -> {}", data.len(), result);
    Ok(Value::String(result))
}
