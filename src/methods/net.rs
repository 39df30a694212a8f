use serde_json::Value;
use tracing::{debug, warn};

use super::RpcContext;
use crate::error::RpcResult;

/// Handler for net_version
/// Returns the network version (chain ID as decimal string).
pub async fn version(ctx: &RpcContext) -> RpcResult<Value> {
    let version = ctx.config.chain_id.to_string();
    debug!("net_version -> {}", version);
    Ok(Value::String(version))
}

/// Handler for net_listening
/// True while the NEAR node answers `status`.
pub async fn listening(ctx: &RpcContext) -> RpcResult<Value> {
    match ctx.rpc.status().await {
        Ok(_) => Ok(Value::Bool(true)),
        Err(e) => {
            warn!("NEAR node is not answering status: {}", e);
            Ok(Value::Bool(false))
        }
    }
}

/// Handler for net_peerCount
/// The only peer is the upstream NEAR node.
pub async fn peer_count() -> RpcResult<Value> {
    Ok(Value::String("0x1".to_string()))
}
