use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::types::*;
use super::NearRpc;
use crate::codec::encode_base64;
use crate::error::{RpcError, RpcResult};

/// Client wrapper for NEAR JSON-RPC calls.
#[derive(Clone)]
pub struct NearClient {
    http_client: Client,
    rpc_url: String,
}

impl NearClient {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            rpc_url: rpc_url.to_string(),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Send a JSON-RPC request to the NEAR RPC endpoint.
    async fn send_request(&self, request: &NearRpcRequest) -> Result<Value> {
        debug!("Sending NEAR RPC request: method={}", request.method);

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(request)
            .send()
            .await
            .context("Failed to send request to NEAR RPC")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("NEAR RPC returned HTTP {}: {}", status, body);
            return Err(anyhow!("NEAR RPC HTTP error: {} - {}", status, body));
        }

        let rpc_response: NearRpcResponse = response
            .json()
            .await
            .context("Failed to parse NEAR RPC response")?;

        if let Some(err) = rpc_response.error {
            error!(
                "NEAR RPC error: code={}, message={}, data={:?}",
                err.code, err.message, err.data
            );
            return Err(anyhow!(
                "NEAR RPC error {}: {}{}",
                err.code,
                err.message,
                err.data.map(|d| format!(" ({})", d)).unwrap_or_default()
            ));
        }

        rpc_response
            .result
            .ok_or_else(|| anyhow!("No result in {} response", request.method))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        let request = NearRpcRequest::new(method, params);
        let result = self
            .send_request(&request)
            .await
            .map_err(|e| RpcError::Upstream(format!("{:#}", e)))?;
        serde_json::from_value(result)
            .with_context(|| format!("Failed to parse {} response", method))
            .map_err(|e| RpcError::Upstream(format!("{:#}", e)))
    }
}

#[async_trait]
impl NearRpc for NearClient {
    async fn status(&self) -> RpcResult<StatusResponse> {
        self.call("status", json!([])).await
    }

    async fn block(&self, reference: BlockReference) -> RpcResult<BlockView> {
        self.call("block", reference.to_params()).await
    }

    async fn chunk(&self, chunk_hash: &str) -> RpcResult<ChunkView> {
        self.call("chunk", json!({ "chunk_id": chunk_hash })).await
    }

    async fn tx_status(
        &self,
        tx_hash: &str,
        account_id: &str,
    ) -> RpcResult<FinalExecutionOutcomeView> {
        self.call("tx", json!([tx_hash, account_id])).await
    }

    async fn query(&self, path: &str, data: &str) -> RpcResult<QueryResponse> {
        let raw: Value = self.call("query", json!([path, data])).await?;
        // View failures come back as a successful RPC call carrying `error`.
        if let Some(message) = raw.get("error").and_then(Value::as_str) {
            return Err(RpcError::Upstream(format!(
                "query {} failed: {}",
                path, message
            )));
        }
        Ok(serde_json::from_value(raw)?)
    }

    async fn broadcast_tx_commit(&self, signed_tx: &[u8]) -> RpcResult<FinalExecutionOutcomeView> {
        self.call("broadcast_tx_commit", json!([encode_base64(signed_tx)]))
            .await
    }
}
