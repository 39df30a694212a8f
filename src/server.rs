use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::future::{self, Either, Ready};
use http::{header, Method};
use jsonrpsee::server::middleware::rpc::{RpcServiceBuilder, RpcServiceT};
use jsonrpsee::server::{MethodResponse, RpcModule, Server, ServerHandle};
use jsonrpsee::types::{ErrorObjectOwned, Params, Request};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::RpcError;
use crate::methods::RpcContext;
use crate::near::{AccountProvider, NearClient, NearRpc, StaticKeyStore};
use crate::router::{EthMethod, Router};

/// Start the JSON-RPC server.
pub async fn start_server(config: Config) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.rpc_port));

    info!("Starting NEAR Web3 RPC server on {}", addr);
    info!("Chain ID: {} ({})", config.chain_id, config.chain_id_hex());

    let client = NearClient::new(&config.near_rpc_url);
    info!("NEAR RPC: {} ({})", client.rpc_url(), config.near_network_id);
    let rpc: Arc<dyn NearRpc> = Arc::new(client);

    // Check NEAR RPC health
    match rpc.status().await {
        Ok(status) => {
            info!(
                "NEAR node: chain={}, latest block {}",
                status.chain_id, status.sync_info.latest_block_height
            );
        }
        Err(e) => {
            warn!("Could not reach NEAR RPC (will retry on requests): {}", e);
        }
    }

    // Signing is delegated to an external signer; without one, local
    // accounts can be listed but not used for eth_sendTransaction.
    let accounts: Arc<dyn AccountProvider> = Arc::new(StaticKeyStore::from_ids(
        &config.near_accounts,
        rpc.clone(),
        None,
    ));
    info!("Local accounts: {}", config.near_accounts.len());

    let router = Router::new(Arc::new(RpcContext::new(config, rpc, accounts)));
    let (local_addr, handle) = serve(router, addr).await?;

    info!("RPC server listening on http://{}", local_addr);

    // Wait for the server to finish (runs until shutdown signal)
    handle.stopped().await;

    info!("RPC server stopped");
    Ok(())
}

/// Bind the HTTP endpoint and start answering requests with `router`.
///
/// Returns the bound address, which differs from `addr` when port 0 is asked
/// for, and the handle that stops the server.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<(SocketAddr, ServerHandle)> {
    let module = build_module(router)?;

    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE]);
    let http_middleware = tower::ServiceBuilder::new().layer(cors);
    let rpc_middleware = RpcServiceBuilder::new().layer_fn(|service| UnknownMethodFallback { service });

    let server = Server::builder()
        .set_http_middleware(http_middleware)
        .set_rpc_middleware(rpc_middleware)
        .build(addr)
        .await
        .map_err(|e| anyhow!("Failed to bind server to {}: {}", addr, e))?;
    let local_addr = server
        .local_addr()
        .context("Failed to read the bound server address")?;

    Ok((local_addr, server.start(module)))
}

/// Answers names outside the method table with the unknown-method error,
/// which names the method and echoes its params. Table names pass through.
#[derive(Clone)]
pub struct UnknownMethodFallback<S> {
    service: S,
}

impl<'a, S> RpcServiceT<'a> for UnknownMethodFallback<S>
where
    S: RpcServiceT<'a> + Send + Sync,
{
    type Future = Either<S::Future, Ready<MethodResponse>>;

    fn call(&self, request: Request<'a>) -> Self::Future {
        if EthMethod::from_name(request.method_name()).is_some() {
            return Either::Left(self.service.call(request));
        }

        let params = match request.params().parse::<Option<Value>>() {
            Ok(Some(Value::Array(values))) => values,
            Ok(Some(other)) => vec![other],
            Ok(None) | Err(_) => Vec::new(),
        };
        warn!(
            "Unknown method {} called with {} params",
            request.method_name(),
            params.len()
        );
        let error = RpcError::unknown(request.method_name(), &params);
        Either::Right(future::ready(MethodResponse::error(
            request.id(),
            ErrorObjectOwned::from(error),
        )))
    }
}

/// Register every method of the table on a jsonrpsee module.
///
/// Unsupported methods are registered too so clients get the dedicated
/// error instead of jsonrpsee's generic "method not found".
pub fn build_module(router: Router) -> Result<RpcModule<Router>> {
    let mut module = RpcModule::new(router);

    for method in EthMethod::ALL {
        module.register_async_method(method.name(), move |params, router, _| async move {
            let params = positional(&params)?;
            router
                .call(method, &params)
                .await
                .map_err(ErrorObjectOwned::from)
        })?;
    }

    info!("Registered {} RPC methods", EthMethod::ALL.len());
    Ok(module)
}

fn positional(params: &Params<'_>) -> Result<Vec<Value>, ErrorObjectOwned> {
    params
        .parse::<Option<Vec<Value>>>()
        .map(Option::unwrap_or_default)
        .map_err(|e| RpcError::validation(format!("params must be a positional array: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockNear;
    use serde_json::json;

    fn module() -> RpcModule<Router> {
        let rpc: Arc<dyn NearRpc> = Arc::new(MockNear::new().with_status(12, false));
        let accounts: Arc<dyn AccountProvider> = Arc::new(StaticKeyStore::default());
        let router = Router::new(Arc::new(RpcContext::new(Config::default(), rpc, accounts)));
        build_module(router).unwrap()
    }

    #[tokio::test]
    async fn test_module_answers_supported_method() {
        let module = module();
        let height: String = module.call("eth_blockNumber", Vec::<Value>::new()).await.unwrap();
        assert_eq!(height, "0xc");
    }

    #[tokio::test]
    async fn test_module_registers_whole_table() {
        let module = module();
        let names: Vec<&str> = module.method_names().collect();
        for method in EthMethod::ALL {
            assert!(names.contains(&method.name()), "{} missing", method.name());
        }

        let unsupported = module
            .call::<_, Value>("eth_getLogs", vec![json!({})])
            .await;
        assert!(unsupported.is_err());
    }

    async fn post(addr: SocketAddr, body: Value) -> Value {
        reqwest::Client::new()
            .post(format!("http://{}", addr))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_server_names_unknown_methods() {
        let rpc: Arc<dyn NearRpc> = Arc::new(MockNear::new().with_status(12, false));
        let accounts: Arc<dyn AccountProvider> = Arc::new(StaticKeyStore::default());
        let router = Router::new(Arc::new(RpcContext::new(Config::default(), rpc, accounts)));
        let (addr, handle) = serve(router, SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();

        let unknown = post(
            addr,
            json!({"jsonrpc": "2.0", "id": 1, "method": "eth_doesNotExist", "params": ["0x1", false]}),
        )
        .await;
        assert_eq!(unknown["id"], 1);
        assert_eq!(unknown["error"]["code"], -32601);
        assert!(unknown["error"]["message"]
            .as_str()
            .unwrap()
            .contains("eth_doesNotExist"));
        assert_eq!(unknown["error"]["data"], json!(["0x1", false]));

        let unsupported = post(
            addr,
            json!({"jsonrpc": "2.0", "id": 2, "method": "eth_sendRawTransaction", "params": ["0x00"]}),
        )
        .await;
        assert_eq!(unsupported["error"]["code"], -32004);

        let known = post(
            addr,
            json!({"jsonrpc": "2.0", "id": 3, "method": "eth_blockNumber", "params": []}),
        )
        .await;
        assert_eq!(known["result"], "0xc");

        handle.stop().unwrap();
        handle.stopped().await;
    }
}
