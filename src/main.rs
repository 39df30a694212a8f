//! NEAR Web3 RPC server
//!
//! Entry point for the server that answers Ethereum JSON-RPC from NEAR and
//! its EVM contract. Loads configuration from environment/.env file and
//! starts the JSON-RPC server on the configured port.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use near_web3_rpc::config::Config;
use near_web3_rpc::server::start_server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    info!("=== NEAR Web3 RPC Server ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Chain ID: {} ({})", config.chain_id, config.chain_id_hex());
    info!("  RPC Port: {}", config.rpc_port);
    info!("  NEAR RPC: {}", config.near_rpc_url);
    info!("  EVM contract: {}", config.evm_account_id);
    info!("  Request timeout: {}s", config.request_timeout_secs);

    start_server(config).await?;

    Ok(())
}
