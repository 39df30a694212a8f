//! Handlers for the supported `eth_*`, `net_*` and `web3_*` methods.

pub mod eth;
pub mod net;
pub mod params;
pub mod web3;

use std::sync::Arc;

use crate::config::Config;
use crate::hydrator::Hydrator;
use crate::near::{AccountProvider, NearAccount, NearRpc, RpcAccount};

/// Shared state handed to every handler.
pub struct RpcContext {
    pub config: Config,
    pub rpc: Arc<dyn NearRpc>,
    /// Accounts that can sign `eth_sendTransaction`
    pub accounts: Arc<dyn AccountProvider>,
    /// Unsigned account used for contract view calls
    pub viewer: Arc<dyn NearAccount>,
    pub hydrator: Hydrator,
}

impl RpcContext {
    pub fn new(
        config: Config,
        rpc: Arc<dyn NearRpc>,
        accounts: Arc<dyn AccountProvider>,
    ) -> Self {
        let viewer = Arc::new(RpcAccount::new(&config.evm_account_id, rpc.clone(), None));
        Self {
            hydrator: Hydrator::new(rpc.clone()),
            config,
            rpc,
            accounts,
            viewer,
        }
    }

    /// Run a read-only method of the EVM contract.
    pub(crate) async fn view(&self, method: &str, args: &[u8]) -> crate::error::RpcResult<Vec<u8>> {
        self.viewer
            .view_function(&self.config.evm_account_id, method, args)
            .await
    }
}
