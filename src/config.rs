use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

use crate::codec::is_valid_account_id;

/// RPC server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// NEAR RPC endpoint URL
    pub near_rpc_url: String,
    /// NEAR network name (informational)
    pub near_network_id: String,
    /// Account hosting the EVM contract
    pub evm_account_id: String,
    /// Locally known accounts, in configuration order
    pub near_accounts: Vec<String>,
    /// Chain ID (decimal)
    pub chain_id: u64,
    /// RPC server port
    pub rpc_port: u16,
    /// Gas attached to function calls when a request omits `gas`
    pub default_gas: u64,
    /// Upper bound on a single request
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            near_rpc_url: "http://localhost:3030".to_string(),
            near_network_id: "local".to_string(),
            evm_account_id: "evm".to_string(),
            near_accounts: Vec::new(),
            chain_id: 1313161554,
            rpc_port: 8545,
            default_gas: 300_000_000_000_000,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    /// Call dotenvy::dotenv() before calling this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let near_rpc_url = lookup("NEAR_RPC_URL").unwrap_or(defaults.near_rpc_url);
        let near_network_id = lookup("NEAR_NETWORK_ID").unwrap_or(defaults.near_network_id);

        let evm_account_id = lookup("EVM_ACCOUNT_ID").unwrap_or(defaults.evm_account_id);
        if !is_valid_account_id(&evm_account_id) {
            bail!("EVM_ACCOUNT_ID {:?} is not a valid NEAR account id", evm_account_id);
        }

        let near_accounts = match lookup("NEAR_ACCOUNTS") {
            Some(list) => parse_account_list(&list)?,
            None => Vec::new(),
        };

        let chain_id = parse_var(&lookup, "CHAIN_ID", defaults.chain_id)?;
        let rpc_port = parse_var(&lookup, "RPC_PORT", defaults.rpc_port)?;
        let default_gas = parse_var(&lookup, "DEFAULT_GAS", defaults.default_gas)?;
        let request_timeout_secs =
            parse_var(&lookup, "REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?;

        Ok(Config {
            near_rpc_url,
            near_network_id,
            evm_account_id,
            near_accounts,
            chain_id,
            rpc_port,
            default_gas,
            request_timeout_secs,
        })
    }

    /// Return the chain ID as a hex string with 0x prefix
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid {}", key, std::any::type_name::<T>())),
        None => Ok(default),
    }
}

fn parse_account_list(list: &str) -> Result<Vec<String>> {
    let mut accounts: Vec<String> = Vec::new();
    for id in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !is_valid_account_id(id) {
            bail!("NEAR_ACCOUNTS entry {:?} is not a valid NEAR account id", id);
        }
        if !accounts.iter().any(|a| a == id) {
            accounts.push(id.to_string());
        }
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.near_rpc_url, "http://localhost:3030");
        assert_eq!(config.evm_account_id, "evm");
        assert_eq!(config.chain_id, 1313161554);
        assert_eq!(config.chain_id_hex(), "0x4e454152");
        assert_eq!(config.rpc_port, 8545);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.near_accounts.is_empty());
    }

    #[test]
    fn test_account_list() {
        let config = Config::from_lookup(lookup(&[(
            "NEAR_ACCOUNTS",
            "alice.test.near, bob.test.near,,alice.test.near",
        )]))
        .unwrap();
        assert_eq!(config.near_accounts, vec!["alice.test.near", "bob.test.near"]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("RPC_PORT", "70000")])).is_err());
        assert!(Config::from_lookup(lookup(&[("EVM_ACCOUNT_ID", "EVM!")])).is_err());
        assert!(Config::from_lookup(lookup(&[("NEAR_ACCOUNTS", "ok.near,Bad")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CHAIN_ID", "abc")])).is_err());
    }
}
