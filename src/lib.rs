//! NEAR Web3 RPC
//!
//! A JSON-RPC server that accepts Ethereum-compatible calls (eth_*, net_*,
//! web3_*) and answers them from a NEAR node and the EVM contract deployed
//! on it, so that standard EVM tooling can talk to NEAR.
//!
//! # Architecture
//!
//! ```text
//! Client (ethers.js/web3.js/Hardhat)
//!     |
//!     | eth_* JSON-RPC calls
//!     v
//! router -> methods -> hydrator -> emulator -> codec
//!     |
//!     | NEAR JSON-RPC (status, block, chunk, tx, query)
//!     v
//! NEAR node + EVM contract
//! ```
//!
//! # Modules
//!
//! - `config` - Environment and configuration management
//! - `error` - Error taxonomy and JSON-RPC error codes
//! - `codec` - Hex/base58 conversions, contract argument layouts, RLP
//! - `near` - NEAR RPC client, response types and account collaborators
//! - `hydrator` - Expands block summaries into chunks, transactions and outcomes
//! - `emulator` - Maps NEAR records to EVM blocks, transactions, receipts, logs
//! - `methods` - Individual RPC method implementations (eth, net, web3)
//! - `router` - Method table and dispatch
//! - `accounts` - Single-flight account provisioning for dev networks
//! - `server` - JSON-RPC server setup and method registration

pub mod accounts;
pub mod codec;
pub mod config;
pub mod emulator;
pub mod error;
pub mod hydrator;
pub mod methods;
pub mod near;
pub mod router;
pub mod server;

#[cfg(test)]
mod test_support;
