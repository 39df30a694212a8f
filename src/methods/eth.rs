use alloy_primitives::U256;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::params::{
    block_param, object_address, object_data, object_quantity, optional_bool, require_address,
    require_block_hash, require_data, require_object, require_quantity, require_str,
};
use super::RpcContext;
use crate::codec::{
    derive_address, derive_address_hex, encode_call_args, encode_hex, encode_quantity,
    encode_quantity_u256, encode_storage_args, CompositeHash,
};
use crate::emulator::{
    map_block, map_block_full, map_full_transaction, map_receipt, map_sync_status,
    map_transaction, parse_decimal, EthBlock,
};
use crate::error::{RpcError, RpcResult};
use crate::hydrator::{FullTransaction, HydratedBlock};
use crate::near::{BlockReference, FinalExecutionOutcomeView, NearAccount};

/// Handler for eth_chainId
pub async fn chain_id(ctx: &RpcContext) -> RpcResult<Value> {
    let id = ctx.config.chain_id_hex();
    debug!("eth_chainId -> {}", id);
    Ok(Value::String(id))
}

/// Handler for eth_protocolVersion
pub async fn protocol_version() -> RpcResult<Value> {
    Ok(Value::String("0x41".to_string()))
}

/// Handler for eth_blockNumber
pub async fn block_number(ctx: &RpcContext) -> RpcResult<Value> {
    let status = ctx.rpc.status().await?;
    let height = status.sync_info.latest_block_height;
    debug!("eth_blockNumber -> {}", height);
    Ok(Value::String(encode_quantity(height)))
}

/// Handler for eth_syncing
pub async fn syncing(ctx: &RpcContext) -> RpcResult<Value> {
    let status = ctx.rpc.status().await?;
    if !status.sync_info.syncing {
        return Ok(Value::Bool(false));
    }
    Ok(serde_json::to_value(map_sync_status(&status.sync_info))?)
}

/// Handler for eth_gasPrice
/// Gas price of the latest final block.
pub async fn gas_price(ctx: &RpcContext) -> RpcResult<Value> {
    let block = ctx.rpc.block(BlockReference::latest()).await?;
    let price = parse_decimal(&block.header.gas_price, "gas price")?;
    debug!("eth_gasPrice -> {} (block {})", price, block.header.height);
    Ok(Value::String(encode_quantity(price)))
}

/// Handler for eth_accounts
pub async fn accounts(ctx: &RpcContext) -> RpcResult<Value> {
    let addresses = ctx
        .accounts
        .account_ids()
        .iter()
        .map(|id| derive_address_hex(id).map(Value::String))
        .collect::<RpcResult<Vec<_>>>()?;
    Ok(Value::Array(addresses))
}

/// Handler for eth_getBalance
pub async fn get_balance(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let address = require_address(params, 0, "eth_getBalance")?;
    block_param(params, 1, "eth_getBalance")?;
    debug!("eth_getBalance: address={}", encode_hex(&address));

    let result = ctx.view("get_balance", &address).await?;
    Ok(Value::String(encode_quantity_u256(word_to_u256(&result)?)))
}

/// Handler for eth_getCode
pub async fn get_code(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let address = require_address(params, 0, "eth_getCode")?;
    block_param(params, 1, "eth_getCode")?;
    debug!("eth_getCode: address={}", encode_hex(&address));

    let code = ctx.view("code_at", &address).await?;
    Ok(Value::String(encode_hex(&code)))
}

/// Handler for eth_getTransactionCount
pub async fn get_transaction_count(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let address = require_address(params, 0, "eth_getTransactionCount")?;
    block_param(params, 1, "eth_getTransactionCount")?;

    let result = ctx.view("get_nonce", &address).await?;
    Ok(Value::String(encode_quantity_u256(word_to_u256(&result)?)))
}

/// Handler for eth_getStorageAt
pub async fn get_storage_at(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let address = require_address(params, 0, "eth_getStorageAt")?;
    let key = require_data(params, 1, "eth_getStorageAt")?;
    block_param(params, 2, "eth_getStorageAt")?;
    if key.len() > 32 {
        return Err(RpcError::validation(format!(
            "eth_getStorageAt parameter #1: storage key is {} bytes, expected at most 32",
            key.len()
        )));
    }
    let mut word = [0u8; 32];
    word[32 - key.len()..].copy_from_slice(&key);

    let result = ctx.view("get_storage_at", &encode_storage_args(&address, &word)).await?;
    let value = word_to_u256(&result)?;
    Ok(Value::String(encode_hex(&value.to_be_bytes::<32>())))
}

/// Handler for eth_call (read-only contract invocation)
pub async fn call(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let call_obj = require_object(params, 0, "eth_call")?;
    let to = object_address(call_obj, "to", "eth_call")?
        .ok_or_else(|| RpcError::validation("eth_call requires 'to' field"))?;
    let data = object_data(call_obj, "eth_call")?;
    block_param(params, 1, "eth_call")?;

    debug!("eth_call: to={}, data_len={}", encode_hex(&to), data.len());

    let result = ctx.view("view", &encode_call_args(&to, &data)).await?;
    Ok(Value::String(encode_hex(&result)))
}

/// Handler for eth_sendTransaction
///
/// Deploys when `to` is absent, otherwise calls the contract at `to`. The
/// returned hash is the composite `<hash>:<signer>` key.
pub async fn send_transaction(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let tx_obj = require_object(params, 0, "eth_sendTransaction")?;
    let from = object_address(tx_obj, "from", "eth_sendTransaction")?;
    let to = object_address(tx_obj, "to", "eth_sendTransaction")?;
    let data = object_data(tx_obj, "eth_sendTransaction")?;
    let value = object_quantity(tx_obj, "value", "eth_sendTransaction")?.unwrap_or(U256::ZERO);
    let deposit: u128 = value.try_into().map_err(|_| {
        RpcError::validation(format!("eth_sendTransaction value {} exceeds u128", value))
    })?;
    let gas: u64 = match object_quantity(tx_obj, "gas", "eth_sendTransaction")? {
        Some(gas) => gas.try_into().map_err(|_| {
            RpcError::validation(format!("eth_sendTransaction gas {} exceeds u64", gas))
        })?,
        None => ctx.config.default_gas,
    };

    let sender = resolve_sender(ctx, from)?;
    let evm = &ctx.config.evm_account_id;

    let outcome = match to {
        None => {
            info!("Deploying {} bytes of code from {}", data.len(), sender.account_id());
            sender
                .function_call(evm, "deploy_code", data, gas, deposit)
                .await?
        }
        Some(to) => {
            info!("Calling {} from {}", encode_hex(&to), sender.account_id());
            sender
                .function_call(evm, "call", encode_call_args(&to, &data), gas, deposit)
                .await?
        }
    };

    if outcome.success_value().is_none() {
        warn!(
            "Transaction {} from {} did not succeed: {:?}",
            outcome.transaction.hash,
            sender.account_id(),
            outcome.status
        );
    }

    let hash = CompositeHash::new(&outcome.transaction.hash, &outcome.transaction.signer_id);
    Ok(Value::String(hash.encode()?))
}

/// Pick the local account whose derived address matches `from`, or the
/// first account when `from` is absent.
fn resolve_sender(
    ctx: &RpcContext,
    from: Option<[u8; 20]>,
) -> RpcResult<std::sync::Arc<dyn NearAccount>> {
    let ids = ctx.accounts.account_ids();
    let id = match from {
        None => ids.first().cloned().ok_or_else(|| {
            RpcError::validation("eth_sendTransaction: no local accounts are configured")
        })?,
        Some(from) => {
            let mut matched = None;
            for id in &ids {
                if derive_address(id)? == from {
                    matched = Some(id.clone());
                    break;
                }
            }
            matched.ok_or_else(|| {
                RpcError::validation(format!(
                    "eth_sendTransaction: {} is not a local account",
                    encode_hex(&from)
                ))
            })?
        }
    };

    ctx.accounts
        .account(&id)
        .ok_or_else(|| RpcError::Upstream(format!("account {} is not available", id)))
}

/// Handler for eth_getBlockByHash
pub async fn get_block_by_hash(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let hash = require_block_hash(params, 0, "eth_getBlockByHash")?;
    let full = optional_bool(params, 1, "eth_getBlockByHash")?;
    debug!("eth_getBlockByHash: hash={}, full={}", hash, full);
    block_object(ctx, BlockReference::Hash(hash), full).await
}

/// Handler for eth_getBlockByNumber
pub async fn get_block_by_number(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let reference = block_param(params, 0, "eth_getBlockByNumber")?;
    let full = optional_bool(params, 1, "eth_getBlockByNumber")?;
    debug!("eth_getBlockByNumber: block={:?}, full={}", reference, full);
    block_object(ctx, reference, full).await
}

async fn hydrated_block(ctx: &RpcContext, reference: BlockReference) -> RpcResult<HydratedBlock> {
    let block = ctx.rpc.block(reference).await?;
    ctx.hydrator.hydrate_block(block).await
}

async fn block_object(ctx: &RpcContext, reference: BlockReference, full: bool) -> RpcResult<Value> {
    let block = hydrated_block(ctx, reference).await?;

    if block.chunks.is_empty() {
        debug!("Block {} has no chunks, returning placeholder", block.header.height);
        return Ok(serde_json::to_value(EthBlock::without_chunks(&block)?)?);
    }

    let eth_block = if full {
        let transactions = ctx.hydrator.hydrate_all_transactions(&block).await?;
        map_block_full(&block, &transactions)?
    } else {
        map_block(&block)?
    };

    Ok(serde_json::to_value(eth_block)?)
}

/// Handler for eth_getBlockTransactionCountByHash
pub async fn get_block_transaction_count_by_hash(
    ctx: &RpcContext,
    params: &[Value],
) -> RpcResult<Value> {
    let hash = require_block_hash(params, 0, "eth_getBlockTransactionCountByHash")?;
    let block = ctx.rpc.block(BlockReference::Hash(hash)).await?;
    Ok(Value::String(encode_quantity(block.chunks.len() as u64)))
}

/// Handler for eth_getBlockTransactionCountByNumber
pub async fn get_block_transaction_count_by_number(
    ctx: &RpcContext,
    params: &[Value],
) -> RpcResult<Value> {
    let reference = block_param(params, 0, "eth_getBlockTransactionCountByNumber")?;
    let block = ctx.rpc.block(reference).await?;
    Ok(Value::String(encode_quantity(block.chunks.len() as u64)))
}

/// Handler for eth_getTransactionByBlockHashAndIndex
pub async fn get_transaction_by_block_hash_and_index(
    ctx: &RpcContext,
    params: &[Value],
) -> RpcResult<Value> {
    let method = "eth_getTransactionByBlockHashAndIndex";
    let hash = require_block_hash(params, 0, method)?;
    let index = require_quantity(params, 1, method)?;
    transaction_at(ctx, BlockReference::Hash(hash), index).await
}

/// Handler for eth_getTransactionByBlockNumberAndIndex
pub async fn get_transaction_by_block_number_and_index(
    ctx: &RpcContext,
    params: &[Value],
) -> RpcResult<Value> {
    let method = "eth_getTransactionByBlockNumberAndIndex";
    let reference = block_param(params, 0, method)?;
    let index = require_quantity(params, 1, method)?;
    transaction_at(ctx, reference, index).await
}

async fn transaction_at(ctx: &RpcContext, reference: BlockReference, index: u64) -> RpcResult<Value> {
    let block = hydrated_block(ctx, reference).await?;
    let tx = usize::try_from(index)
        .ok()
        .and_then(|i| block.transactions.get(i));
    match tx {
        Some(tx) => Ok(serde_json::to_value(map_transaction(tx, index)?)?),
        None => {
            debug!(
                "No transaction at index {} of block {} ({} transactions)",
                index,
                block.header.height,
                block.transactions.len()
            );
            Ok(Value::Null)
        }
    }
}

/// Outcome of a composite-hash transaction plus the hydrated block holding it.
async fn locate_transaction(
    ctx: &RpcContext,
    method: &str,
    params: &[Value],
) -> RpcResult<(FinalExecutionOutcomeView, HydratedBlock, usize)> {
    let key: CompositeHash = require_str(params, 0, method)?.parse()?;
    debug!("{}: hash={}, signer={}", method, key.tx_hash, key.account_id);

    let outcome = ctx.rpc.tx_status(&key.tx_hash, &key.account_id).await?;
    let block = hydrated_block(ctx, BlockReference::Hash(outcome.block_hash().to_string())).await?;
    let index = block.position(&key).ok_or_else(|| {
        RpcError::Upstream(format!(
            "transaction {} not found in block {}",
            key.tx_hash, block.header.height
        ))
    })?;

    Ok((outcome, block, index))
}

/// Handler for eth_getTransactionByHash
pub async fn get_transaction_by_hash(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let (outcome, block, index) = locate_transaction(ctx, "eth_getTransactionByHash", params).await?;
    let full = FullTransaction {
        tx: block.transactions[index].clone(),
        outcome,
    };
    let tx = map_full_transaction(&full, index as u64)?;
    Ok(serde_json::to_value(tx)?)
}

/// Handler for eth_getTransactionReceipt
pub async fn get_transaction_receipt(ctx: &RpcContext, params: &[Value]) -> RpcResult<Value> {
    let (outcome, block, index) = locate_transaction(ctx, "eth_getTransactionReceipt", params).await?;
    let receipt = map_receipt(&block.header, &outcome, index as u64)?;
    Ok(serde_json::to_value(receipt)?)
}

/// Interpret a contract return value as a big-endian 256-bit word.
fn word_to_u256(bytes: &[u8]) -> RpcResult<U256> {
    if bytes.len() > 32 {
        return Err(RpcError::Upstream(format!(
            "contract returned {} bytes, expected a 32-byte word",
            bytes.len()
        )));
    }
    Ok(U256::from_be_slice(bytes))
}
