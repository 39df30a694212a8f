//! Positional parameter validation shared by the handlers.
//!
//! Every failure is a [`RpcError::Validation`] naming the method and the
//! parameter position, raised before any upstream call is made.

use alloy_primitives::U256;
use serde_json::{Map, Value};

use crate::codec::{
    decode_hex, deserialize_array, hex_to_base58, parse_quantity, parse_quantity_u256, remove_0x,
};
use crate::error::{RpcError, RpcResult};
use crate::near::{BlockReference, Finality};

/// Fetch a required positional parameter.
pub fn required<'a>(params: &'a [Value], index: usize, method: &str) -> RpcResult<&'a Value> {
    params.get(index).filter(|v| !v.is_null()).ok_or_else(|| {
        RpcError::validation(format!("{} requires parameter #{}", method, index))
    })
}

pub fn require_str<'a>(params: &'a [Value], index: usize, method: &str) -> RpcResult<&'a str> {
    required(params, index, method)?.as_str().ok_or_else(|| {
        RpcError::validation(format!("{} parameter #{} must be a string", method, index))
    })
}

pub fn require_object<'a>(
    params: &'a [Value],
    index: usize,
    method: &str,
) -> RpcResult<&'a Map<String, Value>> {
    required(params, index, method)?.as_object().ok_or_else(|| {
        RpcError::validation(format!("{} parameter #{} must be an object", method, index))
    })
}

/// Optional boolean flag, `false` when absent.
pub fn optional_bool(params: &[Value], index: usize, method: &str) -> RpcResult<bool> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(RpcError::validation(format!(
            "{} parameter #{} must be a boolean",
            method, index
        ))),
    }
}

/// Hex DATA parameter.
pub fn require_data(params: &[Value], index: usize, method: &str) -> RpcResult<Vec<u8>> {
    let raw = require_str(params, index, method)?;
    parse_data(raw).map_err(|e| in_param(e, method, index))
}

pub fn require_address(params: &[Value], index: usize, method: &str) -> RpcResult<[u8; 20]> {
    let raw = require_str(params, index, method)?;
    parse_address(raw).map_err(|e| in_param(e, method, index))
}

pub fn require_quantity(params: &[Value], index: usize, method: &str) -> RpcResult<u64> {
    let raw = require_str(params, index, method)?;
    parse_quantity(raw).map_err(|e| in_param(e, method, index))
}

/// Block tag or height, `latest` when absent.
pub fn block_param(params: &[Value], index: usize, method: &str) -> RpcResult<BlockReference> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(BlockReference::latest()),
        Some(_) => {
            let raw = require_str(params, index, method)?;
            parse_block_param(raw).map_err(|e| in_param(e, method, index))
        }
    }
}

/// 32-byte block hash parameter, returned as the NEAR base58 form.
pub fn require_block_hash(params: &[Value], index: usize, method: &str) -> RpcResult<String> {
    let raw = require_str(params, index, method)?;
    parse_hash(raw).map_err(|e| in_param(e, method, index))
}

/// Hex DATA with a mandatory 0x prefix and an even number of digits.
pub fn parse_data(raw: &str) -> RpcResult<Vec<u8>> {
    if !raw.starts_with("0x") {
        return Err(RpcError::validation(format!("{:?} is missing 0x prefix", raw)));
    }
    decode_hex(raw)
}

/// 20-byte address with exactly 40 hex digits.
pub fn parse_address(raw: &str) -> RpcResult<[u8; 20]> {
    if !raw.starts_with("0x") || remove_0x(raw).len() != 40 {
        return Err(RpcError::validation(format!(
            "{:?} is not a 20-byte hex address",
            raw
        )));
    }
    deserialize_array::<20>(raw)
}

/// 32-byte hash with exactly 64 hex digits, converted to base58.
pub fn parse_hash(raw: &str) -> RpcResult<String> {
    if !raw.starts_with("0x") || remove_0x(raw).len() != 64 {
        return Err(RpcError::validation(format!("{:?} is not a 32-byte hex hash", raw)));
    }
    hex_to_base58(raw)
}

/// Block parameter grammar.
///
/// `latest`, `pending`, `safe` and `finalized` all resolve to the final block,
/// `earliest` to height zero, anything else must be a QUANTITY height.
pub fn parse_block_param(raw: &str) -> RpcResult<BlockReference> {
    match raw {
        "latest" | "pending" | "safe" | "finalized" => Ok(BlockReference::Finality(Finality::Final)),
        "earliest" => Ok(BlockReference::Height(0)),
        height => parse_quantity(height).map(BlockReference::Height),
    }
}

/// Optional QUANTITY field of a call object.
pub fn object_quantity(
    object: &Map<String, Value>,
    field: &str,
    method: &str,
) -> RpcResult<Option<U256>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_quantity_u256(s)
            .map(Some)
            .map_err(|e| in_field(e, method, field)),
        Some(_) => Err(RpcError::validation(format!(
            "{} field {:?} must be a hex string",
            method, field
        ))),
    }
}

/// Optional address field of a call object.
pub fn object_address(
    object: &Map<String, Value>,
    field: &str,
    method: &str,
) -> RpcResult<Option<[u8; 20]>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_address(s)
            .map(Some)
            .map_err(|e| in_field(e, method, field)),
        Some(_) => Err(RpcError::validation(format!(
            "{} field {:?} must be a hex string",
            method, field
        ))),
    }
}

/// Call data from `data`, falling back to `input`; empty when both are absent.
pub fn object_data(object: &Map<String, Value>, method: &str) -> RpcResult<Vec<u8>> {
    for field in ["data", "input"] {
        match object.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => return parse_data(s).map_err(|e| in_field(e, method, field)),
            Some(_) => {
                return Err(RpcError::validation(format!(
                    "{} field {:?} must be a hex string",
                    method, field
                )))
            }
        }
    }
    Ok(Vec::new())
}

fn in_param(err: RpcError, method: &str, index: usize) -> RpcError {
    match err {
        RpcError::Validation(msg) => {
            RpcError::Validation(format!("{} parameter #{}: {}", method, index, msg))
        }
        other => other,
    }
}

fn in_field(err: RpcError, method: &str, field: &str) -> RpcError {
    match err {
        RpcError::Validation(msg) => {
            RpcError::Validation(format!("{} field {:?}: {}", method, field, msg))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_param_grammar() {
        for tag in ["latest", "pending", "safe", "finalized"] {
            assert_eq!(
                parse_block_param(tag).unwrap(),
                BlockReference::Finality(Finality::Final)
            );
        }
        assert_eq!(parse_block_param("earliest").unwrap(), BlockReference::Height(0));
        assert_eq!(parse_block_param("0x1b4").unwrap(), BlockReference::Height(436));
        assert!(parse_block_param("436").is_err());
        assert!(parse_block_param("0xzz").is_err());
    }

    #[test]
    fn test_missing_and_mistyped_params() {
        let params = vec![json!(5), Value::Null];
        let err = require_str(&params, 0, "eth_getCode").unwrap_err();
        assert!(err.to_string().contains("eth_getCode parameter #0 must be a string"));
        assert!(require_str(&params, 1, "eth_getCode").is_err());
        assert!(require_str(&params, 2, "eth_getCode").is_err());
        assert!(optional_bool(&[json!("yes")], 0, "m").is_err());
        assert!(!optional_bool(&[], 0, "m").unwrap());
    }

    #[test]
    fn test_address_and_hash_lengths() {
        let addr = format!("0x{}", "ab".repeat(20));
        assert_eq!(parse_address(&addr).unwrap(), [0xab; 20]);
        assert!(parse_address("0xab").is_err());
        assert!(parse_address(&"ab".repeat(20)).is_err());

        let hash = format!("0x{}", "01".repeat(32));
        assert_eq!(parse_hash(&hash).unwrap(), bs58::encode([1u8; 32]).into_string());
        assert!(parse_hash("0x01").is_err());
    }

    #[test]
    fn test_call_object_fields() {
        let obj = json!({"to": format!("0x{}", "11".repeat(20)), "input": "0xdead", "value": "0x10"});
        let obj = obj.as_object().unwrap();
        assert_eq!(object_address(obj, "to", "eth_call").unwrap(), Some([0x11; 20]));
        assert_eq!(object_address(obj, "from", "eth_call").unwrap(), None);
        assert_eq!(object_data(obj, "eth_call").unwrap(), vec![0xde, 0xad]);
        assert_eq!(object_quantity(obj, "value", "eth_call").unwrap(), Some(U256::from(16u64)));
        assert!(parse_data("dead").is_err());
    }

    #[test]
    fn test_call_object_quantity_must_be_hex() {
        for bad in ["10", "", "0x"] {
            let obj = json!({ "value": bad });
            let err = object_quantity(obj.as_object().unwrap(), "value", "eth_sendTransaction")
                .unwrap_err();
            assert!(matches!(err, RpcError::Validation(_)), "{:?} accepted", bad);
            assert!(err.to_string().contains("eth_sendTransaction field \"value\""));
        }
        let obj = json!({ "value": 10 });
        assert!(object_quantity(obj.as_object().unwrap(), "value", "eth_call").is_err());
    }
}
