//! Byte-string conversions shared by the mapper and the handlers.
//!
//! NEAR identifies blocks, chunks and transactions by base58 strings while
//! Ethereum clients expect 0x-prefixed hex. Both encodings wrap the same
//! 32 bytes, so converting between them is lossless.

use alloy_primitives::U256;
use base64::Engine;

use crate::error::{RpcError, RpcResult};

/// Add a `0x` prefix unless one is already present.
pub fn include_0x(s: &str) -> String {
    if s.starts_with("0x") || s.starts_with("0X") {
        format!("0x{}", &s[2..])
    } else {
        format!("0x{}", s)
    }
}

/// Strip a leading `0x`/`0X` if present.
pub fn remove_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode an optionally prefixed hex string.
pub fn decode_hex(s: &str) -> RpcResult<Vec<u8>> {
    hex::decode(remove_0x(s))
        .map_err(|e| RpcError::validation(format!("invalid hex string {:?}: {}", s, e)))
}

/// Encode bytes as `0x`-prefixed lowercase hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn hex_to_base58(s: &str) -> RpcResult<String> {
    Ok(bs58::encode(decode_hex(s)?).into_string())
}

pub fn base58_to_hex(s: &str) -> RpcResult<String> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| RpcError::validation(format!("invalid base58 string {:?}: {}", s, e)))?;
    Ok(encode_hex(&bytes))
}

pub fn decode_base64(s: &str) -> RpcResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| RpcError::validation(format!("invalid base64 string: {}", e)))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode hex into bytes, left-padding with zeros up to `fixed_len`.
///
/// Fails when the decoded input is longer than `fixed_len`.
pub fn deserialize_fixed_bytes(s: &str, fixed_len: Option<usize>) -> RpcResult<Vec<u8>> {
    let stripped = remove_0x(s);
    // Odd-length quantities like "0x1" are accepted by padding a nibble.
    let bytes = if stripped.len() % 2 == 1 {
        decode_hex(&format!("0{}", stripped))?
    } else {
        decode_hex(stripped)?
    };
    match fixed_len {
        None => Ok(bytes),
        Some(len) if bytes.len() > len => Err(RpcError::validation(format!(
            "hex value {} is {} bytes, longer than {}",
            s,
            bytes.len(),
            len
        ))),
        Some(len) => {
            let mut padded = vec![0u8; len - bytes.len()];
            padded.extend_from_slice(&bytes);
            Ok(padded)
        }
    }
}

/// Decode exactly `N` bytes (after left-padding).
pub fn deserialize_array<const N: usize>(s: &str) -> RpcResult<[u8; N]> {
    let bytes = deserialize_fixed_bytes(s, Some(N))?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Encode an integer as a QUANTITY: minimal lowercase hex, `0x0` for zero.
pub fn encode_quantity(value: impl Into<u128>) -> String {
    format!("0x{:x}", value.into())
}

/// QUANTITY encoding for 256-bit values.
pub fn encode_quantity_u256(value: U256) -> String {
    if value.is_zero() {
        "0x0".to_string()
    } else {
        format!("0x{:x}", value)
    }
}

/// Hex digits of a QUANTITY: `0x` followed by at least one digit.
fn quantity_digits(s: &str) -> RpcResult<&str> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::validation(format!("quantity {:?} is missing 0x prefix", s)))?;
    if digits.is_empty() {
        return Err(RpcError::validation("quantity has no digits"));
    }
    Ok(digits)
}

/// Parse a QUANTITY string into a u64.
pub fn parse_quantity(s: &str) -> RpcResult<u64> {
    u64::from_str_radix(quantity_digits(s)?, 16)
        .map_err(|e| RpcError::validation(format!("invalid quantity {:?}: {}", s, e)))
}

/// Parse a QUANTITY string into a 256-bit value.
pub fn parse_quantity_u256(s: &str) -> RpcResult<U256> {
    U256::from_str_radix(quantity_digits(s)?, 16)
        .map_err(|e| RpcError::validation(format!("invalid quantity {:?}: {}", s, e)))
}

/// Convert a NEAR timestamp (nanoseconds) into a QUANTITY of milliseconds.
///
/// Sub-millisecond precision is dropped by the integer division. The result
/// is deterministic for a given header.
pub fn convert_timestamp(nanoseconds: u64) -> String {
    encode_quantity(nanoseconds / 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalization_is_idempotent() {
        for h in ["abcd", "0xabcd", "0Xabcd", ""] {
            assert_eq!(include_0x(remove_0x(h)), include_0x(remove_0x(&include_0x(h))));
        }
        assert_eq!(include_0x("0Xff"), "0xff");
        assert_eq!(remove_0x("0x"), "");
    }

    #[test]
    fn test_base58_round_trip() {
        let zero_hash = format!("0x{}", "00".repeat(32));
        let b58 = hex_to_base58(&zero_hash).unwrap();
        assert_eq!(b58, "1".repeat(32));
        assert_eq!(base58_to_hex(&b58).unwrap(), zero_hash);

        let hash = "0x9f1c3a0e2b7d44c1a8e0f6d3b2a1c0ffee00112233445566778899aabbccddee";
        assert_eq!(base58_to_hex(&hex_to_base58(hash).unwrap()).unwrap(), hash);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(hex_to_base58("0xzz").is_err());
        assert!(base58_to_hex("0OIl").is_err());
        assert!(decode_base64("***").is_err());
    }

    #[test]
    fn test_deserialize_fixed_bytes_pads_and_bounds() {
        assert_eq!(deserialize_fixed_bytes("0x01", Some(4)).unwrap(), vec![0, 0, 0, 1]);
        assert_eq!(deserialize_fixed_bytes("0x1", None).unwrap(), vec![1]);
        assert_eq!(deserialize_fixed_bytes("0x0102", None).unwrap(), vec![1, 2]);
        assert!(deserialize_fixed_bytes("0x010203", Some(2)).is_err());
    }

    #[test]
    fn test_quantity_encoding() {
        assert_eq!(encode_quantity(0u64), "0x0");
        assert_eq!(encode_quantity(255u64), "0xff");
        assert_eq!(encode_quantity_u256(U256::ZERO), "0x0");
        assert_eq!(encode_quantity_u256(U256::from(4096u64)), "0x1000");
        assert_eq!(parse_quantity("0x2a").unwrap(), 42);
        assert!(parse_quantity("2a").is_err());
        assert!(parse_quantity("0x").is_err());
    }

    #[test]
    fn test_u256_quantity_requires_prefix_and_digits() {
        assert_eq!(parse_quantity_u256("0x10").unwrap(), U256::from(16u64));
        assert_eq!(parse_quantity_u256("0x0").unwrap(), U256::ZERO);
        assert_eq!(parse_quantity_u256(&format!("0x{}", "f".repeat(64))).unwrap(), U256::MAX);
        for bad in ["10", "", "0x", "0xg1", "0X10"] {
            assert!(parse_quantity_u256(bad).is_err(), "{:?} should be rejected", bad);
        }
        assert!(parse_quantity_u256(&format!("0x1{}", "0".repeat(64))).is_err());
    }

    #[test]
    fn test_convert_timestamp_truncates_to_millis() {
        // 2020-10-01T00:00:00.123456789Z
        let nanos = 1_601_510_400_123_456_789u64;
        assert_eq!(convert_timestamp(nanos), encode_quantity(1_601_510_400_123u64));
    }
}
