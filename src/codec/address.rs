use sha3::{Digest, Keccak256};

use crate::error::{RpcError, RpcResult};

const MIN_ACCOUNT_ID_LEN: usize = 2;
const MAX_ACCOUNT_ID_LEN: usize = 64;

/// Check a NEAR account identifier.
///
/// Lowercase alphanumeric parts joined by single `-`, `_` or `.` separators,
/// 2 to 64 characters, no leading, trailing or consecutive separators.
pub fn is_valid_account_id(account_id: &str) -> bool {
    if account_id.len() < MIN_ACCOUNT_ID_LEN || account_id.len() > MAX_ACCOUNT_ID_LEN {
        return false;
    }

    let mut last_was_separator = true;
    for c in account_id.chars() {
        match c {
            'a'..='z' | '0'..='9' => last_was_separator = false,
            '-' | '_' | '.' => {
                if last_was_separator {
                    return false;
                }
                last_was_separator = true;
            }
            _ => return false,
        }
    }
    !last_was_separator
}

/// Map a NEAR account to its 20-byte EVM address.
///
/// The address is the low 20 bytes of keccak256(account_id). The mapping is
/// deterministic but cannot be inverted.
pub fn derive_address(account_id: &str) -> RpcResult<[u8; 20]> {
    if !is_valid_account_id(account_id) {
        return Err(RpcError::validation(format!(
            "invalid account id: {:?}",
            account_id
        )));
    }
    let hash = Keccak256::digest(account_id.as_bytes());
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..32]);
    Ok(address)
}

/// [`derive_address`] rendered as 0x-prefixed hex.
pub fn derive_address_hex(account_id: &str) -> RpcResult<String> {
    derive_address(account_id).map(|a| format!("0x{}", hex::encode(a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_grammar() {
        for ok in ["test.near", "alice-bob.testnet", "a_b", "evm", "00", "x.y.z"] {
            assert!(is_valid_account_id(ok), "{} should be valid", ok);
        }
        for bad in [
            "a",
            "Alice.near",
            "alice..near",
            ".alice",
            "alice.",
            "al ice",
            "alice@near",
            "a-_b",
            &"a".repeat(65),
        ] {
            assert!(!is_valid_account_id(bad), "{} should be invalid", bad);
        }
    }

    #[test]
    fn test_derive_address_golden_value() {
        assert_eq!(
            derive_address_hex("test.near").unwrap(),
            "0xcbda96b3f2b8eb962f97ae50c3852ca976740e2b"
        );
    }

    #[test]
    fn test_derive_address_is_deterministic() {
        let a = derive_address_hex("alice.near").unwrap();
        assert_eq!(a, derive_address_hex("alice.near").unwrap());
        assert_eq!(a.len(), 42);
        assert!(a[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, derive_address_hex("bob.near").unwrap());
    }

    #[test]
    fn test_derive_address_rejects_invalid_account() {
        assert!(matches!(
            derive_address("Not Valid"),
            Err(RpcError::Validation(_))
        ));
    }
}
