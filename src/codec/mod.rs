pub mod address;
pub mod args;
pub mod composite;
pub mod hex;
pub mod tx;

pub use address::{derive_address, derive_address_hex, is_valid_account_id};
pub use args::{
    decode_call_args, decode_transfer_args, decode_withdraw_args, encode_call_args,
    encode_storage_args, encode_transfer_args, encode_withdraw_args, CallArgs, TransferArgs,
    WithdrawArgs,
};
pub use composite::CompositeHash;
pub use hex::{
    base58_to_hex, convert_timestamp, decode_base64, decode_hex, deserialize_array,
    deserialize_fixed_bytes, encode_base64, encode_hex, encode_quantity, encode_quantity_u256,
    hex_to_base58, include_0x, parse_quantity, parse_quantity_u256, remove_0x,
};
pub use tx::{decode_signed_transaction, DecodedEvmTransaction};
