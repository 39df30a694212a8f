use std::fmt::Display;

use jsonrpsee::types::ErrorObjectOwned;
use serde_json::Value;
use thiserror::Error;

/// Error codes, following the EIP-1474 table where one applies.
pub mod codes {
    pub const INVALID_PARAMS: i32 = -32602;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const UPSTREAM_ERROR: i32 = -32000;
    pub const METHOD_NOT_SUPPORTED: i32 = -32004;
}

/// Every failure a request can end in.
///
/// Handlers return these through `Result`; the router turns them into the
/// `error` member of the response envelope and never into a `result`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RpcError {
    /// Malformed local input. Never reaches the upstream.
    #[error("Invalid params: {0}")]
    Validation(String),

    #[error("Method not supported: {method}")]
    UnsupportedMethod { method: String },

    #[error("Unknown method: {method} (params: {params})")]
    UnknownMethod { method: String, params: Value },

    /// Anything raised by the NEAR RPC or an account collaborator.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// One or more concurrent hydration fetches failed.
    #[error("Hydration failed: {} of the concurrent fetches failed", .0.len())]
    AggregateHydration(Vec<RpcError>),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;

impl RpcError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(err: impl Display) -> Self {
        Self::Upstream(err.to_string())
    }

    pub fn unsupported(method: &str) -> Self {
        Self::UnsupportedMethod {
            method: method.to_string(),
        }
    }

    pub fn unknown(method: &str, params: &[Value]) -> Self {
        Self::UnknownMethod {
            method: method.to_string(),
            params: Value::Array(params.to_vec()),
        }
    }

    /// Stable JSON-RPC error code for this category.
    pub fn code(&self) -> i32 {
        match self {
            Self::Validation(_) => codes::INVALID_PARAMS,
            Self::UnsupportedMethod { .. } => codes::METHOD_NOT_SUPPORTED,
            Self::UnknownMethod { .. } => codes::METHOD_NOT_FOUND,
            Self::Upstream(_) => codes::UPSTREAM_ERROR,
            Self::AggregateHydration(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Extra `data` member for the error object, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::UnknownMethod { params, .. } => Some(params.clone()),
            Self::AggregateHydration(errors) => Some(Value::Array(
                errors.iter().map(|e| Value::String(e.to_string())).collect(),
            )),
            _ => None,
        }
    }

    /// Convert into the jsonrpsee error object sent on the wire.
    pub fn into_error_object(self) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(self.code(), self.to_string(), self.data())
    }
}

impl From<RpcError> for ErrorObjectOwned {
    fn from(err: RpcError) -> Self {
        err.into_error_object()
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Upstream(format!("Failed to (de)serialize payload: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_codes_are_distinct_per_category() {
        let unknown = RpcError::unknown("eth_foo", &[json!(1)]);
        let unsupported = RpcError::unsupported("eth_sign");
        assert_eq!(unknown.code(), -32601);
        assert_eq!(unsupported.code(), -32004);
        assert_eq!(RpcError::validation("x").code(), -32602);
        assert_eq!(RpcError::upstream("x").code(), -32000);
    }

    #[test]
    fn test_unknown_method_echoes_params() {
        let err = RpcError::unknown("eth_foo", &[json!("0x1"), json!(true)]);
        assert!(err.to_string().contains("eth_foo"));
        assert_eq!(err.data(), Some(json!(["0x1", true])));
    }

    #[test]
    fn test_aggregate_lists_every_failure() {
        let err = RpcError::AggregateHydration(vec![
            RpcError::upstream("chunk a missing"),
            RpcError::upstream("chunk b missing"),
        ]);
        let obj = err.clone().into_error_object();
        assert_eq!(obj.code(), -32603);
        assert!(err.to_string().contains("2 of the concurrent fetches"));
        let data = err.data().unwrap();
        assert_eq!(data.as_array().unwrap().len(), 2);
    }
}
