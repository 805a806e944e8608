//! RPC command handlers.
//!
//! Each handler takes the daemon state and the raw `params` value and
//! returns the JSON result or an [`RpcError`].

pub mod registry;
pub mod round;
pub mod signals;

use murmur_ledger::LedgerError;
use murmur_registry::RegistryError;
use serde_json::Value;

use crate::rpc::RpcError;

pub type Result = std::result::Result<Value, RpcError>;

/// Map a ledger failure onto its wire error.
pub(crate) fn ledger_error(err: LedgerError) -> RpcError {
    match err {
        LedgerError::Rejected(_) => RpcError::proof_rejected(),
        LedgerError::UnknownRoot => RpcError::unknown_root(),
        LedgerError::Malformed(detail) => RpcError::invalid_params(&detail),
        LedgerError::Registry(RegistryError::DuplicateCommitment(index)) => {
            RpcError::duplicate_commitment(index)
        }
        LedgerError::Registry(RegistryError::CapacityExceeded { capacity }) => {
            RpcError::capacity_exceeded(capacity)
        }
        LedgerError::Registry(other) => RpcError::internal_error(&other.to_string()),
        LedgerError::Storage(detail) => {
            tracing::error!(%detail, "ledger storage failure");
            RpcError::internal_error("storage failure")
        }
    }
}

/// A required string parameter.
pub(crate) fn str_param<'a>(params: &'a Value, name: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params(&format!("missing string parameter '{name}'")))
}

/// A required unsigned integer parameter.
pub(crate) fn u64_param(params: &Value, name: &str) -> std::result::Result<u64, RpcError> {
    params
        .get(name)
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::invalid_params(&format!("missing integer parameter '{name}'")))
}
