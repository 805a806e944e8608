//! Membership registry commands.

use std::sync::Arc;

use murmur_crypto::poseidon;
use serde_json::{json, Value};

use super::{ledger_error, str_param, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

/// Current root, depth and member count.
pub async fn get_root(state: &Arc<DaemonState>, _params: &Value) -> Result {
    let ledger = &state.ledger;
    Ok(json!({
        "root": poseidon::to_hex(&ledger.current_root()),
        "depth": ledger.depth(),
        "members": ledger.commitments().len(),
    }))
}

/// All registered commitments, in the membership file layout.
pub async fn get_commitments(state: &Arc<DaemonState>, _params: &Value) -> Result {
    let commitments: Vec<String> = state
        .ledger
        .commitments()
        .iter()
        .map(poseidon::to_decimal)
        .collect();
    Ok(json!({
        "depth": state.ledger.depth(),
        "commitments": commitments,
    }))
}

/// Append a commitment (decimal or `0x` hex) to the registry.
pub async fn register_commitment(state: &Arc<DaemonState>, params: &Value) -> Result {
    let raw = str_param(params, "commitment")?;
    let commitment =
        poseidon::parse_field(raw).map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    let leaf_index = state.ledger.register(commitment).map_err(ledger_error)?;
    Ok(json!({
        "leaf_index": leaf_index,
        "root": poseidon::to_hex(&state.ledger.current_root()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use murmur_crypto::Fr;

    #[tokio::test]
    async fn test_register_and_list() {
        let state = fixtures::state();
        let before = get_root(&state, &Value::Null).await.expect("root");
        assert_eq!(before["members"], 0);
        assert_eq!(before["depth"], fixtures::DEPTH);

        let result = register_commitment(&state, &json!({"commitment": "12345"}))
            .await
            .expect("register");
        assert_eq!(result["leaf_index"], 0);
        assert_ne!(result["root"], before["root"]);

        let result = register_commitment(&state, &json!({"commitment": "0x10"}))
            .await
            .expect("register");
        assert_eq!(result["leaf_index"], 1);

        let listed = get_commitments(&state, &Value::Null).await.expect("list");
        assert_eq!(listed["commitments"], json!(["12345", "16"]));
        assert_eq!(state.ledger.commitments()[1], Fr::from(16u64));
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let state = fixtures::state();
        register_commitment(&state, &json!({"commitment": "7"}))
            .await
            .expect("register");
        let err = register_commitment(&state, &json!({"commitment": "7"}))
            .await
            .expect_err("duplicate");
        assert_eq!(err.code, -32052);
    }

    #[tokio::test]
    async fn test_register_until_full() {
        let state = fixtures::state();
        for i in 1..=4u64 {
            register_commitment(&state, &json!({"commitment": i.to_string()}))
                .await
                .expect("register");
        }
        let err = register_commitment(&state, &json!({"commitment": "5"}))
            .await
            .expect_err("full");
        assert_eq!(err.code, -32053);
    }

    #[tokio::test]
    async fn test_register_bad_params() {
        let state = fixtures::state();
        let err = register_commitment(&state, &json!({})).await.expect_err("missing");
        assert_eq!(err.code, -32602);
        let err = register_commitment(&state, &json!({"commitment": "abc"}))
            .await
            .expect_err("not a scalar");
        assert_eq!(err.code, -32602);
    }
}
