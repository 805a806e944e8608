//! Round management commands.

use std::sync::Arc;

use murmur_signal::ExternalNullifier;
use serde_json::{json, Value};

use super::{ledger_error, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

/// The current external nullifier.
pub async fn get_round(state: &Arc<DaemonState>, _params: &Value) -> Result {
    Ok(json!({ "round": hex::encode(state.ledger.current_round().to_bytes()) }))
}

/// Switch rounds. Accepts exactly one of `topic`, `number` or `round` (hex).
pub async fn advance_round(state: &Arc<DaemonState>, params: &Value) -> Result {
    let round = parse_round(params)?;
    state.ledger.advance_round(round).map_err(ledger_error)?;
    Ok(json!({ "round": hex::encode(round.to_bytes()) }))
}

fn parse_round(params: &Value) -> std::result::Result<ExternalNullifier, RpcError> {
    let topic = params.get("topic").and_then(Value::as_str);
    let number = params.get("number").and_then(Value::as_u64);
    let raw = params.get("round").and_then(Value::as_str);
    match (topic, number, raw) {
        (Some(topic), None, None) => Ok(ExternalNullifier::from_topic(topic)),
        (None, Some(number), None) => Ok(ExternalNullifier::from_round(number)),
        (None, None, Some(raw)) => {
            let bytes: [u8; 32] = hex::decode(raw)
                .ok()
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| RpcError::invalid_params("round must be 32 bytes of hex"))?;
            ExternalNullifier::from_bytes(&bytes)
                .map_err(|e| RpcError::invalid_params(&e.to_string()))
        }
        _ => Err(RpcError::invalid_params(
            "expected exactly one of 'topic', 'number' or 'round'",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_get_round() {
        let state = fixtures::state();
        let result = get_round(&state, &Value::Null).await.expect("round");
        assert_eq!(
            result["round"],
            hex::encode(ExternalNullifier::from_round(1).to_bytes())
        );
    }

    #[tokio::test]
    async fn test_advance_by_topic_and_number() {
        let state = fixtures::state();
        advance_round(&state, &json!({"topic": "greetings"}))
            .await
            .expect("advance");
        assert_eq!(
            state.ledger.current_round(),
            ExternalNullifier::from_topic("greetings")
        );

        let result = advance_round(&state, &json!({"number": 9})).await.expect("advance");
        assert_eq!(state.ledger.current_round(), ExternalNullifier::from_round(9));
        assert_eq!(result, get_round(&state, &Value::Null).await.expect("round"));
    }

    #[tokio::test]
    async fn test_advance_by_hex() {
        let state = fixtures::state();
        let target = ExternalNullifier::from_round(42);
        advance_round(&state, &json!({"round": hex::encode(target.to_bytes())}))
            .await
            .expect("advance");
        assert_eq!(state.ledger.current_round(), target);
    }

    #[test]
    fn test_parse_round_rejects_ambiguous() {
        assert!(parse_round(&json!({})).is_err());
        assert!(parse_round(&json!({"topic": "a", "number": 1})).is_err());
        assert!(parse_round(&json!({"round": "abcd"})).is_err());
        assert!(parse_round(&json!({"round": "ff".repeat(32)})).is_err());
    }
}
