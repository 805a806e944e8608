//! Signal submission and acceptance feed commands.

use std::sync::Arc;

use murmur_types::wire::SubmitRequest;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use super::{ledger_error, u64_param, Result};
use crate::rpc::{RpcError, RpcNotification, Session};
use crate::DaemonState;

/// Notification method carrying an accepted signal.
pub const SIGNAL_ACCEPTED: &str = "signal_accepted";

/// Verify and record a signal.
///
/// Params are a [`SubmitRequest`]. Proof checking runs on the blocking pool.
pub async fn submit_signal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let request: SubmitRequest = serde_json::from_value(params.clone())
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    let ledger = state.ledger.clone();
    let receipt = tokio::task::spawn_blocking(move || ledger.submit(&request))
        .await
        .map_err(|e| RpcError::internal_error(&e.to_string()))?
        .map_err(ledger_error)?;
    serde_json::to_value(receipt).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// The most recently accepted signal, or `null`.
pub async fn get_latest_signal(state: &Arc<DaemonState>, _params: &Value) -> Result {
    Ok(json!({ "signal": state.ledger.latest_signal() }))
}

/// Stream acceptance events to this connection.
pub async fn subscribe_signals(
    state: &Arc<DaemonState>,
    session: &mut Session,
    _params: &Value,
) -> Result {
    let mut subscription = state.ledger.subscribe();
    let id = subscription.id();
    let outbound = session.outbound();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = subscription.next() => {
                    let Some(event) = event else { break };
                    let note = RpcNotification::new(
                        SIGNAL_ACCEPTED,
                        json!({ "subscription": id, "event": event }),
                    );
                    let line = match serde_json::to_string(&note) {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::warn!(subscription = id, error = %e, "failed to encode event");
                            continue;
                        }
                    };
                    if outbound.send(line).await.is_err() {
                        break;
                    }
                }
                _ = &mut stop_rx => break,
            }
        }
        subscription.unsubscribe();
    });

    session.add_subscription(id, stop_tx);
    Ok(json!({ "subscription": id }))
}

/// Stop a subscription opened on this connection.
pub async fn unsubscribe_signals(
    _state: &Arc<DaemonState>,
    session: &mut Session,
    params: &Value,
) -> Result {
    let id = u64_param(params, "subscription")?;
    if session.remove_subscription(id) {
        tracing::debug!(
            subscription = id,
            remaining = session.subscription_count(),
            "subscription stopped"
        );
        Ok(json!({ "unsubscribed": id }))
    } else {
        Err(RpcError::unknown_subscription(id))
    }
}
