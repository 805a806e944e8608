//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! line-delimited JSON-RPC calls to the command handlers. Subscriptions
//! push `signal_accepted` notifications down the same connection.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

/// Outbound lines buffered per connection.
const OUTBOUND_CAPACITY: usize = 256;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Server-initiated notification (no `id`).
#[derive(Debug, Serialize)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcNotification {
    pub fn new(method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        }
    }
}

impl RpcError {
    fn named(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::named(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::named(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::named(
            -32601,
            "METHOD_NOT_FOUND",
            Some(serde_json::json!({"method": method})),
        )
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::named(
            -32602,
            "INVALID_PARAMS",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::named(
            -32603,
            "INTERNAL_ERROR",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Submission refused: invalid proof or spent nullifier (-32050).
    ///
    /// Both causes share this code. Only the audit log tells them apart.
    pub fn proof_rejected() -> Self {
        Self::named(-32050, "PROOF_REJECTED", None)
    }

    /// Proof built against a root outside the accepted window (-32051).
    pub fn unknown_root() -> Self {
        Self::named(-32051, "UNKNOWN_ROOT", None)
    }

    /// Commitment already registered (-32052).
    pub fn duplicate_commitment(leaf_index: usize) -> Self {
        Self::named(
            -32052,
            "DUPLICATE_COMMITMENT",
            Some(serde_json::json!({"leaf_index": leaf_index})),
        )
    }

    /// Membership tree is full (-32053).
    pub fn capacity_exceeded(capacity: u64) -> Self {
        Self::named(
            -32053,
            "CAPACITY_EXCEEDED",
            Some(serde_json::json!({"capacity": capacity})),
        )
    }

    /// Unknown subscription id (-32054).
    pub fn unknown_subscription(id: u64) -> Self {
        Self::named(
            -32054,
            "UNKNOWN_SUBSCRIPTION",
            Some(serde_json::json!({"subscription": id})),
        )
    }
}

/// Per-connection state: the outbound line queue and live subscriptions.
pub struct Session {
    outbound: mpsc::Sender<String>,
    subscriptions: HashMap<u64, oneshot::Sender<()>>,
}

impl Session {
    pub fn new(outbound: mpsc::Sender<String>) -> Self {
        Self {
            outbound,
            subscriptions: HashMap::new(),
        }
    }

    pub fn outbound(&self) -> mpsc::Sender<String> {
        self.outbound.clone()
    }

    pub fn add_subscription(&mut self, id: u64, stop: oneshot::Sender<()>) {
        self.subscriptions.insert(id, stop);
    }

    /// Stop a subscription. `false` if this connection does not own `id`.
    pub fn remove_subscription(&mut self, id: u64) -> bool {
        match self.subscriptions.remove(&id) {
            Some(stop) => {
                let _ = stop.send(());
                true
            }
            None => false,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(socket = %self.socket_path.display(), "IPC server listening");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);

    let write_task = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            line.push('\n');
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(tx.clone());
    let mut line = String::new();
    let result = loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(e.into()),
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(&state, &mut session, request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };
        let response_json = serde_json::to_string(&response)?;
        if tx.send(response_json).await.is_err() {
            break Ok(());
        }
    };

    // Dropping the session stops every forwarding task of this connection.
    drop(session);
    drop(tx);
    let _ = write_task.await;
    result
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(
    state: &Arc<DaemonState>,
    session: &mut Session,
    request: RpcRequest,
) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    let method = request.method.as_str();
    let params = &request.params;

    debug!(method, "dispatching RPC method");

    let result = match method {
        // Signals
        "submit_signal" => commands::signals::submit_signal(state, params).await,
        "get_latest_signal" => commands::signals::get_latest_signal(state, params).await,
        "subscribe_signals" => commands::signals::subscribe_signals(state, session, params).await,
        "unsubscribe_signals" => {
            commands::signals::unsubscribe_signals(state, session, params).await
        }

        // Registry
        "get_root" => commands::registry::get_root(state, params).await,
        "get_commitments" => commands::registry::get_commitments(state, params).await,
        "register_commitment" => commands::registry::register_commitment(state, params).await,

        // Rounds
        "get_round" => commands::round::get_round(state, params).await,
        "advance_round" => commands::round::advance_round(state, params).await,

        // Daemon
        "shutdown" => {
            info!("shutdown requested over RPC");
            let _ = state.shutdown_tx.send(());
            Ok(serde_json::json!({}))
        }

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(RpcError::parse_error().code, -32700);
        assert_eq!(RpcError::invalid_request().code, -32600);
        assert_eq!(RpcError::method_not_found("x").code, -32601);
        assert_eq!(RpcError::invalid_params("x").code, -32602);
        assert_eq!(RpcError::internal_error("x").code, -32603);
        assert_eq!(RpcError::proof_rejected().code, -32050);
        assert_eq!(RpcError::unknown_root().code, -32051);
    }

    #[test]
    fn test_rpc_response_success() {
        let resp = RpcResponse::success(serde_json::json!(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&resp).expect("serialize");
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_rpc_response_error() {
        let resp = RpcResponse::error(serde_json::json!(1), RpcError::proof_rejected());
        let json = serde_json::to_string(&resp).expect("serialize");
        assert!(json.contains("PROOF_REJECTED"));
        assert!(!json.contains("\"result\""));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_rpc_request_params_default() {
        let req: RpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"method":"get_root"}"#)
                .expect("parse");
        assert_eq!(req.method, "get_root");
        assert!(req.params.is_null());
    }

    #[test]
    fn test_notification_has_no_id() {
        let note = RpcNotification::new("signal_accepted", serde_json::json!({"subscription": 1}));
        let json = serde_json::to_string(&note).expect("serialize");
        assert!(!json.contains("\"id\""));
        assert!(json.contains("signal_accepted"));
    }

    #[tokio::test]
    async fn test_session_subscriptions() {
        let (tx, _rx) = mpsc::channel(1);
        let mut session = Session::new(tx);
        let (stop_tx, stop_rx) = oneshot::channel();
        session.add_subscription(5, stop_tx);
        assert_eq!(session.subscription_count(), 1);
        assert!(!session.remove_subscription(6));
        assert!(session.remove_subscription(5));
        assert!(stop_rx.await.is_ok());
        assert_eq!(session.subscription_count(), 0);
    }
}
