//! # JSON-RPC + REST API
//!
//! Builds the axum router that exposes the wallet engine over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path      | Description                        |
//! |--------|-----------|------------------------------------|
//! | GET    | `/health` | Liveness probe                     |
//! | GET    | `/status` | Node status summary                |
//! | POST   | `/rpc`    | JSON-RPC 2.0 gateway               |
//!
//! ## RPC methods
//!
//! - `wallet_balance([{name, passphrase}])` — settled balance as a decimal
//!   string in base units. No floats cross this API, ever.
//! - `wallet_sendtoaddress([{name, passphrase}, to_address, amount])` —
//!   builds, signs, and broadcasts a transfer; returns the transaction id
//!   at broadcast acceptance. Settlement is asynchronous.
//! - `wallet_address([{name, passphrase}])` — the wallet's receiving
//!   address.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use umbra_wallet::{SendRequest, WalletError, WalletRequest, WalletService};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network identifier (currently always "devnet").
    pub network: String,
    /// The wallet engine: ledger, settlement, broadcast, the lot.
    pub service: Arc<WalletService>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Positional method parameters.
    pub params: Option<serde_json::Value>,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    /// Maps wallet failures onto the JSON-RPC error space. Malformed
    /// request material (keys, addresses, amounts) keeps the
    /// invalid-params code; domain failures like insufficient funds or a
    /// rejected broadcast become application errors with the full display
    /// chain as the message.
    fn from_wallet(err: WalletError) -> Self {
        let code = match err {
            WalletError::Key(_) | WalletError::Address(_) | WalletError::Amount(_) => -32602,
            _ => -32000,
        };
        Self {
            code,
            message: err.to_string(),
            data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Network identifier.
    pub network: String,
    /// Current ledger tip height.
    pub ledger_height: u64,
    /// Total outputs recorded in the ledger, spent and unspent.
    pub output_count: usize,
    /// Transactions awaiting settlement.
    pub pending_transactions: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not inspect the wallet engine — that belongs
/// in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns a node status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = StatusResponse {
        version: state.version.clone(),
        network: state.network.clone(),
        ledger_height: state.service.ledger().tip_height(),
        output_count: state.service.ledger().output_count(),
        pending_transactions: state.service.scheduler().pending_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `POST /rpc` — JSON-RPC 2.0 gateway.
///
/// Routes method calls to the wallet service. Unknown methods return
/// error code -32601 (Method not found).
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code: -32600,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            }),
            id: req.id,
        });
    }

    let outcome = match req.method.as_str() {
        "wallet_balance" => handle_balance(&state, req.params.as_ref()),
        "wallet_address" => handle_address(&state, req.params.as_ref()),
        "wallet_sendtoaddress" => handle_send(&state, req.params.as_ref()).await,
        other => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {other}"),
            data: None,
        }),
    };

    let (result, error) = match outcome {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    };
    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

/// `wallet_balance` — params `[{name, passphrase}]`.
fn handle_balance(
    state: &AppState,
    params: Option<&serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    let wallet = decode_wallet_param(params)?;
    state.metrics.balance_queries_total.inc();
    let balance = state
        .service
        .wallet_balance(&wallet)
        .map_err(JsonRpcError::from_wallet)?;
    Ok(serde_json::json!(balance))
}

/// `wallet_address` — params `[{name, passphrase}]`.
fn handle_address(
    state: &AppState,
    params: Option<&serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    let wallet = decode_wallet_param(params)?;
    let address = state
        .service
        .wallet_address(&wallet)
        .map_err(JsonRpcError::from_wallet)?;
    Ok(serde_json::json!(address))
}

/// `wallet_sendtoaddress` — params `[{name, passphrase}, to_address, amount]`.
///
/// Returns the transaction id once the broadcast is *accepted*; the
/// settlement pipeline finalizes it asynchronously. Clients poll
/// `wallet_balance` to observe the move.
async fn handle_send(
    state: &AppState,
    params: Option<&serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    let params = positional(params)?;
    if params.len() != 3 {
        return Err(JsonRpcError::invalid_params(
            "expected [{name, passphrase}, to_address, amount]",
        ));
    }
    let wallet: WalletRequest = serde_json::from_value(params[0].clone())
        .map_err(|e| JsonRpcError::invalid_params(format!("bad wallet request: {e}")))?;
    let to_address = params[1]
        .as_str()
        .ok_or_else(|| JsonRpcError::invalid_params("to_address must be a string"))?
        .to_string();
    let amount = params[2]
        .as_str()
        .ok_or_else(|| {
            JsonRpcError::invalid_params("amount must be a decimal string, not a number")
        })?
        .to_string();

    let tx_id = state
        .service
        .wallet_sendtoaddress(&SendRequest {
            wallet,
            to_address,
            amount,
        })
        .await
        .map_err(JsonRpcError::from_wallet)?;
    state.metrics.broadcasts_total.inc();
    Ok(serde_json::json!(tx_id))
}

/// Extracts the positional params array.
fn positional(params: Option<&serde_json::Value>) -> Result<&Vec<serde_json::Value>, JsonRpcError> {
    params
        .and_then(|p| p.as_array())
        .ok_or_else(|| JsonRpcError::invalid_params("expected positional params"))
}

/// Decodes the single `{name, passphrase}` param shared by the read-only
/// wallet methods.
fn decode_wallet_param(params: Option<&serde_json::Value>) -> Result<WalletRequest, JsonRpcError> {
    let params = positional(params)?;
    let first = params
        .first()
        .ok_or_else(|| JsonRpcError::invalid_params("expected [{name, passphrase}]"))?;
    serde_json::from_value(first.clone())
        .map_err(|e| JsonRpcError::invalid_params(format!("bad wallet request: {e}")))
}

// ---------------------------------------------------------------------------
// Settlement metrics pump
// ---------------------------------------------------------------------------

/// Forwards settlement events into the Prometheus metrics until the
/// service is dropped. Spawn once at startup.
pub async fn pump_settlement_metrics(service: Arc<WalletService>, metrics: SharedMetrics) {
    use umbra_wallet::settlement::SettlementState;

    let mut events = service.scheduler().subscribe();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(missed = n, "settlement metrics pump lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        match event.state {
            SettlementState::Final { height } => {
                metrics.transactions_finalized_total.inc();
                metrics.ledger_height.set(height as i64);
            }
            SettlementState::Rejected { .. } => {
                metrics.transactions_rejected_total.inc();
            }
            SettlementState::Pending => continue,
        }

        metrics
            .transactions_pending
            .set(service.scheduler().pending_count() as i64);

        // Latency from transaction build time to its terminal state.
        if let Some(tx) = service.scheduler().transaction(&event.tx_id) {
            let now_ms = chrono::Utc::now().timestamp_millis() as u64;
            let elapsed_ms = now_ms.saturating_sub(tx.timestamp);
            metrics
                .settlement_latency_seconds
                .observe(elapsed_ms as f64 / 1_000.0);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
