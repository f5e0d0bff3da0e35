//! # Prometheus Metrics
//!
//! Operational metrics for the wallet node, scraped at `/metrics` on the
//! configured metrics port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] so they do not
//! collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are internally reference-counted) so
/// it can be shared across request handlers and background tasks.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total number of balance queries served.
    pub balance_queries_total: IntCounter,
    /// Total number of transactions broadcast to consensus.
    pub broadcasts_total: IntCounter,
    /// Total number of transactions that reached the Final state.
    pub transactions_finalized_total: IntCounter,
    /// Total number of transactions that reached the Rejected state.
    pub transactions_rejected_total: IntCounter,
    /// Number of transactions currently pending settlement.
    pub transactions_pending: IntGauge,
    /// Ledger tip height (advances once per finalized transaction).
    pub ledger_height: IntGauge,
    /// Histogram of broadcast-to-terminal settlement latency in seconds.
    pub settlement_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("umbra".into()), None)
            .expect("failed to create prometheus registry");

        let balance_queries_total = IntCounter::new(
            "balance_queries_total",
            "Total number of wallet_balance queries served",
        )
        .expect("metric creation");
        registry
            .register(Box::new(balance_queries_total.clone()))
            .expect("metric registration");

        let broadcasts_total = IntCounter::new(
            "broadcasts_total",
            "Total number of transactions broadcast to consensus",
        )
        .expect("metric creation");
        registry
            .register(Box::new(broadcasts_total.clone()))
            .expect("metric registration");

        let transactions_finalized_total = IntCounter::new(
            "transactions_finalized_total",
            "Total number of transactions settled as Final",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_finalized_total.clone()))
            .expect("metric registration");

        let transactions_rejected_total = IntCounter::new(
            "transactions_rejected_total",
            "Total number of transactions settled as Rejected",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_rejected_total.clone()))
            .expect("metric registration");

        let transactions_pending = IntGauge::new(
            "transactions_pending",
            "Number of transactions currently awaiting settlement",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_pending.clone()))
            .expect("metric registration");

        let ledger_height = IntGauge::new("ledger_height", "Current ledger tip height")
            .expect("metric creation");
        registry
            .register(Box::new(ledger_height.clone()))
            .expect("metric registration");

        let settlement_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "settlement_latency_seconds",
                "Broadcast-to-terminal settlement latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(settlement_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            balance_queries_total,
            broadcasts_total,
            transactions_finalized_total,
            transactions_rejected_total,
            transactions_pending,
            ledger_height,
            settlement_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
