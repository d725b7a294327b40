//! Prometheus Metrics Module
//!
//! Application metrics rendered at `/metrics` on the API port.
//!
//! # Metrics
//!
//! - `insight_stream_messages_received_total`: inbound feed frames
//! - `insight_stream_trades_ingested_total`: validated trades forwarded
//! - `insight_stream_messages_dropped_total`: dropped trade items
//! - `insight_stream_decode_failures_total`: undecodable frames
//! - `insight_stream_reconnects_total`: reconnect attempts
//! - `insight_stream_insights_emitted_total`: insights appended to the log
//! - `insight_stream_connection_state`: current connector state (enum gauge)

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::infrastructure::finnhub::ConnectionState;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "insight_stream_messages_received_total",
        "Total frames received from the feed"
    );
    describe_counter!(
        "insight_stream_trades_ingested_total",
        "Total validated trades forwarded to the store"
    );
    describe_counter!(
        "insight_stream_messages_dropped_total",
        "Total trade items dropped by validation"
    );
    describe_counter!(
        "insight_stream_decode_failures_total",
        "Total frames that failed to decode"
    );
    describe_counter!(
        "insight_stream_reconnects_total",
        "Total feed reconnection attempts"
    );
    describe_counter!(
        "insight_stream_insights_emitted_total",
        "Total insights appended to the log"
    );
    describe_gauge!(
        "insight_stream_connection_state",
        "Current feed connection state (one-hot per state label)"
    );
}

/// Record one inbound feed frame.
pub fn record_message_received() {
    counter!("insight_stream_messages_received_total").increment(1);
}

/// Record one validated trade forwarded downstream.
pub fn record_trade_ingested() {
    counter!("insight_stream_trades_ingested_total").increment(1);
}

/// Record one dropped trade item.
pub fn record_message_dropped() {
    counter!("insight_stream_messages_dropped_total").increment(1);
}

/// Record one undecodable frame.
pub fn record_decode_failure() {
    counter!("insight_stream_decode_failures_total").increment(1);
}

/// Record one reconnect attempt.
pub fn record_reconnect() {
    counter!("insight_stream_reconnects_total").increment(1);
}

/// Record one emitted insight.
pub fn record_insight_emitted() {
    counter!("insight_stream_insights_emitted_total").increment(1);
}

/// Update the connection state gauge (one-hot across state labels).
pub fn set_connection_state(state: ConnectionState) {
    for candidate in [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Subscribed,
        ConnectionState::Streaming,
    ] {
        let value = if candidate == state { 1.0 } else { 0.0 };
        gauge!(
            "insight_stream_connection_state",
            "state" => candidate.as_str()
        )
        .set(value);
    }
}
