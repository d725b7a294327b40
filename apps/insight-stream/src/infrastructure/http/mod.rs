//! HTTP Query API
//!
//! axum router serving the market-data snapshot and insight log, plus the
//! service's health and metrics endpoints on the same port.
//!
//! # Endpoints
//!
//! - `GET /market-data/` returns every symbol's latest quote
//! - `GET /market-data/{symbol}/` returns one quote or 404
//! - `GET /insights/` returns the filtered, paginated insight log
//! - `GET /insights/{symbol}/` same, pre-filtered to one symbol
//! - `GET /health` JSON status, `GET /healthz` liveness, `GET /readyz`
//!   readiness (feed connected), `GET /metrics` Prometheus text

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::query::{InsightQuery, QueryError};
use crate::application::store::MarketStore;
use crate::domain::market::{Direction, Insight, Trade, normalize_symbol};
use crate::infrastructure::finnhub::FeedStatus;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Errors
// =============================================================================

/// API server error.
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    /// Failed to bind the listen address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Server terminated with an error.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

// =============================================================================
// Shared state
// =============================================================================

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Quote and insight storage.
    pub store: Arc<MarketStore>,
    /// Feed connection status, for health reporting.
    pub status: Arc<FeedStatus>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl ApiState {
    /// Create handler state over the shared store and feed status.
    #[must_use]
    pub fn new(store: Arc<MarketStore>, status: Arc<FeedStatus>) -> Self {
        Self {
            store,
            status,
            started_at: Instant::now(),
        }
    }
}

// =============================================================================
// Response shapes
// =============================================================================

/// Latest quote as rendered in responses.
#[derive(Debug, Serialize)]
struct QuoteView {
    price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<Decimal>,
    timestamp_ms: i64,
}

impl From<Trade> for QuoteView {
    fn from(trade: Trade) -> Self {
        Self {
            price: trade.price,
            volume: trade.volume,
            timestamp_ms: trade.timestamp_ms,
        }
    }
}

/// Insight as rendered in responses, with derived datetime and message.
#[derive(Debug, Serialize)]
struct InsightView {
    id: u64,
    symbol: String,
    reference_price: Decimal,
    new_price: Decimal,
    percent_change: Decimal,
    price_change: Decimal,
    direction: Direction,
    timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    datetime_utc: Option<DateTime<Utc>>,
    message: String,
}

impl From<Insight> for InsightView {
    fn from(insight: Insight) -> Self {
        Self {
            price_change: insight.price_change(),
            datetime_utc: insight.datetime_utc(),
            message: insight.message(),
            id: insight.id,
            symbol: insight.symbol,
            reference_price: insight.reference_price,
            new_price: insight.new_price,
            percent_change: insight.percent_change,
            direction: insight.direction,
            timestamp_ms: insight.timestamp_ms,
        }
    }
}

#[derive(Debug, Serialize)]
struct AllMarketDataResponse {
    all_market_data: BTreeMap<String, QuoteView>,
}

#[derive(Debug, Serialize)]
struct SymbolMarketDataResponse {
    symbol: String,
    data: QuoteView,
}

#[derive(Debug, Serialize)]
struct InsightListResponse {
    count: usize,
    results: Vec<InsightView>,
}

#[derive(Debug, Serialize)]
struct SymbolInsightsResponse {
    symbol: String,
    insights: Vec<InsightView>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            error: message.into(),
        })
    }
}

/// Raw insight query parameters, validated into an [`InsightQuery`].
#[derive(Debug, Default, Deserialize)]
struct InsightParams {
    symbol: Option<String>,
    from_timestamp: Option<i64>,
    to_timestamp: Option<i64>,
    limit: Option<i64>,
    offset: Option<i64>,
}

fn query_error_response(err: &QueryError) -> Response {
    (StatusCode::BAD_REQUEST, ErrorResponse::new(err.to_string())).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

async fn all_market_data(State(state): State<ApiState>) -> Json<AllMarketDataResponse> {
    let all_market_data = state
        .store
        .all_latest()
        .into_iter()
        .map(|(symbol, trade)| (symbol, QuoteView::from(trade)))
        .collect();
    Json(AllMarketDataResponse { all_market_data })
}

async fn symbol_market_data(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
) -> Response {
    match state.store.latest(&symbol) {
        Some(trade) => {
            let symbol = trade.symbol.clone();
            Json(SymbolMarketDataResponse {
                symbol,
                data: QuoteView::from(trade),
            })
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("No data for symbol {}", normalize_symbol(&symbol))),
        )
            .into_response(),
    }
}

async fn list_insights(
    State(state): State<ApiState>,
    Query(params): Query<InsightParams>,
) -> Response {
    let query = match InsightQuery::new(
        params.symbol.as_deref(),
        params.from_timestamp,
        params.to_timestamp,
        params.limit,
        params.offset,
    ) {
        Ok(query) => query,
        Err(err) => return query_error_response(&err),
    };

    let results: Vec<InsightView> = state
        .store
        .query_insights(&query)
        .into_iter()
        .map(InsightView::from)
        .collect();
    Json(InsightListResponse {
        count: results.len(),
        results,
    })
    .into_response()
}

async fn symbol_insights(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
    Query(params): Query<InsightParams>,
) -> Response {
    let query = match InsightQuery::new(
        Some(&symbol),
        params.from_timestamp,
        params.to_timestamp,
        params.limit,
        params.offset,
    ) {
        Ok(query) => query,
        Err(err) => return query_error_response(&err),
    };

    let insights: Vec<InsightView> = state
        .store
        .query_insights(&query)
        .into_iter()
        .map(InsightView::from)
        .collect();
    Json(SymbolInsightsResponse {
        symbol: normalize_symbol(&symbol),
        insights,
    })
    .into_response()
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    connection_state: &'static str,
    messages_received: u64,
    messages_dropped: u64,
    trades_ingested: u64,
    reconnect_attempts: i32,
    insight_count: usize,
    uptime_secs: u64,
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let connection = state.status.state();
    Json(HealthResponse {
        status: "ok",
        connection_state: connection.as_str(),
        messages_received: state.status.messages_received(),
        messages_dropped: state.status.messages_dropped(),
        trades_ingested: state.status.trades_ingested(),
        reconnect_attempts: state.status.reconnect_attempts(),
        insight_count: state.store.insight_count(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

async fn healthz() -> &'static str {
    "OK"
}

async fn readyz(State(state): State<ApiState>) -> Response {
    if state.status.state().is_connected() {
        (StatusCode::OK, "READY").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY").into_response()
    }
}

async fn metrics() -> Response {
    match get_metrics_handle() {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not initialized",
        )
            .into_response(),
    }
}

// =============================================================================
// Router and server
// =============================================================================

/// Build the API router over the shared state.
#[must_use]
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/market-data", get(all_market_data))
        .route("/market-data/", get(all_market_data))
        .route("/market-data/{symbol}", get(symbol_market_data))
        .route("/market-data/{symbol}/", get(symbol_market_data))
        .route("/insights", get(list_insights))
        .route("/insights/", get(list_insights))
        .route("/insights/{symbol}", get(symbol_insights))
        .route("/insights/{symbol}/", get(symbol_insights))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// HTTP API server.
pub struct ApiServer {
    port: u16,
    state: ApiState,
}

impl ApiServer {
    /// Create a server that will listen on the given port.
    #[must_use]
    pub fn new(port: u16, state: ApiState) -> Self {
        Self { port, state }
    }

    /// Bind and serve until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address cannot be bound or the
    /// server terminates abnormally.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ApiServerError> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|source| ApiServerError::Bind {
                    addr: addr.clone(),
                    source,
                })?;
        info!(addr = %addr, "api server listening");

        let app = router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                info!("api server shutting down");
            })
            .await?;

        Ok(())
    }
}
