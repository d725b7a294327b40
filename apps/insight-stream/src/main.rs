//! Insight Stream Binary
//!
//! Starts the market data ingestion and insight detection service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin insight-stream
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FINNHUB_TOKEN`: Finnhub API token
//!
//! ## Optional
//! - `WATCH_SYMBOLS`: Comma-separated symbols (default: AAPL,MSFT,AMZN)
//! - `PRICE_CHANGE_THRESHOLD`: Insight threshold in percent (default: 1.0)
//! - `FINNHUB_WS_URL`: Feed endpoint (default: wss://ws.finnhub.io)
//! - `INSIGHT_HTTP_PORT`: Query API port (default: 8000)
//! - `RECONNECT_DELAY_INITIAL_MS`: Initial backoff (default: 500)
//! - `RECONNECT_DELAY_MAX_SECS`: Backoff cap (default: 30)
//! - `RECONNECT_DELAY_MULTIPLIER`: Backoff multiplier (default: 2.0)
//! - `MAX_RECONNECT_ATTEMPTS`: 0 = unlimited (default: 0)
//! - `EVENT_CHANNEL_CAPACITY`: Connector-to-ingest channel (default: 1024)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use insight_stream::infrastructure::{metrics, telemetry};
use insight_stream::{
    ApiServer, ApiState, AppConfig, ConnectorConfig, FeedConnector, FeedEvent, FeedStatus,
    InsightDetector, MarketStore, ReconnectConfig,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    telemetry::init();

    tracing::info!("Starting Insight Stream");

    let _metrics_handle = metrics::init_metrics();

    let config = AppConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let store = Arc::new(MarketStore::new());
    let detector = InsightDetector::new(config.ingest.threshold_percent);
    let status = Arc::new(FeedStatus::new());

    // Feed connector
    let mut connector_config = ConnectorConfig::new(
        &config.websocket.url,
        config.credentials.token(),
        &config.ingest.symbols,
    );
    connector_config.reconnect = ReconnectConfig {
        initial_delay: config.websocket.reconnect_delay_initial,
        max_delay: config.websocket.reconnect_delay_max,
        multiplier: config.websocket.reconnect_delay_multiplier,
        max_attempts: config.websocket.max_reconnect_attempts,
        ..ReconnectConfig::default()
    };

    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(config.ingest.event_channel_capacity);
    let connector = Arc::new(FeedConnector::new(
        connector_config,
        event_tx,
        shutdown_token.clone(),
        Arc::clone(&status),
    ));

    // Ingest task: sole writer of the market store
    let ingest_store = Arc::clone(&store);
    tokio::spawn(async move {
        ingest_events(event_rx, ingest_store, detector).await;
    });

    // Feed connector task
    let connector_clone = Arc::clone(&connector);
    tokio::spawn(async move {
        if let Err(e) = connector_clone.run().await {
            tracing::error!(error = %e, "feed connector error");
        }
    });

    // HTTP API (queries + health + metrics)
    let api_state = ApiState::new(Arc::clone(&store), Arc::clone(&status));
    let api_server = ApiServer::new(config.api.port, api_state);
    let api_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            tracing::error!(error = %e, "api server error");
        }
    });

    tracing::info!("Insight stream ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Insight stream stopped");
    Ok(())
}

/// Drain connector events into the market store.
async fn ingest_events(
    mut rx: mpsc::Receiver<FeedEvent>,
    store: Arc<MarketStore>,
    detector: InsightDetector,
) {
    while let Some(event) = rx.recv().await {
        match event {
            FeedEvent::Connected => {
                tracing::info!("feed connected");
            }
            FeedEvent::Disconnected => {
                tracing::warn!("feed disconnected");
            }
            FeedEvent::Reconnecting { attempt } => {
                tracing::info!(attempt, "feed reconnecting");
            }
            FeedEvent::Trade(trade) => {
                if let Some(insight) = store.record_trade(trade, &detector) {
                    metrics::record_insight_emitted();
                    tracing::info!(
                        symbol = %insight.symbol,
                        percent_change = %insight.percent_change,
                        reference_price = %insight.reference_price,
                        new_price = %insight.new_price,
                        "insight recorded"
                    );
                }
            }
            FeedEvent::Error(msg) => {
                tracing::error!(error = %msg, "feed error");
            }
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &AppConfig) {
    tracing::info!(
        symbols = ?config.ingest.symbols,
        threshold_percent = %config.ingest.threshold_percent,
        http_port = config.api.port,
        feed_url = %config.websocket.url,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
