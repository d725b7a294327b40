//! Service Configuration Settings
//!
//! Configuration types loaded from environment variables. A missing or
//! empty `FINNHUB_TOKEN` is a fatal startup error; everything else has a
//! sensible default.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::market::normalize_symbol;

/// Default symbols watched when `WATCH_SYMBOLS` is not set.
const DEFAULT_SYMBOLS: &[&str] = &["AAPL", "MSFT", "AMZN"];

/// Default significant-change threshold, in percent.
const DEFAULT_THRESHOLD_PERCENT: &str = "1.0";

/// Finnhub API credentials.
#[derive(Clone)]
pub struct FeedCredentials {
    token: String,
}

impl FeedCredentials {
    /// Create credentials from a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ConfigError::EmptyValue("FINNHUB_TOKEN".to_string()));
        }
        Ok(Self { token })
    }

    /// Get the API token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for FeedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedCredentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Feed endpoint (no token).
    pub url: String,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            url: "wss://ws.finnhub.io".to_string(),
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            max_reconnect_attempts: 0, // Unlimited
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Symbols to watch (upper-case).
    pub symbols: Vec<String>,
    /// Significant-change threshold, in percent.
    pub threshold_percent: Decimal,
    /// Capacity of the connector-to-ingest event channel.
    pub event_channel_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| (*s).to_string()).collect(),
            threshold_percent: Decimal::ONE,
            event_channel_capacity: 1024,
        }
    }
}

/// API server settings.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// HTTP port for the query API, health, and metrics.
    pub port: u16,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Feed credentials.
    pub credentials: FeedCredentials,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Ingestion settings.
    pub ingest: IngestSettings,
    /// API server settings.
    pub api: ApiSettings,
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FINNHUB_TOKEN` is missing or empty, the
    /// watched symbol list is empty, or the threshold is not a positive
    /// decimal.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("FINNHUB_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("FINNHUB_TOKEN".to_string()))?;
        let credentials = FeedCredentials::new(token)?;

        let symbols = match std::env::var("WATCH_SYMBOLS") {
            Ok(raw) => parse_symbols(&raw)?,
            Err(_) => IngestSettings::default().symbols,
        };

        let threshold_raw = std::env::var("PRICE_CHANGE_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_THRESHOLD_PERCENT.to_string());
        let threshold_percent = threshold_raw
            .parse::<Decimal>()
            .map_err(|_| ConfigError::InvalidThreshold(threshold_raw.clone()))?;
        if threshold_percent <= Decimal::ZERO {
            return Err(ConfigError::InvalidThreshold(threshold_raw));
        }

        let websocket = WebSocketSettings {
            url: std::env::var("FINNHUB_WS_URL")
                .unwrap_or_else(|_| WebSocketSettings::default().url),
            reconnect_delay_initial: parse_env_duration_millis(
                "RECONNECT_DELAY_INITIAL_MS",
                WebSocketSettings::default().reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "RECONNECT_DELAY_MAX_SECS",
                WebSocketSettings::default().reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env_f64(
                "RECONNECT_DELAY_MULTIPLIER",
                WebSocketSettings::default().reconnect_delay_multiplier,
            ),
            max_reconnect_attempts: parse_env_u32(
                "MAX_RECONNECT_ATTEMPTS",
                WebSocketSettings::default().max_reconnect_attempts,
            ),
        };

        let ingest = IngestSettings {
            symbols,
            threshold_percent,
            event_channel_capacity: parse_env_usize(
                "EVENT_CHANNEL_CAPACITY",
                IngestSettings::default().event_channel_capacity,
            ),
        };

        let api = ApiSettings {
            port: parse_env_u16("INSIGHT_HTTP_PORT", ApiSettings::default().port),
        };

        Ok(Self {
            credentials,
            websocket,
            ingest,
            api,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Watched symbol list parsed to nothing.
    #[error("WATCH_SYMBOLS must contain at least one symbol")]
    NoSymbols,
    /// Threshold is not a positive decimal.
    #[error("PRICE_CHANGE_THRESHOLD must be a positive decimal, got {0:?}")]
    InvalidThreshold(String),
}

fn parse_symbols(raw: &str) -> Result<Vec<String>, ConfigError> {
    let symbols: Vec<String> = raw
        .split(',')
        .map(normalize_symbol)
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(ConfigError::NoSymbols);
    }
    Ok(symbols)
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
