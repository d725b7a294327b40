//! Configuration
//!
//! Environment-driven service configuration.

mod settings;

pub use settings::{
    ApiSettings, AppConfig, ConfigError, FeedCredentials, IngestSettings, WebSocketSettings,
};
