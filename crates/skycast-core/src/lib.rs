pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{Config, SearchConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, WeatherError};

use anyhow::Result;

/// Initialize logging for the application
///
/// # Errors
/// Fails when a global tracing subscriber is already installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("Skycast core initialized");
    Ok(())
}
