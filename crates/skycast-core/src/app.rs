use std::sync::Arc;

use skycast_weather::{FetchOutcome, Location, LookupReport, LookupStatus, Panel, WeatherLookup};

use crate::error::{AppError, ConfigError};
use crate::Config;

/// Main application state: validated configuration plus the lookup
/// coordinator every view goes through.
pub struct App {
    config: Arc<Config>,
    lookup: WeatherLookup,
}

impl App {
    /// Load configuration from disk and build the application.
    ///
    /// # Errors
    /// `AppError::Other` when the config file cannot be loaded or fails
    /// validation, otherwise as [`App::new`].
    pub fn load() -> Result<Self, AppError> {
        let (config, _) = Config::load_validated()?;
        Self::new(config)
    }

    /// Create a new application instance from `config`.
    ///
    /// # Errors
    /// `ConfigError::Invalid` when validation reports errors,
    /// `ConfigError::MissingSetting` when no API key is configured.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }
        if !config.weather.has_api_key() {
            return Err(ConfigError::MissingSetting("weather.api_key".to_string()).into());
        }

        let lookup = WeatherLookup::from_config(&config.provider_config(), config.lookup_options())?;
        tracing::info!("Skycast ready, using {}", config.weather.base_url);

        Ok(Self {
            config: Arc::new(config),
            lookup,
        })
    }

    /// Look up a city and commit the result if no newer search started.
    pub async fn search(&self, query: &str) -> LookupStatus {
        self.lookup.lookup(query).await
    }

    pub async fn suggest(&self, query: &str) -> FetchOutcome<Vec<Location>> {
        self.lookup.suggest(query).await
    }

    /// Re-fetch one panel of the current report.
    pub async fn retry(&self, panel: Panel) -> Option<LookupStatus> {
        self.lookup.retry_panel(panel).await
    }

    pub fn latest(&self) -> Option<Arc<LookupReport>> {
        self.lookup.latest()
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lookup(&self) -> &WeatherLookup {
        &self.lookup
    }
}
