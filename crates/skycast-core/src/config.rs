use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use skycast_weather::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use skycast_weather::geocode::{DEFAULT_MIN_QUERY_LENGTH, DEFAULT_SUGGESTION_LIMIT};
use skycast_weather::{CategoryClassifier, DayBoundary, LookupOptions, ProviderConfig};

/// Environment variable that overrides `weather.api_key`.
pub const API_KEY_ENV: &str = "SKYCAST_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API and aggregation settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// City search and autocomplete
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// API key for the weather service. `SKYCAST_API_KEY` takes precedence.
    pub api_key: Option<String>,

    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Which calendar days forecast samples are grouped into
    pub day_boundary: DayBoundary,

    /// Category sets for the rainy, sunny and cloudy counts
    pub categories: CategoryClassifier,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            day_boundary: DayBoundary::default(),
            categories: CategoryClassifier::default(),
        }
    }
}

impl WeatherConfig {
    /// True when a non-blank key is set
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Autocomplete stays silent below this many characters
    pub min_query_length: usize,

    /// Maximum number of autocomplete candidates
    pub suggestion_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_length: DEFAULT_MIN_QUERY_LENGTH,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if it doesn't exist, then apply environment overrides.
    ///
    /// # Errors
    /// Fails when the config directory cannot be determined or the file
    /// cannot be read, parsed or created.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load configuration from `path`, writing defaults there if it is missing.
    ///
    /// Environment overrides are not applied.
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed, or the default file
    /// cannot be written.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Creating default config at {}", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Replace the configured key with `value` when it is set and not blank.
    pub fn apply_api_key_override(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            self.weather.api_key = Some(key);
        }
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    ///
    /// # Errors
    /// Fails like [`Config::load`], and when validation reports errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 300 {
            result.add_warning(
                "weather.timeout_secs",
                "Timeout is unusually long (>300 seconds)",
            );
        }

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                format!("API key not set - set it here or via {}", API_KEY_ENV),
            );
        }

        let overlaps = self.weather.categories.overlaps();
        if !overlaps.is_empty() {
            let names: Vec<&str> = overlaps.iter().map(|c| c.as_str()).collect();
            result.add_warning(
                "weather.categories",
                format!(
                    "Categories listed in more than one set count only once: {}",
                    names.join(", ")
                ),
            );
        }

        if self.search.suggestion_limit == 0 {
            result.add_error(
                "search.suggestion_limit",
                "Suggestion limit must be greater than 0",
            );
        }

        if self.search.min_query_length == 0 {
            result.add_warning(
                "search.min_query_length",
                "Every keystroke will query the geocoding service",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Upstream connection settings for the weather crate
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_key: self.weather.api_key.clone(),
            base_url: self.weather.base_url.clone(),
            timeout_secs: self.weather.timeout_secs,
        }
    }

    pub fn lookup_options(&self) -> LookupOptions {
        LookupOptions {
            day_boundary: self.weather.day_boundary,
            classifier: self.weather.categories.clone(),
            min_query_length: self.search.min_query_length,
            suggestion_limit: self.search.suggestion_limit,
        }
    }

    /// Save configuration to the user config directory
    ///
    /// # Errors
    /// Fails like [`Config::save_to`], or when the config directory cannot be
    /// determined.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Write configuration as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    /// Fails when the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// `<config dir>/skycast/config.toml`
    ///
    /// # Errors
    /// Fails when the platform has no config directory.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_weather::WeatherCategory;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        // Default config should be valid (only warnings, no errors)
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.iter().any(|w| w.field == "weather.api_key"));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.base_url = "ftp://api.example.com".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_timeout_and_limit_are_errors() {
        let mut config = Config::default();
        config.weather.timeout_secs = 0;
        config.search.suggestion_limit = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.timeout_secs"));
        assert!(result.errors.iter().any(|e| e.field == "search.suggestion_limit"));
    }

    #[test]
    fn test_overlapping_categories_warn() {
        let mut config = Config::default();
        config.weather.api_key = Some("key".to_string());
        config.weather.categories.sunny.push(WeatherCategory::Rain);
        config.search.min_query_length = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "weather.categories" && w.message.contains("Rain")));
        assert!(result.warnings.iter().any(|w| w.field == "search.min_query_length"));
        assert!(!result.warnings.iter().any(|w| w.field == "weather.api_key"));
    }

    #[test]
    fn test_api_key_override() {
        let mut config = Config::default();
        config.weather.api_key = Some("from-file".to_string());

        config.apply_api_key_override(Some("   ".to_string()));
        assert_eq!(config.weather.api_key.as_deref(), Some("from-file"));

        config.apply_api_key_override(None);
        assert_eq!(config.weather.api_key.as_deref(), Some("from-file"));

        config.apply_api_key_override(Some("from-env".to_string()));
        assert_eq!(config.weather.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skycast").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.weather, WeatherConfig::default());

        // Reloading the written file yields the same settings
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.weather, config.weather);
        assert_eq!(reloaded.search, config.search);
    }

    #[test]
    fn test_saved_file_holds_only_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("config_dir"));
        assert!(contents.contains("[weather]"));
        assert!(contents.contains("[search]"));
    }

    #[test]
    fn test_config_path_is_under_skycast() {
        if let Ok(path) = Config::config_path() {
            assert!(path.ends_with("skycast/config.toml"));
        }
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[weather]
api_key = "abc123"
day_boundary = "utc"

[weather.categories]
rain = ["Rain"]

[search]
suggestion_limit = 8
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.weather.day_boundary, DayBoundary::Utc);
        assert_eq!(config.weather.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.weather.categories.rain, vec![WeatherCategory::Rain]);
        assert_eq!(config.search.suggestion_limit, 8);
        assert_eq!(config.search.min_query_length, DEFAULT_MIN_QUERY_LENGTH);

        let options = config.lookup_options();
        assert_eq!(options.suggestion_limit, 8);
        assert_eq!(options.day_boundary, DayBoundary::Utc);
        assert_eq!(config.provider_config().api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\napi_key = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
