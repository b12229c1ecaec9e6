//! Weather-specific error types.

use thiserror::Error;

/// Errors from the resolver, the fetcher and the lookup coordinator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeatherError {
    #[error("No location matches '{0}'")]
    NotFound(String),

    #[error("No forecast data to aggregate")]
    EmptyInput,

    #[error("Transport failure: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl WeatherError {
    pub(crate) fn status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = if body.is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, body)
        };
        Self::Transport {
            status: Some(status.as_u16()),
            message,
        }
    }

    /// User-friendly error message for inline display.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(query) if query.trim().is_empty() => {
                "Enter a city name to search.".to_string()
            }
            Self::NotFound(query) => format!("We couldn't find a city called \"{}\".", query),
            Self::EmptyInput => "Not enough forecast data to show this view.".to_string(),
            Self::Transport {
                status: Some(code), ..
            } if *code >= 500 => {
                "The weather service is having trouble. Please try again later.".to_string()
            }
            Self::Transport { .. } => {
                "Failed to load weather data. Check your connection and retry.".to_string()
            }
            Self::Configuration(_) => {
                "The weather API key is missing or invalid. Check settings.".to_string()
            }
            Self::MalformedResponse(_) => {
                "Received unexpected data from the weather service.".to_string()
            }
        }
    }

    /// Whether retrying the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(code), ..
            } => *code >= 500 || *code == 429 || *code == 408,
            Self::MalformedResponse(_) => true,
            Self::NotFound(_) | Self::EmptyInput | Self::Configuration(_) => false,
        }
    }

    /// Whether this error stems from missing or rejected credentials.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::MalformedResponse(e.to_string());
        }
        Self::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedResponse(e.to_string())
    }
}

/// Errors from the forecast aggregator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Forecast series is empty")]
    EmptyInput,

    #[error("Timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

impl From<AggregateError> for WeatherError {
    fn from(e: AggregateError) -> Self {
        match e {
            AggregateError::EmptyInput => Self::EmptyInput,
            AggregateError::InvalidTimestamp(ts) => {
                Self::MalformedResponse(format!("timestamp {} is out of range", ts))
            }
        }
    }
}
