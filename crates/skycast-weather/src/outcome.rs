//! Tagged result returned by every fetching operation.

use serde::Serialize;

use crate::error::WeatherError;

/// Result of a resolve or fetch call.
///
/// `NotFound` carries the query that matched nothing. It is kept apart from
/// `Failure` so a missing city can be shown as "no such place" instead of a
/// generic error banner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum FetchOutcome<T> {
    Success(T),
    NotFound(String),
    #[serde(serialize_with = "serialize_error")]
    Failure(WeatherError),
}

fn serialize_error<S: serde::Serializer>(
    error: &WeatherError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

impl<T> FetchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&WeatherError> {
        match self {
            Self::Failure(e) => Some(e),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FetchOutcome<U> {
        match self {
            Self::Success(value) => FetchOutcome::Success(f(value)),
            Self::NotFound(msg) => FetchOutcome::NotFound(msg),
            Self::Failure(e) => FetchOutcome::Failure(e),
        }
    }

    /// Message to show in place of the panel, `None` on success.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::NotFound(query) => Some(WeatherError::NotFound(query.clone()).user_message()),
            Self::Failure(e) => Some(e.user_message()),
        }
    }

    /// # Errors
    /// `NotFound` becomes `WeatherError::NotFound`; `Failure` yields its error.
    pub fn into_result(self) -> Result<T, WeatherError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::NotFound(msg) => Err(WeatherError::NotFound(msg)),
            Self::Failure(e) => Err(e),
        }
    }
}

impl<T> From<Result<T, WeatherError>> for FetchOutcome<T> {
    fn from(result: Result<T, WeatherError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(WeatherError::NotFound(msg)) => Self::NotFound(msg),
            Err(e) => Self::Failure(e),
        }
    }
}
