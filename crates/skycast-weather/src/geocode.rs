//! Forward geocoding: turn a free-text city name into coordinates.

use serde::Deserialize;
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::WeatherError;
use crate::outcome::FetchOutcome;
use crate::types::Location;

const GEOCODE_PATH: &str = "/geo/1.0/direct";

/// Queries shorter than this are not worth an upstream round trip.
pub const DEFAULT_MIN_QUERY_LENGTH: usize = 2;
pub const DEFAULT_SUGGESTION_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    state: Option<String>,
}

impl From<GeocodeCandidate> for Location {
    fn from(c: GeocodeCandidate) -> Self {
        Self {
            latitude: c.lat,
            longitude: c.lon,
            display_name: c.name,
            country: c.country,
            state: c.state,
        }
    }
}

/// Resolves city names against the upstream geocoding endpoint.
#[derive(Debug, Clone)]
pub struct GeocodingResolver {
    api: ApiClient,
    min_query_length: usize,
}

impl GeocodingResolver {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            min_query_length: DEFAULT_MIN_QUERY_LENGTH,
        }
    }

    pub fn with_min_query_length(mut self, min_query_length: usize) -> Self {
        self.min_query_length = min_query_length;
        self
    }

    pub fn min_query_length(&self) -> usize {
        self.min_query_length
    }

    /// Resolve `query` to the first upstream candidate.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, query: &str) -> FetchOutcome<Location> {
        let query = query.trim();
        if query.is_empty() {
            return FetchOutcome::NotFound(String::new());
        }

        match self.candidates(query, 1).await {
            Ok(candidates) => match candidates.into_iter().next() {
                Some(location) => {
                    tracing::info!("Resolved '{}' to {}", query, location.label());
                    FetchOutcome::Success(location)
                }
                None => {
                    tracing::debug!("No geocoding match for '{}'", query);
                    FetchOutcome::NotFound(query.to_string())
                }
            },
            Err(e) => {
                tracing::warn!("Geocoding '{}' failed: {}", query, e);
                FetchOutcome::Failure(e)
            }
        }
    }

    /// Up to `limit` candidates for autocomplete.
    ///
    /// Short queries return an empty list without contacting upstream, and an
    /// empty candidate list is a success: there is simply nothing to suggest.
    #[instrument(skip(self), level = "debug")]
    pub async fn suggest(&self, query: &str, limit: u32) -> FetchOutcome<Vec<Location>> {
        let query = query.trim();
        if query.chars().count() < self.min_query_length.max(1) || limit == 0 {
            return FetchOutcome::Success(Vec::new());
        }

        match self.candidates(query, limit).await {
            Ok(mut candidates) => {
                candidates.truncate(limit as usize);
                FetchOutcome::Success(candidates)
            }
            Err(e) => FetchOutcome::Failure(e),
        }
    }

    async fn candidates(&self, query: &str, limit: u32) -> Result<Vec<Location>, WeatherError> {
        let params = [("q", query.to_string()), ("limit", limit.to_string())];
        let candidates: Vec<GeocodeCandidate> = self.api.get_json(GEOCODE_PATH, &params).await?;
        Ok(candidates.into_iter().map(Location::from).collect())
    }
}
