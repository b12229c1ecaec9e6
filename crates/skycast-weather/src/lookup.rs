//! Lookup coordinator shared by every view.
//!
//! A lookup resolves the query, then fetches current conditions, the forecast
//! series and air quality concurrently. Each call takes a generation ticket;
//! only the newest ticket may commit its report, so a slow lookup can never
//! overwrite a later one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::instrument;

use crate::aggregate::{DayBoundary, MonthlyOverview};
use crate::classify::CategoryClassifier;
use crate::client::{ApiClient, ProviderConfig};
use crate::error::{AggregateError, WeatherError};
use crate::geocode::{GeocodingResolver, DEFAULT_MIN_QUERY_LENGTH, DEFAULT_SUGGESTION_LIMIT};
use crate::outcome::FetchOutcome;
use crate::provider::WeatherProvider;
use crate::types::{AirQualityReading, CurrentConditions, ForecastSeries, Location};

/// Tuning for a [`WeatherLookup`].
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOptions {
    pub day_boundary: DayBoundary,
    pub classifier: CategoryClassifier,
    pub min_query_length: usize,
    pub suggestion_limit: u32,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            day_boundary: DayBoundary::default(),
            classifier: CategoryClassifier::default(),
            min_query_length: DEFAULT_MIN_QUERY_LENGTH,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

/// Identifies one lookup. Higher generations supersede lower ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub generation: u64,
    pub query: String,
}

/// The independently retryable parts of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Current,
    Forecast,
    AirQuality,
}

/// Everything one lookup produced.
///
/// The panel outcomes are `None` when the location did not resolve.
/// `monthly` is present only when the forecast fetch succeeded.
#[derive(Debug, Clone)]
pub struct LookupReport {
    pub ticket: LookupTicket,
    pub location: FetchOutcome<Location>,
    pub current: Option<FetchOutcome<CurrentConditions>>,
    pub forecast: Option<FetchOutcome<ForecastSeries>>,
    pub air_quality: Option<FetchOutcome<AirQualityReading>>,
    pub monthly: Option<Result<MonthlyOverview, AggregateError>>,
}

impl LookupReport {
    fn unresolved(ticket: LookupTicket, location: FetchOutcome<Location>) -> Self {
        Self {
            ticket,
            location,
            current: None,
            forecast: None,
            air_quality: None,
            monthly: None,
        }
    }

    pub fn resolved_location(&self) -> Option<&Location> {
        self.location.success()
    }

    /// Panels whose fetch did not succeed.
    pub fn failed_panels(&self) -> Vec<Panel> {
        let mut failed = Vec::new();
        if self.current.as_ref().is_some_and(|o| !o.is_success()) {
            failed.push(Panel::Current);
        }
        if self.forecast.as_ref().is_some_and(|o| !o.is_success()) {
            failed.push(Panel::Forecast);
        }
        if self.air_quality.as_ref().is_some_and(|o| !o.is_success()) {
            failed.push(Panel::AirQuality);
        }
        failed
    }

    /// Resolved, and every panel succeeded.
    pub fn is_complete(&self) -> bool {
        self.location.is_success()
            && self.current.is_some()
            && self.forecast.is_some()
            && self.air_quality.is_some()
            && self.failed_panels().is_empty()
    }

    fn apply(&mut self, update: PanelUpdate, options: &LookupOptions) {
        match update {
            PanelUpdate::Current(outcome) => self.current = Some(outcome),
            PanelUpdate::AirQuality(outcome) => self.air_quality = Some(outcome),
            PanelUpdate::Forecast(outcome) => {
                self.monthly = outcome.success().map(|series| {
                    MonthlyOverview::build(series, options.day_boundary, &options.classifier)
                });
                self.forecast = Some(outcome);
            }
        }
    }
}

/// Result of handing a finished lookup to the coordinator.
#[derive(Debug, Clone)]
pub enum LookupStatus {
    /// The report is now the latest one.
    Applied(Arc<LookupReport>),
    /// A newer lookup was started meanwhile; this result was dropped.
    Superseded { query: String },
}

impl LookupStatus {
    pub fn report(&self) -> Option<&Arc<LookupReport>> {
        match self {
            Self::Applied(report) => Some(report),
            Self::Superseded { .. } => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

enum PanelUpdate {
    Current(FetchOutcome<CurrentConditions>),
    Forecast(FetchOutcome<ForecastSeries>),
    AirQuality(FetchOutcome<AirQualityReading>),
}

/// Runs lookups and keeps the latest committed report.
///
/// Cheap to clone; clones share the generation counter and the report slot.
#[derive(Debug, Clone)]
pub struct WeatherLookup {
    resolver: GeocodingResolver,
    provider: WeatherProvider,
    options: LookupOptions,
    generation: Arc<AtomicU64>,
    latest: Arc<RwLock<Option<Arc<LookupReport>>>>,
}

impl WeatherLookup {
    pub fn new(
        resolver: GeocodingResolver,
        provider: WeatherProvider,
        options: LookupOptions,
    ) -> Self {
        Self {
            resolver: resolver.with_min_query_length(options.min_query_length),
            provider,
            options,
            generation: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Build the resolver and fetcher from one upstream configuration.
    ///
    /// # Errors
    /// `WeatherError::Configuration` when the API key is missing.
    pub fn from_config(config: &ProviderConfig, options: LookupOptions) -> Result<Self, WeatherError> {
        let api = ApiClient::new(config)?;
        Ok(Self::new(
            GeocodingResolver::new(api.clone()),
            WeatherProvider::new(api),
            options,
        ))
    }

    pub fn options(&self) -> &LookupOptions {
        &self.options
    }

    /// The most recently committed report.
    pub fn latest(&self) -> Option<Arc<LookupReport>> {
        self.latest.read().clone()
    }

    /// Autocomplete candidates for a partially typed query.
    pub async fn suggest(&self, query: &str) -> FetchOutcome<Vec<Location>> {
        self.resolver
            .suggest(query, self.options.suggestion_limit)
            .await
    }

    /// Resolve `query` and fetch all panels for it.
    #[instrument(skip(self), level = "info")]
    pub async fn lookup(&self, query: &str) -> LookupStatus {
        let ticket = self.issue(query);
        tracing::debug!("Lookup #{} started", ticket.generation);

        let location = self.resolver.resolve(query).await;
        let mut report = LookupReport::unresolved(ticket, location);

        if let Some(place) = report.location.success().cloned() {
            if !self.is_current(report.ticket.generation) {
                return self.discard(report.ticket);
            }

            let (current, forecast, air_quality) = tokio::join!(
                self.provider.fetch_current(place.latitude, place.longitude),
                self.provider.fetch_forecast_series(place.latitude, place.longitude),
                self.provider.fetch_air_quality(place.latitude, place.longitude),
            );
            report.apply(PanelUpdate::Current(current), &self.options);
            report.apply(PanelUpdate::Forecast(forecast), &self.options);
            report.apply(PanelUpdate::AirQuality(air_quality), &self.options);
        }

        self.commit(report)
    }

    /// Fetch one panel again for the latest report's location.
    ///
    /// Returns `None` when there is no committed report with a resolved
    /// location. The patched report keeps its ticket and is committed only
    /// while that ticket is still the newest.
    #[instrument(skip(self), level = "info")]
    pub async fn retry_panel(&self, panel: Panel) -> Option<LookupStatus> {
        let report = self.latest()?;
        let place = report.resolved_location()?.clone();
        let ticket = report.ticket.clone();

        let update = match panel {
            Panel::Current => PanelUpdate::Current(
                self.provider
                    .fetch_current(place.latitude, place.longitude)
                    .await,
            ),
            Panel::Forecast => PanelUpdate::Forecast(
                self.provider
                    .fetch_forecast_series(place.latitude, place.longitude)
                    .await,
            ),
            Panel::AirQuality => PanelUpdate::AirQuality(
                self.provider
                    .fetch_air_quality(place.latitude, place.longitude)
                    .await,
            ),
        };

        // Patch whatever is committed now so concurrent retries of other
        // panels are kept.
        let mut slot = self.latest.write();
        let committed = slot
            .as_deref()
            .filter(|c| {
                c.ticket.generation == ticket.generation && self.is_current(ticket.generation)
            })
            .cloned();
        let Some(mut patched) = committed else {
            drop(slot);
            return Some(self.discard(ticket));
        };

        patched.apply(update, &self.options);
        let patched = Arc::new(patched);
        *slot = Some(Arc::clone(&patched));
        Some(LookupStatus::Applied(patched))
    }

    fn issue(&self, query: &str) -> LookupTicket {
        LookupTicket {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            query: query.trim().to_string(),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn commit(&self, report: LookupReport) -> LookupStatus {
        let mut slot = self.latest.write();
        if !self.is_current(report.ticket.generation) {
            drop(slot);
            return self.discard(report.ticket);
        }
        let report = Arc::new(report);
        *slot = Some(Arc::clone(&report));
        tracing::info!(
            "Lookup #{} for '{}' committed",
            report.ticket.generation,
            report.ticket.query
        );
        LookupStatus::Applied(report)
    }

    fn discard(&self, ticket: LookupTicket) -> LookupStatus {
        tracing::debug!(
            "Dropping superseded lookup #{} for '{}'",
            ticket.generation,
            ticket.query
        );
        LookupStatus::Superseded {
            query: ticket.query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> WeatherLookup {
        let config = ProviderConfig::with_api_key("test_key").with_base_url("http://127.0.0.1:9");
        WeatherLookup::from_config(&config, LookupOptions::default()).unwrap()
    }

    #[test]
    fn test_from_config_requires_key() {
        let err = WeatherLookup::from_config(&ProviderConfig::default(), LookupOptions::default())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_tickets_increase_and_supersede() {
        let lookup = lookup();
        let first = lookup.issue("  Paris ");
        let second = lookup.issue("Berlin");

        assert_eq!(first.query, "Paris");
        assert!(second.generation > first.generation);
        assert!(!lookup.is_current(first.generation));
        assert!(lookup.is_current(second.generation));
    }

    #[test]
    fn test_commit_rejects_stale_ticket() {
        let lookup = lookup();
        let stale = lookup.issue("Slowtown");
        let fresh = lookup.issue("Fastville");

        let status = lookup.commit(LookupReport::unresolved(
            fresh,
            FetchOutcome::NotFound("Fastville".into()),
        ));
        assert!(status.report().is_some());

        let status = lookup.commit(LookupReport::unresolved(
            stale,
            FetchOutcome::NotFound("Slowtown".into()),
        ));
        assert!(status.is_superseded());
        assert_eq!(lookup.latest().unwrap().ticket.query, "Fastville");
    }

    #[test]
    fn test_failed_panels() {
        let mut report = LookupReport::unresolved(
            LookupTicket {
                generation: 1,
                query: "x".into(),
            },
            FetchOutcome::NotFound("x".into()),
        );
        assert!(report.failed_panels().is_empty());
        assert!(!report.is_complete());

        report.apply(
            PanelUpdate::AirQuality(FetchOutcome::Failure(WeatherError::Transport {
                status: Some(500),
                message: String::new(),
            })),
            &LookupOptions::default(),
        );
        report.apply(
            PanelUpdate::Forecast(FetchOutcome::Success(ForecastSeries::default())),
            &LookupOptions::default(),
        );
        assert_eq!(report.failed_panels(), vec![Panel::AirQuality]);
        assert_eq!(report.monthly, Some(Err(AggregateError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_retry_without_report_is_noop() {
        assert!(lookup().retry_panel(Panel::Current).await.is_none());
    }
}
