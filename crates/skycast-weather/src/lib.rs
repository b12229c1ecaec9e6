//! Weather lookup for Skycast
//!
//! Resolves city names to coordinates, fetches current conditions, a 3-hourly
//! forecast series and air quality from an OpenWeatherMap-compatible API, and
//! aggregates the series into daily and whole-range statistics.

pub mod aggregate;
pub mod classify;
pub mod client;
pub mod error;
pub mod geocode;
pub mod lookup;
pub mod outcome;
pub mod provider;
pub mod types;

pub use aggregate::{
    aggregate_by_day, aggregate_series, summarize, summarize_days, DailyAggregate, DayBoundary,
    DayCountSummary, MonthlyOverview, MonthlySummary,
};
pub use classify::{CategoryClassifier, PeriodKind};
pub use client::{ApiClient, ProviderConfig};
pub use error::{AggregateError, WeatherError};
pub use geocode::GeocodingResolver;
pub use lookup::{LookupOptions, LookupReport, LookupStatus, LookupTicket, Panel, WeatherLookup};
pub use outcome::FetchOutcome;
pub use provider::WeatherProvider;
pub use types::*;
