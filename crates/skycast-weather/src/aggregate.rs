//! Per-day and whole-series statistics over a forecast series.
//!
//! Everything here is pure and returns full-precision values. Rounding for
//! display belongs to the caller.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{CategoryClassifier, PeriodKind};
use crate::error::AggregateError;
use crate::types::{ForecastSample, ForecastSeries, WeatherCategory};

/// A day counts as rainy when its mean precipitation probability exceeds this.
pub const RAINY_DAY_PRECIPITATION: f64 = 0.3;

/// Time zone whose calendar days the samples are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    Utc,
    /// Time zone of the machine running the lookup.
    Local,
    /// The forecast location's own UTC offset, as reported with the series.
    #[default]
    Location,
}

/// Statistics for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub sample_count: usize,
    pub average_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub average_humidity: f64,
    pub average_wind_speed: f64,
    pub average_precipitation_probability: f64,
    pub dominant_category: WeatherCategory,
}

/// Whole-series statistics, counted per sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub sample_count: usize,
    pub average_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub average_humidity: f64,
    pub average_pressure: f64,
    pub average_wind_speed: f64,
    pub rainy_periods: usize,
    pub sunny_periods: usize,
    pub cloudy_periods: usize,
}

/// Whole-range statistics, counted per day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCountSummary {
    pub day_count: usize,
    /// Mean of the daily average temperatures
    pub average_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub average_humidity: f64,
    pub average_wind_speed: f64,
    pub rainy_days: usize,
    pub sunny_days: usize,
    pub cloudy_days: usize,
}

/// Everything the monthly view needs, built in one pass over a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOverview {
    pub days: Vec<DailyAggregate>,
    pub summary: MonthlySummary,
    pub day_summary: DayCountSummary,
}

impl MonthlyOverview {
    /// # Errors
    /// `AggregateError::EmptyInput` for an empty series.
    pub fn build(
        series: &ForecastSeries,
        boundary: DayBoundary,
        classifier: &CategoryClassifier,
    ) -> Result<Self, AggregateError> {
        let days = aggregate_series(series, boundary)?;
        let summary = summarize(&series.samples, classifier)?;
        let day_summary = summarize_days(&days, classifier)?;
        Ok(Self {
            days,
            summary,
            day_summary,
        })
    }
}

/// Group `samples` by calendar date in `zone`.
///
/// Days appear in the order their first sample appears in the input.
///
/// # Errors
/// `EmptyInput` when `samples` is empty, `InvalidTimestamp` when a timestamp
/// cannot be represented as a date.
pub fn aggregate_by_day<Tz: TimeZone>(
    samples: &[ForecastSample],
    zone: &Tz,
) -> Result<Vec<DailyAggregate>, AggregateError> {
    if samples.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let mut buckets: Vec<DayBucket<'_>> = Vec::new();
    let mut by_date: HashMap<NaiveDate, usize> = HashMap::new();

    for sample in samples {
        let date = calendar_date(sample.timestamp, zone)?;
        let slot = *by_date.entry(date).or_insert_with(|| {
            buckets.push(DayBucket {
                date,
                samples: Vec::new(),
            });
            buckets.len() - 1
        });
        buckets[slot].samples.push(sample);
    }

    Ok(buckets.into_iter().map(DayBucket::finish).collect())
}

/// [`aggregate_by_day`] with the zone picked by `boundary`.
///
/// # Errors
/// Same as [`aggregate_by_day`].
pub fn aggregate_series(
    series: &ForecastSeries,
    boundary: DayBoundary,
) -> Result<Vec<DailyAggregate>, AggregateError> {
    match boundary {
        DayBoundary::Utc => aggregate_by_day(&series.samples, &Utc),
        DayBoundary::Local => aggregate_by_day(&series.samples, &Local),
        DayBoundary::Location => match FixedOffset::east_opt(series.utc_offset_seconds) {
            Some(offset) => aggregate_by_day(&series.samples, &offset),
            None => {
                tracing::warn!(
                    "Ignoring out-of-range UTC offset {}s, grouping by UTC",
                    series.utc_offset_seconds
                );
                aggregate_by_day(&series.samples, &Utc)
            }
        },
    }
}

/// Whole-series statistics with category counts per sample.
///
/// # Errors
/// `EmptyInput` when `samples` is empty.
pub fn summarize(
    samples: &[ForecastSample],
    classifier: &CategoryClassifier,
) -> Result<MonthlySummary, AggregateError> {
    if samples.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let (min_temp, max_temp) = extremes(samples.iter().map(|s| s.temperature));
    let (mut rainy, mut sunny, mut cloudy) = (0, 0, 0);
    for sample in samples {
        match classifier.classify(&sample.category) {
            Some(PeriodKind::Rainy) => rainy += 1,
            Some(PeriodKind::Sunny) => sunny += 1,
            Some(PeriodKind::Cloudy) => cloudy += 1,
            None => {}
        }
    }

    Ok(MonthlySummary {
        sample_count: samples.len(),
        average_temp: bounded_mean(samples.iter().map(|s| s.temperature), min_temp, max_temp),
        max_temp,
        min_temp,
        average_humidity: mean(samples.iter().map(|s| f64::from(s.humidity))),
        average_pressure: mean(samples.iter().map(|s| f64::from(s.pressure))),
        average_wind_speed: mean(samples.iter().map(|s| s.wind_speed)),
        rainy_periods: rainy,
        sunny_periods: sunny,
        cloudy_periods: cloudy,
    })
}

/// Whole-range statistics with counts per day.
///
/// Rainy days are those whose mean precipitation probability exceeds
/// [`RAINY_DAY_PRECIPITATION`]; sunny and cloudy days go by the dominant
/// category. A wet day can therefore also count as sunny or cloudy.
///
/// # Errors
/// `EmptyInput` when `days` is empty.
pub fn summarize_days(
    days: &[DailyAggregate],
    classifier: &CategoryClassifier,
) -> Result<DayCountSummary, AggregateError> {
    if days.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let count_kind = |kind: PeriodKind| {
        days.iter()
            .filter(|d| classifier.classify(&d.dominant_category) == Some(kind))
            .count()
    };

    let (min_temp, _) = extremes(days.iter().map(|d| d.min_temp));
    let (_, max_temp) = extremes(days.iter().map(|d| d.max_temp));

    Ok(DayCountSummary {
        day_count: days.len(),
        average_temp: bounded_mean(days.iter().map(|d| d.average_temp), min_temp, max_temp),
        max_temp,
        min_temp,
        average_humidity: mean(days.iter().map(|d| d.average_humidity)),
        average_wind_speed: mean(days.iter().map(|d| d.average_wind_speed)),
        rainy_days: days
            .iter()
            .filter(|d| d.average_precipitation_probability > RAINY_DAY_PRECIPITATION)
            .count(),
        sunny_days: count_kind(PeriodKind::Sunny),
        cloudy_days: count_kind(PeriodKind::Cloudy),
    })
}

struct DayBucket<'a> {
    date: NaiveDate,
    samples: Vec<&'a ForecastSample>,
}

impl DayBucket<'_> {
    fn finish(self) -> DailyAggregate {
        let samples = &self.samples;
        let (min_temp, max_temp) = extremes(samples.iter().map(|s| s.temperature));
        DailyAggregate {
            date: self.date,
            sample_count: samples.len(),
            average_temp: bounded_mean(samples.iter().map(|s| s.temperature), min_temp, max_temp),
            max_temp,
            min_temp,
            average_humidity: mean(samples.iter().map(|s| f64::from(s.humidity))),
            average_wind_speed: mean(samples.iter().map(|s| s.wind_speed)),
            average_precipitation_probability: mean(
                samples.iter().map(|s| s.precipitation_probability),
            ),
            dominant_category: dominant_category(samples.iter().map(|s| &s.category)),
        }
    }
}

fn calendar_date<Tz: TimeZone>(timestamp: i64, zone: &Tz) -> Result<NaiveDate, AggregateError> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|utc| utc.with_timezone(zone).date_naive())
        .ok_or(AggregateError::InvalidTimestamp(timestamp))
}

/// Most frequent category; among equally frequent ones the first seen wins.
fn dominant_category<'a>(categories: impl Iterator<Item = &'a WeatherCategory>) -> WeatherCategory {
    let mut counts: Vec<(&WeatherCategory, usize)> = Vec::new();
    for category in categories {
        match counts.iter_mut().find(|(c, _)| *c == category) {
            Some((_, n)) => *n += 1,
            None => counts.push((category, 1)),
        }
    }

    let mut best: Option<(&WeatherCategory, usize)> = None;
    for (category, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((category, n));
        }
    }
    best.map(|(c, _)| c.clone())
        .unwrap_or_else(|| WeatherCategory::Other(String::new()))
}

/// Arithmetic mean. Callers guarantee at least one value.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Mean kept inside `[lo, hi]`. Summing in floating point can push the mean
/// of identical values one ulp past them.
fn bounded_mean(values: impl Iterator<Item = f64>, lo: f64, hi: f64) -> f64 {
    mean(values).max(lo).min(hi)
}

fn extremes(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
