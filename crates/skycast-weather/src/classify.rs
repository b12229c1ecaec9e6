//! Grouping of weather categories into rainy, sunny and cloudy periods.

use serde::{Deserialize, Serialize};

use crate::types::WeatherCategory;

/// Which bucket a category counts towards in the monthly summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Rainy,
    Sunny,
    Cloudy,
}

/// Category sets used when counting rainy, sunny and cloudy periods.
///
/// A category listed in more than one set counts towards the first match in
/// rainy, sunny, cloudy order, so each sample lands in at most one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryClassifier {
    pub rain: Vec<WeatherCategory>,
    pub sunny: Vec<WeatherCategory>,
    pub cloudy: Vec<WeatherCategory>,
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::broad()
    }
}

impl CategoryClassifier {
    /// Drizzle and thunderstorms count as rain; mist, fog and snow as cloudy.
    pub fn broad() -> Self {
        Self {
            rain: vec![
                WeatherCategory::Rain,
                WeatherCategory::Drizzle,
                WeatherCategory::Thunderstorm,
            ],
            sunny: vec![WeatherCategory::Clear],
            cloudy: vec![
                WeatherCategory::Clouds,
                WeatherCategory::Mist,
                WeatherCategory::Fog,
                WeatherCategory::Snow,
            ],
        }
    }

    /// Exact matches only: `Rain`, `Clear`, `Clouds`.
    pub fn strict() -> Self {
        Self {
            rain: vec![WeatherCategory::Rain],
            sunny: vec![WeatherCategory::Clear],
            cloudy: vec![WeatherCategory::Clouds],
        }
    }

    pub fn classify(&self, category: &WeatherCategory) -> Option<PeriodKind> {
        if self.rain.contains(category) {
            Some(PeriodKind::Rainy)
        } else if self.sunny.contains(category) {
            Some(PeriodKind::Sunny)
        } else if self.cloudy.contains(category) {
            Some(PeriodKind::Cloudy)
        } else {
            None
        }
    }

    /// Categories that appear in more than one set.
    pub fn overlaps(&self) -> Vec<WeatherCategory> {
        let mut overlapping = Vec::new();
        let sets = [&self.rain, &self.sunny, &self.cloudy];
        for (i, set) in sets.iter().enumerate() {
            for category in set.iter() {
                let elsewhere = sets
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.contains(category));
                if elsewhere && !overlapping.contains(category) {
                    overlapping.push(category.clone());
                }
            }
        }
        overlapping
    }
}
