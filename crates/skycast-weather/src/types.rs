use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of 3-hour samples covering one day of forecast.
pub const SAMPLES_PER_DAY: usize = 8;

/// Upstream weather category ("main" field), e.g. `Clear`, `Clouds`, `Rain`.
///
/// Unknown strings are kept verbatim in `Other` so new upstream categories
/// survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherCategory {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    Haze,
    Smoke,
    Dust,
    Sand,
    Ash,
    Squall,
    Tornado,
    Other(String),
}

impl WeatherCategory {
    /// Parse the upstream string. Matching is exact, as upstream sends it.
    pub fn parse(value: &str) -> Self {
        match value {
            "Clear" => Self::Clear,
            "Clouds" => Self::Clouds,
            "Rain" => Self::Rain,
            "Drizzle" => Self::Drizzle,
            "Thunderstorm" => Self::Thunderstorm,
            "Snow" => Self::Snow,
            "Mist" => Self::Mist,
            "Fog" => Self::Fog,
            "Haze" => Self::Haze,
            "Smoke" => Self::Smoke,
            "Dust" => Self::Dust,
            "Sand" => Self::Sand,
            "Ash" => Self::Ash,
            "Squall" => Self::Squall,
            "Tornado" => Self::Tornado,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Clear => "Clear",
            Self::Clouds => "Clouds",
            Self::Rain => "Rain",
            Self::Drizzle => "Drizzle",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Mist => "Mist",
            Self::Fog => "Fog",
            Self::Haze => "Haze",
            Self::Smoke => "Smoke",
            Self::Dust => "Dust",
            Self::Sand => "Sand",
            Self::Ash => "Ash",
            Self::Squall => "Squall",
            Self::Tornado => "Tornado",
            Self::Other(s) => s,
        }
    }

    /// Icon name for the monthly overview cards. Unrecognized categories
    /// fall back to the cloud icon.
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::Rain | Self::Drizzle => "cloud_rain",
            Self::Thunderstorm => "cloud_lightning",
            Self::Snow => "cloud_snow",
            Self::Mist | Self::Fog | Self::Haze | Self::Smoke => "cloud_fog",
            Self::Dust | Self::Sand | Self::Ash | Self::Squall | Self::Tornado => "wind",
            Self::Clouds | Self::Other(_) => "cloud",
        }
    }

    /// Whether the category is one of the known upstream values.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for WeatherCategory {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<WeatherCategory> for String {
    fn from(value: WeatherCategory) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL of the upstream icon image for an icon code such as `"10d"`.
pub fn icon_url(icon_code: &str) -> String {
    format!("https://openweathermap.org/img/wn/{}@2x.png", icon_code)
}

/// Coarse temperature band used to tint temperature readouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureBand {
    Freezing,
    Cold,
    Mild,
    Warm,
    Hot,
}

impl TemperatureBand {
    pub fn from_celsius(temp: f64) -> Self {
        if temp <= 0.0 {
            Self::Freezing
        } else if temp <= 10.0 {
            Self::Cold
        } else if temp <= 20.0 {
            Self::Mild
        } else if temp <= 30.0 {
            Self::Warm
        } else {
            Self::Hot
        }
    }
}

/// Eight-point compass direction for a wind bearing in degrees.
pub fn compass_direction(degrees: f64) -> &'static str {
    const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = (degrees.rem_euclid(360.0) / 45.0).round() as usize % DIRECTIONS.len();
    DIRECTIONS[index]
}

/// A resolved place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub country: String,
    pub state: Option<String>,
}

impl Location {
    /// "Name, State, Country" with absent or empty parts skipped.
    pub fn label(&self) -> String {
        let mut parts = vec![self.display_name.as_str()];
        if let Some(state) = self.state.as_deref().filter(|s| !s.is_empty()) {
            parts.push(state);
        }
        if !self.country.is_empty() {
            parts.push(&self.country);
        }
        parts.join(", ")
    }
}

/// Current conditions at a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location_name: String,
    pub observed_at: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_direction: Option<f64>,
    /// Metres
    pub visibility: Option<u32>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub category: WeatherCategory,
    pub description: String,
    pub icon_code: String,
}

impl CurrentConditions {
    pub fn visibility_km(&self) -> Option<f64> {
        self.visibility.map(|m| f64::from(m) / 1000.0)
    }

    pub fn wind_compass(&self) -> Option<&'static str> {
        self.wind_direction.map(compass_direction)
    }
}

/// One 3-hour forecast sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub timestamp: i64,
    /// Celsius
    pub temperature: f64,
    pub humidity: u8,
    /// hPa
    pub pressure: u32,
    /// m/s
    pub wind_speed: f64,
    /// Probability of precipitation, 0.0 to 1.0
    pub precipitation_probability: f64,
    pub category: WeatherCategory,
    pub icon_code: String,
    pub description: String,
}

impl ForecastSample {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Forecast samples in ascending timestamp order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub samples: Vec<ForecastSample>,
    pub city_name: Option<String>,
    /// Offset of the forecast location from UTC, as reported upstream.
    pub utc_offset_seconds: i32,
}

impl ForecastSeries {
    pub fn new(samples: Vec<ForecastSample>) -> Self {
        Self {
            samples,
            city_name: None,
            utc_offset_seconds: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The first `count` samples; `next_hours(8)` covers the next 24 hours.
    pub fn next_hours(&self, count: usize) -> &[ForecastSample] {
        &self.samples[..count.min(self.samples.len())]
    }

    /// One sample per day (every eighth), at most `max_days` of them.
    pub fn daily_snapshots(&self, max_days: usize) -> Vec<&ForecastSample> {
        self.samples
            .iter()
            .step_by(SAMPLES_PER_DAY)
            .take(max_days)
            .collect()
    }
}

/// Categorical AQI level reported by the air-pollution endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiLevel {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
}

impl AqiLevel {
    /// Map the 1-5 index. Anything outside that range reads as `Moderate`.
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::Good,
            2 => Self::Fair,
            3 => Self::Moderate,
            4 => Self::Poor,
            5 => Self::VeryPoor,
            _ => Self::Moderate,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }
}

/// Pollutant concentrations in µg/m³.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

/// Most recent air-quality reading for a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub observed_at: DateTime<Utc>,
    pub index: u8,
    pub pollutants: Pollutants,
}

impl AirQualityReading {
    pub fn level(&self) -> AqiLevel {
        AqiLevel::from_index(self.index)
    }

    /// Moderate or worse air may affect health.
    pub fn needs_health_advisory(&self) -> bool {
        self.index >= 3
    }
}
