//! Current conditions, forecast series and air quality for a coordinate.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::WeatherError;
use crate::outcome::FetchOutcome;
use crate::types::{
    AirQualityReading, CurrentConditions, ForecastSample, ForecastSeries, Pollutants,
    WeatherCategory,
};

const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";
const AIR_QUALITY_PATH: &str = "/data/2.5/air_pollution";

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Default, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    dt: i64,
    #[serde(default)]
    name: String,
    main: OwmMain,
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: OwmWind,
    visibility: Option<u32>,
    sys: OwmSys,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: OwmWind,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCity {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    list: Vec<OwmForecastItem>,
    city: Option<OwmCity>,
}

#[derive(Debug, Deserialize)]
struct OwmAqiMain {
    aqi: u8,
}

#[derive(Debug, Deserialize)]
struct OwmComponents {
    #[serde(default)]
    co: f64,
    #[serde(default)]
    no: f64,
    #[serde(default)]
    no2: f64,
    #[serde(default)]
    o3: f64,
    #[serde(default)]
    so2: f64,
    #[serde(default)]
    pm2_5: f64,
    #[serde(default)]
    pm10: f64,
    #[serde(default)]
    nh3: f64,
}

#[derive(Debug, Deserialize)]
struct OwmAirQualityItem {
    dt: i64,
    main: OwmAqiMain,
    components: OwmComponents,
}

#[derive(Debug, Deserialize)]
struct OwmAirQualityResponse {
    list: Vec<OwmAirQualityItem>,
}

fn timestamp(field: &str, secs: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        WeatherError::MalformedResponse(format!("{} timestamp {} is out of range", field, secs))
    })
}

fn first_condition(
    conditions: Vec<OwmCondition>,
    context: &str,
) -> Result<OwmCondition, WeatherError> {
    conditions
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::MalformedResponse(format!("{}: missing weather entry", context)))
}

fn coordinate_params(latitude: f64, longitude: f64) -> [(&'static str, String); 3] {
    [
        ("lat", latitude.to_string()),
        ("lon", longitude.to_string()),
        ("units", "metric".to_string()),
    ]
}

impl TryFrom<OwmCurrentResponse> for CurrentConditions {
    type Error = WeatherError;

    fn try_from(r: OwmCurrentResponse) -> Result<Self, Self::Error> {
        let condition = first_condition(r.weather, "current conditions")?;
        Ok(Self {
            location_name: r.name,
            observed_at: timestamp("dt", r.dt)?,
            temperature: r.main.temp,
            feels_like: r.main.feels_like.unwrap_or(r.main.temp),
            humidity: r.main.humidity,
            pressure: r.main.pressure,
            wind_speed: r.wind.speed,
            wind_direction: r.wind.deg,
            visibility: r.visibility,
            sunrise: timestamp("sunrise", r.sys.sunrise)?,
            sunset: timestamp("sunset", r.sys.sunset)?,
            category: WeatherCategory::parse(&condition.main),
            description: condition.description,
            icon_code: condition.icon,
        })
    }
}

impl TryFrom<OwmForecastItem> for ForecastSample {
    type Error = WeatherError;

    fn try_from(item: OwmForecastItem) -> Result<Self, Self::Error> {
        let condition = first_condition(item.weather, "forecast sample")?;
        Ok(Self {
            timestamp: item.dt,
            temperature: item.main.temp,
            humidity: item.main.humidity,
            pressure: item.main.pressure,
            wind_speed: item.wind.speed,
            precipitation_probability: item.pop.clamp(0.0, 1.0),
            category: WeatherCategory::parse(&condition.main),
            icon_code: condition.icon,
            description: condition.description,
        })
    }
}

impl TryFrom<OwmForecastResponse> for ForecastSeries {
    type Error = WeatherError;

    fn try_from(r: OwmForecastResponse) -> Result<Self, Self::Error> {
        let mut samples = r
            .list
            .into_iter()
            .map(ForecastSample::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // Upstream already sends ascending order; keep the invariant regardless.
        samples.sort_by_key(|s| s.timestamp);

        let (city_name, utc_offset_seconds) = match r.city {
            Some(city) => (city.name, city.timezone),
            None => (None, 0),
        };

        Ok(Self {
            samples,
            city_name,
            utc_offset_seconds,
        })
    }
}

impl TryFrom<OwmAirQualityResponse> for AirQualityReading {
    type Error = WeatherError;

    fn try_from(r: OwmAirQualityResponse) -> Result<Self, Self::Error> {
        let item = r.list.into_iter().next().ok_or_else(|| {
            WeatherError::MalformedResponse("air quality: empty reading list".to_string())
        })?;
        let c = item.components;
        Ok(Self {
            observed_at: timestamp("dt", item.dt)?,
            index: item.main.aqi,
            pollutants: Pollutants {
                co: c.co,
                no: c.no,
                no2: c.no2,
                o3: c.o3,
                so2: c.so2,
                pm2_5: c.pm2_5,
                pm10: c.pm10,
                nh3: c.nh3,
            },
        })
    }
}

/// Fetches weather data for resolved coordinates.
///
/// The three operations are independent; callers may run them concurrently
/// and each reports its own outcome.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    api: ApiClient,
}

impl WeatherProvider {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> FetchOutcome<CurrentConditions> {
        let result = async {
            let params = coordinate_params(latitude, longitude);
            let raw: OwmCurrentResponse = self.api.get_json(CURRENT_PATH, &params).await?;
            CurrentConditions::try_from(raw)
        }
        .await;

        log_outcome("current conditions", &result);
        result.into()
    }

    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast_series(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> FetchOutcome<ForecastSeries> {
        let result = async {
            let params = coordinate_params(latitude, longitude);
            let raw: OwmForecastResponse = self.api.get_json(FORECAST_PATH, &params).await?;
            ForecastSeries::try_from(raw)
        }
        .await;

        if let Ok(series) = &result {
            tracing::debug!("Forecast series has {} samples", series.len());
        }
        log_outcome("forecast", &result);
        result.into()
    }

    #[instrument(skip(self), level = "info")]
    pub async fn fetch_air_quality(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> FetchOutcome<AirQualityReading> {
        let result = async {
            let params = [
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ];
            let raw: OwmAirQualityResponse = self.api.get_json(AIR_QUALITY_PATH, &params).await?;
            AirQualityReading::try_from(raw)
        }
        .await;

        log_outcome("air quality", &result);
        result.into()
    }
}

fn log_outcome<T>(what: &str, result: &Result<T, WeatherError>) {
    if let Err(e) = result {
        tracing::warn!("Fetching {} failed: {}", what, e);
    }
}
