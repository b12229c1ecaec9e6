//! Integration tests for WeatherLookup using wiremock.
//!
//! Each test runs a full lookup against a mock OpenWeatherMap server.

use std::time::Duration;

use skycast_weather::{
    DayBoundary, FetchOutcome, LookupOptions, Panel, ProviderConfig, WeatherCategory,
    WeatherError, WeatherLookup,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 2024-03-01T00:00:00Z
const MARCH_1: i64 = 1_709_251_200;

fn city(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "lat": 48.8566,
        "lon": 2.3522,
        "country": "FR"
    })
}

fn current_body() -> serde_json::Value {
    serde_json::json!({
        "dt": MARCH_1,
        "name": "Paris",
        "main": {"temp": 14.2, "feels_like": 13.1, "humidity": 72, "pressure": 1012},
        "weather": [{"main": "Clouds", "description": "broken clouds", "icon": "04d"}],
        "wind": {"speed": 4.1, "deg": 230},
        "visibility": 10000,
        "sys": {"sunrise": MARCH_1 + 6 * 3600, "sunset": MARCH_1 + 18 * 3600}
    })
}

/// Two days of 3-hourly samples: a clear day then a rainy one.
fn forecast_body() -> serde_json::Value {
    let list: Vec<serde_json::Value> = (0..16)
        .map(|i| {
            let (category, pop) = if i < 8 { ("Clear", 0.0) } else { ("Rain", 0.8) };
            serde_json::json!({
                "dt": MARCH_1 + i * 3 * 3600,
                "main": {"temp": 10.0 + i as f64, "humidity": 60, "pressure": 1010},
                "weather": [{"main": category, "description": "", "icon": "01d"}],
                "wind": {"speed": 3.0},
                "pop": pop
            })
        })
        .collect();

    serde_json::json!({
        "list": list,
        "city": {"name": "Paris", "timezone": 0}
    })
}

fn air_body() -> serde_json::Value {
    serde_json::json!({
        "list": [{
            "dt": MARCH_1,
            "main": {"aqi": 2},
            "components": {"co": 201.9, "no2": 0.77, "o3": 68.66, "pm2_5": 0.5, "pm10": 0.54}
        }]
    })
}

async fn mount_geocode(server: &MockServer, query: &str, delay: Option<Duration>) {
    let mut response = ResponseTemplate::new(200).set_body_json(serde_json::json!([city(query)]));
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", query))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_current(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .mount(server)
        .await;
}

async fn mount_forecast(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(server)
        .await;
}

async fn mount_air(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body()))
        .mount(server)
        .await;
}

fn lookup_for(server: &MockServer) -> WeatherLookup {
    let config = ProviderConfig::with_api_key("test_key").with_base_url(server.uri());
    let options = LookupOptions {
        day_boundary: DayBoundary::Utc,
        ..LookupOptions::default()
    };
    WeatherLookup::from_config(&config, options).unwrap()
}

#[tokio::test]
async fn test_full_lookup_success() {
    let mock_server = MockServer::start().await;
    mount_geocode(&mock_server, "Paris", None).await;
    mount_current(&mock_server).await;
    mount_forecast(&mock_server).await;
    mount_air(&mock_server).await;

    let lookup = lookup_for(&mock_server);
    let status = lookup.lookup("Paris").await;
    let report = status.report().expect("lookup should be applied");

    assert!(report.is_complete());
    assert_eq!(report.resolved_location().unwrap().display_name, "Paris");

    let current = report.current.as_ref().unwrap().success().unwrap();
    assert_eq!(current.category, WeatherCategory::Clouds);

    let monthly = report.monthly.as_ref().unwrap().as_ref().unwrap();
    assert_eq!(monthly.days.len(), 2);
    assert_eq!(monthly.days[0].dominant_category, WeatherCategory::Clear);
    assert_eq!(monthly.days[1].dominant_category, WeatherCategory::Rain);
    assert_eq!(monthly.summary.sample_count, 16);
    assert_eq!(monthly.day_summary.rainy_days, 1);
    assert_eq!(monthly.day_summary.sunny_days, 1);

    let air = report.air_quality.as_ref().unwrap().success().unwrap();
    assert_eq!(air.level().label(), "Fair");

    assert_eq!(lookup.latest().unwrap().ticket.query, "Paris");
}

#[tokio::test]
async fn test_air_quality_failure_keeps_other_panels() {
    let mock_server = MockServer::start().await;
    mount_geocode(&mock_server, "Paris", None).await;
    mount_current(&mock_server).await;
    mount_forecast(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let lookup = lookup_for(&mock_server);
    let status = lookup.lookup("Paris").await;
    let report = status.report().unwrap();

    assert!(report.current.as_ref().unwrap().is_success());
    assert!(report.forecast.as_ref().unwrap().is_success());
    match report.air_quality.as_ref().unwrap() {
        FetchOutcome::Failure(WeatherError::Transport { status, .. }) => {
            assert_eq!(*status, Some(500));
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert_eq!(report.failed_panels(), vec![Panel::AirQuality]);
    assert!(report.monthly.as_ref().unwrap().is_ok());
}

#[tokio::test]
async fn test_unknown_city_skips_weather_fetches() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let lookup = lookup_for(&mock_server);
    let status = lookup.lookup("Nowhereville123").await;
    let report = status.report().unwrap();

    assert_eq!(
        report.location,
        FetchOutcome::NotFound("Nowhereville123".to_string())
    );
    assert!(report.current.is_none());
    assert!(report.forecast.is_none());
    assert!(report.air_quality.is_none());
    assert!(report.monthly.is_none());
    assert!(report.location.message().unwrap().contains("Nowhereville123"));
}

#[tokio::test]
async fn test_rejected_key_is_configuration_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key"
        })))
        .mount(&mock_server)
        .await;

    let lookup = lookup_for(&mock_server);
    let status = lookup.lookup("Paris").await;
    let report = status.report().unwrap();

    let err = report.location.failure().expect("location should fail");
    assert!(err.is_configuration());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_superseded_lookup_is_discarded() {
    let mock_server = MockServer::start().await;
    mount_geocode(&mock_server, "Slowtown", Some(Duration::from_millis(500))).await;
    mount_geocode(&mock_server, "Fastville", None).await;
    mount_current(&mock_server).await;
    mount_forecast(&mock_server).await;
    mount_air(&mock_server).await;

    let lookup = lookup_for(&mock_server);
    let (slow, fast) = tokio::join!(lookup.lookup("Slowtown"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        lookup.lookup("Fastville").await
    });

    assert!(slow.is_superseded());
    assert!(fast.report().is_some());

    let latest = lookup.latest().unwrap();
    assert_eq!(latest.ticket.query, "Fastville");
    assert_eq!(latest.resolved_location().unwrap().display_name, "Fastville");
}

#[tokio::test]
async fn test_lookup_overtaken_while_fetching_is_discarded() {
    let mock_server = MockServer::start().await;
    for (name, lat) in [("Oldtown", 10.5), ("Newtown", 20.5)] {
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", name))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "name": name,
                "lat": lat,
                "lon": 5.0,
                "country": "NL"
            }])))
            .mount(&mock_server)
            .await;
    }
    // Only the first city's forecast is slow
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("lat", "10.5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body())
                .set_delay(Duration::from_millis(500)),
        )
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_current(&mock_server).await;
    mount_forecast(&mock_server).await;
    mount_air(&mock_server).await;

    let lookup = lookup_for(&mock_server);
    let (old, new) = tokio::join!(lookup.lookup("Oldtown"), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        lookup.lookup("Newtown").await
    });

    assert!(old.is_superseded());
    let new = new.report().unwrap();
    assert!(new.is_complete());

    let latest = lookup.latest().unwrap();
    assert_eq!(latest.ticket.query, "Newtown");
    assert_eq!(latest.ticket, new.ticket);
    assert_eq!(latest.resolved_location().unwrap().latitude, 20.5);
}

#[tokio::test]
async fn test_retry_panel_replaces_failure() {
    let mock_server = MockServer::start().await;
    mount_geocode(&mock_server, "Paris", None).await;
    mount_current(&mock_server).await;
    mount_forecast(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    mount_air(&mock_server).await;

    let lookup = lookup_for(&mock_server);
    let first = lookup.lookup("Paris").await;
    let first = first.report().unwrap();
    assert_eq!(first.failed_panels(), vec![Panel::AirQuality]);
    assert!(first
        .air_quality
        .as_ref()
        .unwrap()
        .failure()
        .unwrap()
        .is_retryable());

    let retried = lookup.retry_panel(Panel::AirQuality).await.unwrap();
    let retried = retried.report().unwrap();

    assert_eq!(retried.ticket, first.ticket);
    assert!(retried.is_complete());
    assert!(lookup.latest().unwrap().is_complete());

    // Retrying a successful panel changes nothing
    let again = lookup.retry_panel(Panel::AirQuality).await.unwrap();
    assert!(again.report().unwrap().is_complete());
}

#[tokio::test]
async fn test_suggest_short_query_never_reaches_upstream() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([city("Paris")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let lookup = lookup_for(&mock_server);

    let short = lookup.suggest("P").await;
    assert_eq!(short, FetchOutcome::Success(Vec::new()));

    let suggestions = lookup.suggest("Par").await.into_success().unwrap();
    assert_eq!(suggestions.len(), 1);
}
