//! Integration tests against a mock upstream API

use chrono::{DateTime, Utc};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wxgrid::data::Grid;
use wxgrid::{FetchClient, FetchError, StationSelector, WeatherDataService};

fn points_body() -> serde_json::Value {
    json!({
        "properties": {
            "gridId": "OKX",
            "gridX": 33,
            "gridY": 35,
            "timeZone": "America/New_York",
            "relativeLocation": {
                "properties": { "city": "Brooklyn", "state": "NY" }
            }
        }
    })
}

fn stations_body(ids: &[&str]) -> serde_json::Value {
    let features: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            json!({
                "geometry": { "coordinates": [-73.96, 40.77] },
                "properties": { "stationIdentifier": id }
            })
        })
        .collect();
    json!({ "features": features })
}

fn observation_body(temperature: serde_json::Value) -> serde_json::Value {
    json!({
        "features": [{
            "geometry": { "coordinates": [-73.96, 40.77] },
            "properties": {
                "timestamp": "2026-08-20T13:51:00+00:00",
                "temperature": { "unitCode": "wmoUnit:degC", "value": temperature },
                "relativeHumidity": { "unitCode": "wmoUnit:percent", "value": 64.5 },
                "windSpeed": { "unitCode": "wmoUnit:km_h-1", "value": 14.8 },
                "windDirection": { "unitCode": "wmoUnit:degree_(angle)", "value": 230.0 },
                "icon": "https://api.weather.gov/icons/land/day/bkn?size=medium",
                "textDescription": "Mostly Cloudy"
            }
        }]
    })
}

fn forecast_period(
    name: &str,
    start: &str,
    end: &str,
    is_daytime: bool,
    icon: &str,
) -> serde_json::Value {
    json!({
        "name": name,
        "startTime": start,
        "endTime": end,
        "isDaytime": is_daytime,
        "temperature": 80,
        "probabilityOfPrecipitation": { "unitCode": "wmoUnit:percent", "value": 20 },
        "windSpeed": "5 to 10 mph",
        "windDirection": "SW",
        "shortForecast": "Partly Cloudy",
        "icon": icon
    })
}

fn mount_observations(server: &MockServer, station_id: &str, response: ResponseTemplate) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/stations/{station_id}/observations")))
        .and(query_param("limit", "1"))
        .respond_with(response)
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-08-20T14:00:00+00:00")
        .expect("fixture time parses")
        .with_timezone(&Utc)
}

async fn resolved_service(server: &MockServer) -> (WeatherDataService, Grid) {
    Mock::given(method("GET"))
        .and(path("/points/40.7,-74"))
        .respond_with(ResponseTemplate::new(200).set_body_json(points_body()))
        .mount(server)
        .await;

    let mut service = WeatherDataService::new().with_base_url(server.uri());
    let grid = service
        .resolve_grid(40.7, -74.0)
        .await
        .expect("grid resolves");
    (service, grid)
}

#[tokio::test]
async fn test_payload_fetched_once_per_unit_of_work() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/points/40.7,-74"))
        .respond_with(ResponseTemplate::new(200).set_body_json(points_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new("test-correlation").with_base_url(server.uri());
    let first = client.fetch("/points/40.7,-74").await.expect("fetches");
    let second = client.fetch("/points/40.7,-74").await.expect("replays");
    assert_eq!(first, second);
    assert_eq!(client.cache().len(), 1);
}

#[tokio::test]
async fn test_correlation_header_sent_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/points/40.7,-74"))
        .and(header("wx-gov-response-id", "unit-of-work-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(points_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new("unit-of-work-7").with_base_url(server.uri());
    client.fetch("/points/40.7,-74").await.expect("fetches");
}

#[tokio::test]
async fn test_server_errors_retried_then_cached_as_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;

    let client = FetchClient::new("test-correlation").with_base_url(server.uri());
    let error = client
        .fetch("/gridpoints/OKX/33,35/forecast")
        .await
        .expect_err("budget exhausts");
    assert!(matches!(error, FetchError::Transient { status: 500, .. }));

    // Second call replays the cached failure; the expect(5) above verifies
    // no sixth request goes out.
    let replayed = client
        .fetch("/gridpoints/OKX/33,35/forecast")
        .await
        .expect_err("fails fast");
    assert!(matches!(replayed, FetchError::Transient { status: 500, .. }));
}

#[tokio::test]
async fn test_client_error_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/points/91.0,0"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new("test-correlation").with_base_url(server.uri());
    let error = client.fetch("/points/91.0,0").await.expect_err("404 is fatal");
    assert!(matches!(error, FetchError::Fatal { status: 404, .. }));
}

#[tokio::test]
async fn test_station_fallback_walks_to_third_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/stations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(stations_body(&["KAAA", "KBBB", "KCCC", "KDDD"])),
        )
        .mount(&server)
        .await;

    // First candidate reports a null temperature, second errors outright,
    // third is valid. The fourth is beyond the walk bound.
    mount_observations(
        &server,
        "KAAA",
        ResponseTemplate::new(200).set_body_json(observation_body(json!(null))),
    )
    .expect(1)
    .mount(&server)
    .await;
    mount_observations(&server, "KBBB", ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_observations(
        &server,
        "KCCC",
        ResponseTemplate::new(200).set_body_json(observation_body(json!(21.0))),
    )
    .expect(1)
    .mount(&server)
    .await;
    mount_observations(&server, "KDDD", ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = FetchClient::new("test-correlation").with_base_url(server.uri());
    let selector = StationSelector::new(&client);
    let (observation, index) = selector
        .select_observation(&Grid::new("OKX", 33, 35))
        .await
        .expect("falls back to a valid candidate");

    assert_eq!(index, 2);
    assert_eq!(observation.station_id, "KCCC");
    assert!(observation.is_valid());
}

#[tokio::test]
async fn test_station_bound_exhaustion_surfaces_last_examined() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/stations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(stations_body(&["KAAA", "KBBB", "KCCC", "KDDD", "KEEE"])),
        )
        .mount(&server)
        .await;

    for id in ["KAAA", "KBBB", "KCCC"] {
        mount_observations(
            &server,
            id,
            ResponseTemplate::new(200).set_body_json(observation_body(json!(null))),
        )
        .expect(1)
        .mount(&server)
        .await;
    }
    mount_observations(&server, "KDDD", ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = FetchClient::new("test-correlation").with_base_url(server.uri());
    let selector = StationSelector::new(&client);
    let (observation, index) = selector
        .select_observation(&Grid::new("OKX", 33, 35))
        .await
        .expect("bound exhaustion degrades, not errors");

    assert_eq!(index, 2);
    assert_eq!(observation.station_id, "KCCC");
    assert!(!observation.is_valid());
}

#[tokio::test]
async fn test_current_conditions_end_to_end() {
    let server = MockServer::start().await;
    let (mut service, grid) = resolved_service(&server).await;

    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/stations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stations_body(&["KNYC"])))
        .mount(&server)
        .await;
    mount_observations(
        &server,
        "KNYC",
        ResponseTemplate::new(200).set_body_json(observation_body(json!(20.0))),
    )
    .mount(&server)
    .await;
    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "geometry": {
                "coordinates": [[[-74.0, 40.7], [-73.9, 40.7], [-73.9, 40.8], [-74.0, 40.8], [-74.0, 40.7]]]
            },
            "properties": {}
        })))
        .mount(&server)
        .await;

    let conditions = service
        .current_conditions(&grid)
        .await
        .expect("succeeds")
        .expect("observation is valid");

    assert_eq!(conditions.temperature, 68);
    assert_eq!(conditions.feels_like, 68);
    assert_eq!(conditions.humidity, Some(65));
    assert_eq!(conditions.wind_speed, Some(9));
    let direction = conditions.wind_direction.expect("direction present");
    assert_eq!(direction.abbreviation, "SW");
    assert_eq!(direction.ordinal, "southwest");
    assert_eq!(conditions.icon, "mostly-cloudy.svg");
    assert_eq!(conditions.condition, "Mostly cloudy");
    assert_eq!(conditions.description, "Mostly Cloudy");
    assert_eq!(conditions.station_id, "KNYC");

    let place = service.place().expect("place resolved");
    assert_eq!(place.city, "Brooklyn");
    assert_eq!(place.state, "NY");
}

#[tokio::test]
async fn test_current_conditions_degrade_to_none_without_stations() {
    let server = MockServer::start().await;
    let (mut service, grid) = resolved_service(&server).await;

    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/stations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "features": [] })))
        .mount(&server)
        .await;

    let conditions = service.current_conditions(&grid).await.expect("no error");
    assert!(conditions.is_none());
}

#[tokio::test]
async fn test_grid_resolution_failure_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/points/40.7,-74"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut service = WeatherDataService::new().with_base_url(server.uri());
    assert!(service.resolve_grid(40.7, -74.0).await.is_none());
}

#[tokio::test]
async fn test_daily_forecast_groups_in_place_timezone() {
    let server = MockServer::start().await;
    let (mut service, grid) = resolved_service(&server).await;

    let day_icon = "https://api.weather.gov/icons/land/day/skc?size=medium";
    let night_icon = "https://api.weather.gov/icons/land/night/skc?size=medium";
    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "periods": [
                forecast_period("This Afternoon", "2026-08-20T06:00:00-04:00", "2026-08-20T18:00:00-04:00", true, day_icon),
                forecast_period("Tonight", "2026-08-20T18:00:00-04:00", "2026-08-21T06:00:00-04:00", false, night_icon),
                forecast_period("Friday", "2026-08-21T06:00:00-04:00", "2026-08-21T18:00:00-04:00", true, day_icon),
                forecast_period("Friday Night", "2026-08-21T18:00:00-04:00", "2026-08-22T06:00:00-04:00", false, night_icon),
            ]}
        })))
        .mount(&server)
        .await;

    let forecast = service
        .daily_forecast(&grid, now(), None)
        .await
        .expect("forecast fetches");

    assert_eq!(forecast.today.len(), 2);
    assert_eq!(forecast.today[0].month_day, "August 20");
    assert_eq!(forecast.today[0].short_forecast, "Partly cloudy");
    assert_eq!(forecast.today[0].icon, "sunny.svg");

    assert_eq!(forecast.detailed.len(), 1);
    let friday = forecast.detailed[0].daytime.as_ref().expect("daytime half");
    assert_eq!(friday.day_name, "Friday");
    assert_eq!(friday.short_day_name, "Fri");
    assert!(friday.is_daytime);
    let friday_night = forecast.detailed[0]
        .nighttime
        .as_ref()
        .expect("nighttime half");
    assert_eq!(friday_night.icon, "clear-night.svg");

    assert!(forecast.extended.is_empty());
}

#[tokio::test]
async fn test_hourly_forecast_drops_elapsed_hours() {
    let server = MockServer::start().await;
    let (mut service, grid) = resolved_service(&server).await;

    let icon = "https://api.weather.gov/icons/land/day/sct?size=small";
    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35/forecast/hourly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "periods": [
                forecast_period("", "2026-08-20T08:00:00-04:00", "2026-08-20T09:00:00-04:00", true, icon),
                forecast_period("", "2026-08-20T10:00:00-04:00", "2026-08-20T11:00:00-04:00", true, icon),
                forecast_period("", "2026-08-20T11:00:00-04:00", "2026-08-20T12:00:00-04:00", true, icon),
            ]}
        })))
        .mount(&server)
        .await;

    let hours = service
        .hourly_forecast(&grid, now())
        .await
        .expect("forecast fetches");

    assert_eq!(hours.len(), 2);
    assert_eq!(hours[0].start_time.to_rfc3339(), "2026-08-20T10:00:00-04:00");
    assert_eq!(hours[0].temperature, Some(80));
    assert_eq!(hours[0].probability_of_precipitation, Some(20));
    assert_eq!(hours[0].icon, "partly-cloudy.svg");
    assert_eq!(hours[0].condition, "Partly cloudy");
}

#[tokio::test]
async fn test_precipitation_windows_expanded_in_place_timezone() {
    let server = MockServer::start().await;
    let (mut service, grid) = resolved_service(&server).await;

    Mock::given(method("GET"))
        .and(path("/gridpoints/OKX/33,35"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "geometry": {
                "coordinates": [[[-74.0, 40.7], [-73.9, 40.7], [-73.9, 40.8], [-74.0, 40.8], [-74.0, 40.7]]]
            },
            "properties": {
                "probabilityOfPrecipitation": {
                    "values": [
                        { "validTime": "2026-08-20T08:00:00+00:00/PT2H", "value": 10 },
                        { "validTime": "2026-08-20T14:00:00+00:00/PT6H", "value": 30 }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let windows = service
        .hourly_precipitation(&grid, now())
        .await
        .expect("gridpoint fetches");

    assert_eq!(windows.len(), 1, "elapsed window dropped");
    assert_eq!(windows[0].value, Some(30.0));
    assert_eq!(windows[0].start_time.to_rfc3339(), "2026-08-20T10:00:00-04:00");
    assert_eq!(windows[0].end_time.to_rfc3339(), "2026-08-20T16:00:00-04:00");
}
