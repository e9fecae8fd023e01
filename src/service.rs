//! Orchestration of one logical unit of work
//!
//! A [`WeatherDataService`] instance *is* one unit of work: it owns the
//! correlation id, the request-scoped cache, and the memoized grid
//! geometry, reference point, and place. Create a new instance per
//! request-equivalent piece of work and discard it afterwards; nothing
//! here persists.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use uuid::Uuid;

use crate::data::api::{ForecastResponse, GridpointResponse, PointsResponse};
use crate::data::{
    CurrentConditions, DailyForecast, ForecastPeriod, Grid, HourlyPeriod, Observation, Place,
    Point, PrecipPeriod, WindDirection,
};
use crate::fetch::{FetchClient, FetchError};
use crate::icons;
use crate::periods;
use crate::place::{
    parse_place_override, IdentityTranslator, MetricsSink, NoPlaceLookup, NoopMetrics,
    PlaceLookup, Translator,
};
use crate::stations::{self, StationError, StationSelector};
use crate::units;

/// Errors surfaced by the orchestrator
///
/// Grid-resolution failures never appear here: they are swallowed at the
/// boundary and surface as an absent grid so the page layer can degrade.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Station(#[from] StationError),

    #[error("unexpected payload from {context}: {message}")]
    Payload { context: String, message: String },

    #[error("grid resolution failed for {latitude},{longitude}: {message}")]
    GeometryUnavailable {
        latitude: f64,
        longitude: f64,
        message: String,
    },
}

/// Answers the page layer's questions for one unit of work: current
/// conditions, hourly and daily forecasts, and precipitation timelines,
/// all keyed by grid cell
pub struct WeatherDataService {
    fetch: FetchClient,
    place_lookup: Box<dyn PlaceLookup>,
    translator: Box<dyn Translator>,
    metrics: Box<dyn MetricsSink>,
    detailed_days: usize,
    // Memoized derived state for this unit of work
    grid_geometry: Option<Vec<Point>>,
    reference_point: Option<Point>,
    place: Option<Place>,
}

impl Default for WeatherDataService {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherDataService {
    /// Starts a unit of work with a fresh correlation id and cache
    pub fn new() -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        Self {
            fetch: FetchClient::new(correlation_id),
            place_lookup: Box::new(NoPlaceLookup),
            translator: Box::new(IdentityTranslator),
            metrics: Box::new(NoopMetrics),
            detailed_days: periods::DEFAULT_DETAILED_DAYS,
            grid_geometry: None,
            reference_point: None,
            place: None,
        }
    }

    /// Overrides the upstream base URL (testing, proxying)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.fetch = self.fetch.with_base_url(base_url);
        self
    }

    pub fn with_place_lookup(mut self, lookup: Box<dyn PlaceLookup>) -> Self {
        self.place_lookup = lookup;
        self
    }

    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_metrics(mut self, metrics: Box<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Days covered by the detailed daily group (default 5)
    pub fn with_detailed_days(mut self, days: usize) -> Self {
        self.detailed_days = days;
        self
    }

    /// Applies a user-supplied place override, parsed as `"City, ST, USA"`;
    /// unparseable text is ignored
    pub fn with_place_override(mut self, text: &str) -> Self {
        match parse_place_override(text) {
            Some(place) => self.place = Some(place),
            None => tracing::debug!(text, "ignoring unparseable place override"),
        }
        self
    }

    /// The correlation id every upstream call from this unit of work carries
    pub fn correlation_id(&self) -> &str {
        self.fetch.correlation_id()
    }

    /// The place this unit of work resolved, if any
    pub fn place(&self) -> Option<&Place> {
        self.place.as_ref()
    }

    /// Resolves a lat/lon to its forecast grid cell
    ///
    /// Failure is swallowed here: the caller receives `None` and downstream
    /// displays degrade to "no data" rather than erroring.
    pub async fn resolve_grid(&mut self, latitude: f64, longitude: f64) -> Option<Grid> {
        match self.try_resolve_grid(latitude, longitude).await {
            Ok(grid) => {
                tracing::debug!(grid = %grid.id(), "grid resolved");
                Some(grid)
            }
            Err(error) => {
                tracing::warn!(
                    latitude,
                    longitude,
                    correlation_id = %self.correlation_id(),
                    "grid resolution failed, degrading to no data: {error}"
                );
                None
            }
        }
    }

    async fn try_resolve_grid(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Grid, ServiceError> {
        let payload = self
            .fetch
            .fetch(&format!("/points/{latitude},{longitude}"))
            .await?;
        let points: PointsResponse =
            serde_json::from_value(payload).map_err(|e| ServiceError::GeometryUnavailable {
                latitude,
                longitude,
                message: e.to_string(),
            })?;

        let props = points.properties;
        let grid = Grid::new(props.grid_id, props.grid_x, props.grid_y);

        let point = Point {
            latitude,
            longitude,
        };
        self.reference_point = Some(point);
        self.resolve_place(&point, &props.time_zone, props.relative_location.as_ref())
            .await;

        Ok(grid)
    }

    /// Fills in the place for this unit of work, preferring (in order) an
    /// already-set override, the external lookup, and the upstream relative
    /// location; the upstream timezone backfills whichever source lacks one
    async fn resolve_place(
        &mut self,
        point: &Point,
        time_zone: &Option<String>,
        relative: Option<&crate::data::api::RelativeLocation>,
    ) {
        let upstream_tz: Option<Tz> = time_zone.as_deref().and_then(|t| t.parse().ok());

        if self.place.is_none() {
            self.place = match self.place_lookup.nearest_place_to_point(point).await {
                Some(place) => Some(place),
                None => relative.and_then(|r| {
                    let city = r.properties.city.clone()?;
                    let state = r.properties.state.clone()?;
                    Some(Place {
                        city,
                        state,
                        state_name: None,
                        state_fips: None,
                        county_fips: None,
                        county: None,
                        timezone: None,
                    })
                }),
            };
        }

        if let Some(place) = self.place.as_mut() {
            if place.timezone.is_none() {
                place.timezone = upstream_tz;
            }
        }
    }

    /// Current conditions for a grid cell, or `None` when no usable
    /// observation exists
    pub async fn current_conditions(
        &mut self,
        grid: &Grid,
    ) -> Result<Option<CurrentConditions>, ServiceError> {
        let selector = StationSelector::new(&self.fetch);
        let (observation, station_index) = match selector.select_observation(grid).await {
            Ok(selected) => selected,
            Err(StationError::NoValidStation(grid_id)) => {
                tracing::info!(grid = %grid_id, "no observation stations, degrading to no data");
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };
        tracing::debug!(station = %observation.station_id, station_index, "station selected");

        self.ensure_grid_geometry(grid).await;
        let info = stations::distance_info(
            &observation,
            station_index,
            self.grid_geometry.as_deref(),
            self.reference_point.as_ref(),
        );
        if let Err(error) = self.metrics.record_station_distance(&info) {
            tracing::warn!("discarding metrics failure: {error}");
        }

        // The selector may have surfaced an invalid last-examined
        // observation; re-check and degrade rather than crash.
        Ok(format_current_conditions(
            &observation,
            self.translator.as_ref(),
        ))
    }

    /// Hourly forecast for a grid cell, windowed to hours ending at or
    /// after `now`
    pub async fn hourly_forecast(
        &mut self,
        grid: &Grid,
        now: DateTime<Utc>,
    ) -> Result<Vec<HourlyPeriod>, ServiceError> {
        let periods = self
            .fetch_periods(&grid.forecast_hourly_path(), "hourly forecast")
            .await?;

        Ok(periods
            .iter()
            .filter(|p| p.end_time >= now)
            .map(|p| {
                let display = icons::resolve_or_no_data(&icons::derive_key(p.icon.as_deref()));
                HourlyPeriod {
                    start_time: self.to_place_time(p.start_time),
                    end_time: self.to_place_time(p.end_time),
                    temperature: p.temperature.map(|t| t.round() as i64),
                    probability_of_precipitation: p
                        .probability_of_precipitation
                        .map(|v| v.round() as i64),
                    short_forecast: p.short_forecast.clone(),
                    wind_speed: p.wind_speed.clone(),
                    wind_direction: p.wind_direction.clone(),
                    icon: display.icon,
                    condition: self.translator.translate(&display.text),
                }
            })
            .collect())
    }

    /// Daily forecast for a grid cell: remainder of today, `detailed_days`
    /// of day/night pairs, and the extended tail
    pub async fn daily_forecast(
        &mut self,
        grid: &Grid,
        now: DateTime<Utc>,
        detailed_days: Option<usize>,
    ) -> Result<DailyForecast, ServiceError> {
        let days = detailed_days.unwrap_or(self.detailed_days);
        let all: Vec<ForecastPeriod> = self
            .fetch_periods(&grid.forecast_path(), "daily forecast")
            .await?
            .into_iter()
            .map(|mut p| {
                p.start_time = self.to_place_time(p.start_time);
                p.end_time = self.to_place_time(p.end_time);
                p
            })
            .collect();

        let local_now = self.to_place_time(now.fixed_offset());
        let today = periods::filter_to_today(&all, &local_now)
            .iter()
            .filter_map(|p| periods::format_daily_period(Some(p)))
            .collect();
        let detailed =
            periods::group_into_pairs(&periods::filter_to_future_days(&all, &local_now, Some(days)));
        let extended =
            periods::group_into_pairs(&periods::filter_to_extended(&all, &local_now, days));

        tracing::debug!(grid = %grid.id(), days, "daily forecast formatted");
        Ok(DailyForecast {
            today,
            detailed,
            extended,
        })
    }

    /// Hourly precipitation probability for a grid cell, windowed to
    /// periods ending at or after `now`, with duration-coded validity
    /// windows expanded into explicit bounds in the place timezone
    pub async fn hourly_precipitation(
        &mut self,
        grid: &Grid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PrecipPeriod>, ServiceError> {
        let payload = self.fetch.fetch(&grid.gridpoint_path()).await?;
        let gridpoint: GridpointResponse =
            serde_json::from_value(payload).map_err(|e| ServiceError::Payload {
                context: grid.gridpoint_path(),
                message: e.to_string(),
            })?;

        if self.grid_geometry.is_none() {
            self.grid_geometry = gridpoint.geometry.as_ref().map(|g| g.outer_ring());
        }

        let values = gridpoint
            .properties
            .probability_of_precipitation
            .map(|layer| layer.values)
            .unwrap_or_default();

        Ok(values
            .iter()
            .filter_map(|sample| {
                let (start, end) = periods::parse_validity_window(&sample.valid_time)?;
                if end < now {
                    return None;
                }
                Some(PrecipPeriod {
                    start_time: self.to_place_time(start),
                    end_time: self.to_place_time(end),
                    value: sample.value,
                })
            })
            .collect())
    }

    /// Fetches and decodes a forecast endpoint into model periods
    async fn fetch_periods(
        &self,
        path: &str,
        context: &str,
    ) -> Result<Vec<ForecastPeriod>, ServiceError> {
        let payload = self.fetch.fetch(path).await?;
        let forecast: ForecastResponse =
            serde_json::from_value(payload).map_err(|e| ServiceError::Payload {
                context: context.to_string(),
                message: e.to_string(),
            })?;
        Ok(forecast
            .properties
            .periods
            .iter()
            .filter_map(periods::period_from_api)
            .collect())
    }

    /// Memoizes the grid-cell polygon; failure leaves it absent, which only
    /// weakens the distance diagnostics
    async fn ensure_grid_geometry(&mut self, grid: &Grid) {
        if self.grid_geometry.is_some() {
            return;
        }
        match self.fetch.fetch(&grid.gridpoint_path()).await {
            Ok(payload) => {
                let parsed: Result<GridpointResponse, _> = serde_json::from_value(payload);
                self.grid_geometry = parsed
                    .ok()
                    .and_then(|g| g.geometry.map(|geom| geom.outer_ring()));
            }
            Err(error) => {
                tracing::debug!(grid = %grid.id(), "grid geometry unavailable: {error}");
            }
        }
    }

    fn place_timezone(&self) -> Option<Tz> {
        self.place.as_ref().and_then(|p| p.timezone)
    }

    /// Re-expresses a time in the place timezone when one is known
    fn to_place_time(&self, time: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self.place_timezone() {
            Some(tz) => time.with_timezone(&tz).fixed_offset(),
            None => time,
        }
    }
}

/// Formats a selected observation for display, or degrades to `None` when
/// it is structurally invalid
fn format_current_conditions(
    observation: &Observation,
    translator: &dyn Translator,
) -> Option<CurrentConditions> {
    let raw_temperature = observation.temperature?;
    let unit_code = observation.temperature_unit_code.as_deref();

    // Feels-like prefers heat index, then wind chill, then the temperature
    let feels_like_raw = observation
        .heat_index
        .or(observation.wind_chill)
        .unwrap_or(raw_temperature);

    let display = icons::resolve_or_no_data(&icons::derive_key(observation.icon.as_deref()));

    Some(CurrentConditions {
        temperature: to_display_temperature(raw_temperature, unit_code),
        feels_like: to_display_temperature(feels_like_raw, unit_code),
        humidity: observation.relative_humidity.map(|h| h.round() as i64),
        wind_speed: observation.wind_speed.map(units::kmh_to_mph),
        wind_direction: observation.wind_direction.map(|angle| {
            let point = units::compass_point(angle);
            WindDirection {
                ordinal: point.ordinal.to_string(),
                abbreviation: point.abbreviation.to_string(),
            }
        }),
        icon: display.icon,
        condition: translator.translate(&display.text),
        description: translator.translate(observation.description.as_deref().unwrap_or("")),
        station_id: observation.station_id.clone(),
        timestamp: observation.timestamp,
    })
}

/// Converts an upstream temperature to display °F; values already reported
/// in Fahrenheit pass through
fn to_display_temperature(value: f64, unit_code: Option<&str>) -> i64 {
    let fahrenheit = match unit_code {
        Some(code) if code.ends_with("degF") => value,
        // Observations default to Celsius
        _ => units::celsius_to_fahrenheit(value),
    };
    fahrenheit.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(temperature: Option<f64>) -> Observation {
        Observation {
            timestamp: None,
            temperature,
            temperature_unit_code: Some("wmoUnit:degC".to_string()),
            heat_index: None,
            wind_chill: None,
            relative_humidity: Some(64.5),
            wind_speed: Some(100.0),
            wind_direction: Some(46.0),
            icon: Some("https://api.weather.gov/icons/land/day/skc".to_string()),
            description: Some("Sunny".to_string()),
            station_id: "KNYC".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_format_current_conditions_converts_units() {
        let conditions = format_current_conditions(&observation(Some(0.0)), &IdentityTranslator)
            .expect("valid observation formats");

        assert_eq!(conditions.temperature, 32);
        assert_eq!(conditions.feels_like, 32, "falls back to temperature");
        assert_eq!(conditions.humidity, Some(65));
        assert_eq!(conditions.wind_speed, Some(62));
        let direction = conditions.wind_direction.expect("direction");
        assert_eq!(direction.abbreviation, "NE");
        assert_eq!(conditions.icon, "sunny.svg");
        assert_eq!(conditions.condition, "Sunny");
    }

    #[test]
    fn test_format_current_conditions_invalid_observation_degrades() {
        assert!(format_current_conditions(&observation(None), &IdentityTranslator).is_none());
    }

    #[test]
    fn test_feels_like_prefers_heat_index_then_wind_chill() {
        let mut obs = observation(Some(30.0));
        obs.heat_index = Some(35.0);
        obs.wind_chill = Some(25.0);
        let conditions =
            format_current_conditions(&obs, &IdentityTranslator).expect("formats");
        assert_eq!(conditions.feels_like, 95, "heat index wins");

        obs.heat_index = None;
        let conditions =
            format_current_conditions(&obs, &IdentityTranslator).expect("formats");
        assert_eq!(conditions.feels_like, 77, "wind chill next");
    }

    #[test]
    fn test_to_display_temperature_passes_fahrenheit_through() {
        assert_eq!(to_display_temperature(68.4, Some("wmoUnit:degF")), 68);
        assert_eq!(to_display_temperature(20.0, Some("wmoUnit:degC")), 68);
        assert_eq!(to_display_temperature(20.0, None), 68);
    }

    #[test]
    fn test_service_has_unique_correlation_ids() {
        let a = WeatherDataService::new();
        let b = WeatherDataService::new();
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert!(!a.correlation_id().is_empty());
    }

    #[test]
    fn test_place_override_applied() {
        let service = WeatherDataService::new().with_place_override("Austin, TX, USA");
        let place = service.place().expect("override parsed");
        assert_eq!(place.city, "Austin");
        assert_eq!(place.state, "TX");
    }

    #[test]
    fn test_bad_place_override_ignored() {
        let service = WeatherDataService::new().with_place_override("not a place");
        assert!(service.place().is_none());
    }
}
