//! Normalized data models for wxgrid
//!
//! These are the display-ready shapes handed to the page-rendering layer,
//! plus the intermediate models (observations, forecast periods) that the
//! components operate on. Serde mirrors of the raw upstream payloads live
//! in [`api`].

pub(crate) mod api;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

/// A forecast grid cell — the unit of caching and addressing
///
/// Derived once from a lat/lon via the upstream point-to-grid call and
/// stable for the life of the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    /// Forecast office identifier, always uppercased
    pub wfo: String,
    pub x: i64,
    pub y: i64,
}

impl Grid {
    pub fn new(wfo: impl Into<String>, x: i64, y: i64) -> Self {
        Self {
            wfo: wfo.into().to_uppercase(),
            x,
            y,
        }
    }

    /// Stable identifier for logging and diagnostics
    pub fn id(&self) -> String {
        format!("{}/{},{}", self.wfo, self.x, self.y)
    }

    pub fn gridpoint_path(&self) -> String {
        format!("/gridpoints/{}/{},{}", self.wfo, self.x, self.y)
    }

    pub fn forecast_path(&self) -> String {
        format!("{}/forecast", self.gridpoint_path())
    }

    pub fn forecast_hourly_path(&self) -> String {
        format!("{}/forecast/hourly", self.gridpoint_path())
    }

    pub fn stations_path(&self) -> String {
        format!("{}/stations", self.gridpoint_path())
    }
}

/// A raw observation from a reporting station
///
/// Quantities are kept in the upstream unit (degrees Celsius, km/h) and
/// converted at formatting time. An observation is structurally valid only
/// when its temperature has a value; invalid observations are skipped by
/// the station selector but never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Temperature in the upstream unit
    pub temperature: Option<f64>,
    /// Upstream unit code for temperature-like quantities (e.g. `wmoUnit:degC`)
    pub temperature_unit_code: Option<String>,
    pub heat_index: Option<f64>,
    pub wind_chill: Option<f64>,
    /// Relative humidity percentage
    pub relative_humidity: Option<f64>,
    /// Wind speed in km/h
    pub wind_speed: Option<f64>,
    /// Wind direction in degrees
    pub wind_direction: Option<f64>,
    /// Icon reference URL encoding one or two simultaneous conditions
    pub icon: Option<String>,
    /// Free-text description of current conditions
    pub description: Option<String>,
    pub station_id: String,
    pub location: Option<Point>,
}

impl Observation {
    /// Structural validity: the temperature must have a numeric value
    pub fn is_valid(&self) -> bool {
        self.temperature.is_some()
    }
}

/// One upstream forecast period; periods arrive time-ordered and alternate
/// day/night
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub number: Option<i64>,
    /// Upstream short/day name (e.g. "Tonight", "Thursday")
    pub name: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub is_daytime: bool,
    pub temperature: Option<f64>,
    /// Precipitation probability percentage
    pub probability_of_precipitation: Option<f64>,
    pub short_forecast: String,
    /// Upstream wind speed phrase (e.g. "5 to 10 mph")
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    pub icon: Option<String>,
}

/// A named place resolved from the place-lookup collaborator or from a
/// user-supplied free-text override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    /// Two-letter state code
    pub state: String,
    pub state_name: Option<String>,
    pub state_fips: Option<String>,
    pub county_fips: Option<String>,
    pub county: Option<String>,
    pub timezone: Option<chrono_tz::Tz>,
}

/// Distance diagnostics produced once per successful station selection
///
/// Purely telemetry for station-health monitoring; carries no control-flow
/// weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceInfo {
    /// Linear distance (km) from the observation to the reference point, or
    /// to the nearest grid-cell vertex when no reference point was supplied
    pub distance_km: Option<f64>,
    pub within_grid_cell: bool,
    /// Whether an explicit reference point was used rather than the cell
    pub uses_reference_point: bool,
    pub observation_point: Option<Point>,
    pub station_id: String,
    /// Zero-based fallback depth that was needed
    pub station_index: usize,
}

/// Wind direction as display strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindDirection {
    /// Full ordinal, e.g. "northeast"
    pub ordinal: String,
    /// Abbreviation, e.g. "NE"
    pub abbreviation: String,
}

/// Current conditions at a grid cell, ready for display
#[derive(Debug, Clone, Serialize)]
pub struct CurrentConditions {
    /// Temperature in °F, rounded
    pub temperature: i64,
    /// Feels-like in °F: heat index, else wind chill, else temperature
    pub feels_like: i64,
    /// Relative humidity percentage, rounded
    pub humidity: Option<i64>,
    /// Wind speed in mph, rounded
    pub wind_speed: Option<i64>,
    pub wind_direction: Option<WindDirection>,
    /// Display icon file name
    pub icon: String,
    /// Display condition text
    pub condition: String,
    /// Upstream free-text description, translated
    pub description: String,
    pub station_id: String,
    pub timestamp: Option<DateTime<FixedOffset>>,
}

/// One hour of forecast, ready for display
#[derive(Debug, Clone, Serialize)]
pub struct HourlyPeriod {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub temperature: Option<i64>,
    pub probability_of_precipitation: Option<i64>,
    pub short_forecast: String,
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    pub icon: String,
    pub condition: String,
}

/// A formatted daily forecast period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPeriod {
    /// Full day name, e.g. "Monday"
    pub day_name: String,
    /// Abbreviated day name, e.g. "Mon"
    pub short_day_name: String,
    /// "Month Day" label, e.g. "June 5"
    pub month_day: String,
    pub start_time: DateTime<FixedOffset>,
    pub is_daytime: bool,
    /// Sentence-cased short forecast text
    pub short_forecast: String,
    pub icon: String,
    pub icon_basename: String,
    /// Temperature passed through verbatim from upstream
    pub temperature: Option<f64>,
    pub probability_of_precipitation: Option<f64>,
}

/// A day and night period grouped together
///
/// Either side may be absent at day boundaries; an odd trailing period
/// forms a pair with a missing counterpart rather than an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DayNightPair {
    pub daytime: Option<DailyPeriod>,
    pub nighttime: Option<DailyPeriod>,
}

/// Daily forecast for a grid cell: remainder of today, the next N days in
/// detail, and the extended tail
#[derive(Debug, Clone, Serialize)]
pub struct DailyForecast {
    pub today: Vec<DailyPeriod>,
    pub detailed: Vec<DayNightPair>,
    pub extended: Vec<DayNightPair>,
}

/// One precipitation window with explicit bounds in the place timezone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipPeriod {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    /// Probability of precipitation percentage, when reported
    pub value: Option<f64>,
}
