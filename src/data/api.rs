//! Serde mirrors of the api.weather.gov GeoJSON payloads
//!
//! Only the fields the normalization layer actually reads are mirrored.
//! Everything here is crate-private; components decode the fetch client's
//! `serde_json::Value` payloads into these and convert to the public models.

use serde::Deserialize;

/// A `{unitCode, value}` quantity; value is null when unmeasured
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UnitValue {
    pub unit_code: Option<String>,
    pub value: Option<f64>,
}

/// GeoJSON point geometry: coordinates are `[lon, lat]`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PointGeometry {
    pub coordinates: Vec<f64>,
}

/// GeoJSON polygon geometry: an outer ring of `[lon, lat]` pairs plus
/// optional holes (ignored)
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PolygonGeometry {
    pub coordinates: Vec<Vec<Vec<f64>>>,
}

// --- /points/{lat},{lon} ---

#[derive(Debug, Deserialize)]
pub(crate) struct PointsResponse {
    pub properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PointsProperties {
    pub grid_id: String,
    pub grid_x: i64,
    pub grid_y: i64,
    pub time_zone: Option<String>,
    pub relative_location: Option<RelativeLocation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelativeLocation {
    pub properties: RelativeLocationProperties,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelativeLocationProperties {
    pub city: Option<String>,
    pub state: Option<String>,
}

// --- /gridpoints/{wfo}/{x},{y} ---

#[derive(Debug, Deserialize)]
pub(crate) struct GridpointResponse {
    pub geometry: Option<PolygonGeometry>,
    pub properties: GridpointProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GridpointProperties {
    pub probability_of_precipitation: Option<GridValueLayer>,
}

/// A time-series layer of duration-coded values
#[derive(Debug, Deserialize)]
pub(crate) struct GridValueLayer {
    pub values: Vec<GridValue>,
}

/// One duration-coded sample: `validTime` is `<ISO8601 start>/<ISO8601 duration>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GridValue {
    pub valid_time: String,
    pub value: Option<f64>,
}

// --- /gridpoints/{wfo}/{x},{y}/forecast[/hourly] ---

#[derive(Debug, Deserialize)]
pub(crate) struct ForecastResponse {
    pub properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForecastProperties {
    pub periods: Vec<ApiPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiPeriod {
    pub number: Option<i64>,
    #[serde(default)]
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_daytime: bool,
    pub temperature: Option<f64>,
    pub probability_of_precipitation: Option<UnitValue>,
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    #[serde(default)]
    pub short_forecast: String,
    pub icon: Option<String>,
}

// --- /gridpoints/{wfo}/{x},{y}/stations ---

#[derive(Debug, Deserialize)]
pub(crate) struct StationsResponse {
    pub features: Vec<StationFeature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StationFeature {
    pub geometry: Option<PointGeometry>,
    pub properties: StationProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StationProperties {
    pub station_identifier: String,
}

// --- /stations/{id}/observations?limit=1 ---

#[derive(Debug, Deserialize)]
pub(crate) struct ObservationsResponse {
    pub features: Vec<ObservationFeature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ObservationFeature {
    pub geometry: Option<PointGeometry>,
    pub properties: ObservationProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ObservationProperties {
    pub timestamp: Option<String>,
    #[serde(default)]
    pub temperature: UnitValue,
    #[serde(default)]
    pub heat_index: UnitValue,
    #[serde(default)]
    pub wind_chill: UnitValue,
    #[serde(default)]
    pub relative_humidity: UnitValue,
    #[serde(default)]
    pub wind_speed: UnitValue,
    #[serde(default)]
    pub wind_direction: UnitValue,
    pub icon: Option<String>,
    pub text_description: Option<String>,
    pub station: Option<String>,
}

impl PointGeometry {
    /// `[lon, lat]` to a model point, when both coordinates are present
    pub(crate) fn to_point(&self) -> Option<crate::data::Point> {
        match self.coordinates.as_slice() {
            [longitude, latitude, ..] => Some(crate::data::Point {
                latitude: *latitude,
                longitude: *longitude,
            }),
            _ => None,
        }
    }
}

impl PolygonGeometry {
    /// Outer ring as model points
    pub(crate) fn outer_ring(&self) -> Vec<crate::data::Point> {
        self.coordinates
            .first()
            .map(|ring| {
                ring.iter()
                    .filter_map(|pair| match pair.as_slice() {
                        [longitude, latitude, ..] => Some(crate::data::Point {
                            latitude: *latitude,
                            longitude: *longitude,
                        }),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
