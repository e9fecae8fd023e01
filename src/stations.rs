//! Observation station fallback selection
//!
//! Candidate stations for a grid cell come back proximity-ranked from
//! upstream. The selector walks them in order, fetching the latest
//! observation for each, and stops at the first structurally valid one
//! (non-null temperature). The walk is bounded; when the bound is reached
//! without a valid observation the last-examined observation is returned
//! as-is and the caller degrades to a "no data" display after re-checking
//! validity.

use chrono::DateTime;
use thiserror::Error;

use crate::data::api::{ObservationFeature, ObservationsResponse, StationsResponse};
use crate::data::{DistanceInfo, Grid, Observation, Point};
use crate::fetch::{FetchClient, FetchError};
use crate::geometry;

/// Upper bound on the fallback walk, regardless of candidate count
pub const MAX_STATION_ATTEMPTS: usize = 3;

/// Errors from station selection
#[derive(Debug, Error)]
pub enum StationError {
    /// No candidate produced any observation at all
    #[error("no valid observation station for grid {0}")]
    NoValidStation(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unexpected stations payload for grid {grid}: {message}")]
    MalformedPayload { grid: String, message: String },
}

/// Walks a grid cell's candidate stations for a usable observation
#[derive(Debug)]
pub struct StationSelector<'a> {
    fetch: &'a FetchClient,
}

impl<'a> StationSelector<'a> {
    pub fn new(fetch: &'a FetchClient) -> Self {
        Self { fetch }
    }

    /// Selects the first valid observation for a grid, with its zero-based
    /// fallback index
    ///
    /// Candidates past the first valid one are never queried. When every
    /// examined candidate is invalid, the last-examined observation is
    /// returned (still invalid) so the caller can degrade; the error is
    /// reserved for "nothing fetchable at all".
    pub async fn select_observation(
        &self,
        grid: &Grid,
    ) -> Result<(Observation, usize), StationError> {
        let payload = self.fetch.fetch(&grid.stations_path()).await?;
        let stations: StationsResponse =
            serde_json::from_value(payload).map_err(|e| StationError::MalformedPayload {
                grid: grid.id(),
                message: e.to_string(),
            })?;

        if stations.features.is_empty() {
            return Err(StationError::NoValidStation(grid.id()));
        }

        let bound = stations.features.len().min(MAX_STATION_ATTEMPTS);
        let mut last_examined: Option<(Observation, usize)> = None;

        for (index, feature) in stations.features.iter().take(bound).enumerate() {
            let station_id = &feature.properties.station_identifier;
            let observation = match self.latest_observation(station_id).await {
                Ok(Some(observation)) => observation,
                Ok(None) => {
                    tracing::debug!(station_id, index, "station has no observations, skipping");
                    continue;
                }
                Err(error) => {
                    tracing::warn!(
                        station_id,
                        index,
                        "observation fetch failed, trying next candidate: {error}"
                    );
                    continue;
                }
            };

            if observation.is_valid() {
                if index > 0 {
                    tracing::info!(
                        station_id,
                        fallback_index = index,
                        grid = %grid.id(),
                        "primary station invalid, fell back"
                    );
                }
                return Ok((observation, index));
            }
            last_examined = Some((observation, index));
        }

        match last_examined {
            // Bound exhausted: surface the last (invalid) observation and let
            // the caller degrade rather than hard-fail.
            Some((observation, index)) => {
                tracing::info!(
                    grid = %grid.id(),
                    examined = index + 1,
                    "no valid observation within bound, returning last examined"
                );
                Ok((observation, index))
            }
            None => Err(StationError::NoValidStation(grid.id())),
        }
    }

    /// Latest observation for a station, or `None` when the station reports
    /// nothing
    async fn latest_observation(
        &self,
        station_id: &str,
    ) -> Result<Option<Observation>, StationError> {
        let payload = self
            .fetch
            .fetch(&format!("/stations/{station_id}/observations?limit=1"))
            .await?;
        let observations: ObservationsResponse =
            serde_json::from_value(payload).map_err(|e| StationError::MalformedPayload {
                grid: station_id.to_string(),
                message: e.to_string(),
            })?;

        Ok(observations
            .features
            .into_iter()
            .next()
            .map(|feature| observation_from_feature(feature, station_id)))
    }
}

/// Converts an upstream observation feature into the model observation
fn observation_from_feature(feature: ObservationFeature, station_id: &str) -> Observation {
    let location = feature.geometry.as_ref().and_then(|g| g.to_point());
    let props = feature.properties;
    Observation {
        timestamp: props
            .timestamp
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok()),
        temperature: props.temperature.value,
        temperature_unit_code: props.temperature.unit_code,
        heat_index: props.heat_index.value,
        wind_chill: props.wind_chill.value,
        relative_humidity: props.relative_humidity.value,
        wind_speed: props.wind_speed.value,
        wind_direction: props.wind_direction.value,
        icon: props.icon.filter(|i| !i.is_empty()),
        description: props.text_description,
        station_id: station_id.to_string(),
        location,
    }
}

/// Builds the distance diagnostics for a selected observation
///
/// Distance is measured to the explicit reference point when one was
/// supplied, otherwise to the nearest vertex of the grid-cell polygon.
pub fn distance_info(
    observation: &Observation,
    station_index: usize,
    cell_ring: Option<&[Point]>,
    reference_point: Option<&Point>,
) -> DistanceInfo {
    let uses_reference_point = reference_point.is_some();
    let (distance_km, within_grid_cell) = match observation.location {
        Some(obs_point) => {
            let within = cell_ring
                .map(|ring| geometry::point_in_polygon(&obs_point, ring))
                .unwrap_or(false);
            let distance = match reference_point {
                Some(reference) => Some(geometry::distance_km(&obs_point, reference)),
                None => cell_ring
                    .and_then(|ring| geometry::nearest_vertex(&obs_point, ring))
                    .map(|(_, d)| d),
            };
            (distance, within)
        }
        None => (None, false),
    };

    DistanceInfo {
        distance_km,
        within_grid_cell,
        uses_reference_point,
        observation_point: observation.location,
        station_id: observation.station_id.clone(),
        station_index,
    }
}
