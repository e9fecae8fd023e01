//! Place resolution and the external collaborator seams
//!
//! The authoritative nearest-place query lives outside this crate (a
//! geospatial SQL lookup); here we define the trait it plugs into, the
//! heuristic parser for a user-supplied free-text override, and the
//! translation and metrics seams. Defaults are inert: identity translation,
//! no place, discarded metrics.

use async_trait::async_trait;
use thiserror::Error;

use crate::data::{DistanceInfo, Place, Point};

/// Nearest named place, resolved by the external geospatial collaborator
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// Nearest place to a point, or `None` when nothing is known
    async fn nearest_place_to_point(&self, point: &Point) -> Option<Place>;

    /// Nearest place to a polygon ring, or `None` when nothing is known
    async fn nearest_place_to_polygon(&self, ring: &[Point]) -> Option<Place>;
}

/// Lookup that knows nothing; callers fall back to upstream-relative
/// location data
#[derive(Debug, Default)]
pub struct NoPlaceLookup;

#[async_trait]
impl PlaceLookup for NoPlaceLookup {
    async fn nearest_place_to_point(&self, _point: &Point) -> Option<Place> {
        None
    }

    async fn nearest_place_to_polygon(&self, _ring: &[Point]) -> Option<Place> {
        None
    }
}

/// Display-string translation seam
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str) -> String;
}

/// Pass-through translator
#[derive(Debug, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Failure from the metrics collaborator; logged by callers, never
/// propagated into the primary result
#[derive(Debug, Error)]
#[error("metrics emission failed: {0}")]
pub struct MetricsError(pub String);

/// Fire-and-forget telemetry seam
pub trait MetricsSink: Send + Sync {
    /// Records one station-selection distance sample with its tags
    fn record_station_distance(&self, info: &DistanceInfo) -> Result<(), MetricsError>;
}

/// Sink that discards every sample
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_station_distance(&self, _info: &DistanceInfo) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// Parses a user-supplied place override, heuristically shaped as
/// `"City, ST, USA"`
///
/// The trailing country segment is optional and ignored. Returns `None`
/// when the text does not look like a city/state pair.
pub fn parse_place_override(text: &str) -> Option<Place> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() < 2 || parts[0].is_empty() {
        return None;
    }

    let state = parts[1];
    if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some(Place {
        city: parts[0].to_string(),
        state: state.to_uppercase(),
        state_name: None,
        state_fips: None,
        county_fips: None,
        county: None,
        timezone: None,
    })
}
