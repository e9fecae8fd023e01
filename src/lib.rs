//! wxgrid — display-ready weather data from api.weather.gov
//!
//! Normalizes raw observations and forecasts from the National Weather
//! Service API into a stable shape for a page-rendering consumer: current
//! conditions, hourly and daily forecasts, and precipitation timelines, all
//! keyed by forecast grid cell rather than raw coordinates. The crate
//! shields callers from upstream flakiness (bounded retries, request-scoped
//! caching of both payloads and terminal failures), from the two generations
//! of the upstream icon/condition vocabulary, and from stale or missing
//! observation stations (ordered fallback with distance diagnostics).

pub mod cache;
pub mod data;
pub mod fetch;
pub mod geometry;
pub mod icons;
pub mod periods;
pub mod place;
pub mod service;
pub mod stations;
pub mod units;

pub use fetch::{FetchClient, FetchError};
pub use icons::{derive_key, resolve, ConditionKey, MappingError};
pub use service::{ServiceError, WeatherDataService};
pub use stations::{StationError, StationSelector};
