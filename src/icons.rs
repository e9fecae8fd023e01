//! Condition and icon vocabulary mapping
//!
//! The upstream API encodes conditions as icon URLs in two generations of
//! vocabulary: a 5-segment path for a single condition
//! (`.../icons/land/day/skc`) and a 6-segment path for two simultaneous
//! conditions (`.../icons/land/day/tsra,40/skc`), where a segment may carry
//! a trailing `,<percentage>` probability qualifier. Both are reconciled
//! here into a normalized [`ConditionKey`] and resolved against a single
//! externally loaded table shipped as a packaged JSON asset.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// The unified two-generation condition table, shipped with the crate
const CONDITION_MAP_JSON: &str = include_str!("../assets/condition-map.json");

/// Sentinel key for an empty or missing icon reference
pub const NO_DATA_KEY: &str = "no data";

const NO_DATA_ICON: &str = "nodata.svg";
const NO_DATA_TEXT: &str = "No data";

/// Normalized `<period>/<condition>` key derived from an icon reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionKey(String);

impl ConditionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the sentinel key for a missing icon reference
    pub fn is_no_data(&self) -> bool {
        self.0 == NO_DATA_KEY
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display pairing a condition key resolves to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConditionDisplay {
    /// Icon file name (e.g. `sunny.svg`)
    pub icon: String,
    /// Human-readable condition text
    pub text: String,
}

/// Errors from condition key resolution
#[derive(Debug, Clone, Error)]
pub enum MappingError {
    /// The key has no table entry; a configuration defect, not upstream data
    #[error("no condition mapping for key \"{0}\"")]
    MappingMiss(String),
}

/// Derives the normalized condition key from an upstream icon reference
///
/// An empty or missing reference yields the sentinel key. Otherwise the
/// URL-shaped path is split on `/`: a 6-segment (dual-condition) path keeps
/// the 2-element slice starting 3 from the end, dropping the trailing
/// secondary condition; a 5-segment path keeps the trailing 2 segments. Any
/// `,<percentage>` suffix is stripped from the retained segments, which are
/// then joined as `<period>/<condition>`.
pub fn derive_key(icon_ref: Option<&str>) -> ConditionKey {
    let raw = icon_ref.unwrap_or("").trim();
    if raw.is_empty() {
        return ConditionKey(NO_DATA_KEY.to_string());
    }

    let path = url_path(raw);
    let segments: Vec<&str> = path.split('/').collect();
    let retained: &[&str] = if segments.len() == 6 {
        // Dual-condition encoding: drop the trailing secondary condition
        &segments[segments.len() - 3..segments.len() - 1]
    } else if segments.len() >= 2 {
        &segments[segments.len() - 2..]
    } else {
        &segments[..]
    };

    let parts: Vec<&str> = retained.iter().map(|s| strip_probability(s)).collect();
    ConditionKey(parts.join("/"))
}

/// Resolves a key to its display pairing
///
/// A table miss is a defect and fails loudly; the sentinel key always
/// resolves to the fixed catch-all pairing.
pub fn resolve(key: &ConditionKey) -> Result<ConditionDisplay, MappingError> {
    if key.is_no_data() {
        return Ok(no_data_display());
    }
    condition_table()
        .get(key.as_str())
        .cloned()
        .ok_or_else(|| MappingError::MappingMiss(key.to_string()))
}

/// Production-degrade resolution: logs the defect and returns the catch-all
pub fn resolve_or_no_data(key: &ConditionKey) -> ConditionDisplay {
    match resolve(key) {
        Ok(display) => display,
        Err(error) => {
            tracing::error!("condition mapping defect, degrading to no data: {error}");
            no_data_display()
        }
    }
}

/// Icon file name without its extension (`sunny.svg` → `sunny`)
pub fn icon_basename(icon: &str) -> &str {
    icon.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(icon)
}

fn no_data_display() -> ConditionDisplay {
    ConditionDisplay {
        icon: NO_DATA_ICON.to_string(),
        text: NO_DATA_TEXT.to_string(),
    }
}

/// Process-wide, read-only table; loaded once, safe for concurrent reads
fn condition_table() -> &'static HashMap<String, ConditionDisplay> {
    static TABLE: OnceLock<HashMap<String, ConditionDisplay>> = OnceLock::new();
    TABLE.get_or_init(|| match serde_json::from_str(CONDITION_MAP_JSON) {
        Ok(table) => table,
        Err(error) => {
            tracing::error!("condition map asset is invalid: {error}");
            HashMap::new()
        }
    })
}

fn strip_probability(segment: &str) -> &str {
    segment.split(',').next().unwrap_or(segment)
}

/// Path portion of a URL-shaped reference, query string removed
fn url_path(raw: &str) -> &str {
    let without_query = raw.split('?').next().unwrap_or(raw);
    match without_query.find("://") {
        Some(scheme_end) => {
            let after_scheme = &without_query[scheme_end + 3..];
            match after_scheme.find('/') {
                Some(path_start) => &after_scheme[path_start..],
                None => "",
            }
        }
        None => without_query,
    }
}
