//! Fixed unit conversions and compass bucketing for display values

/// Kilometers per mile
const KM_PER_MILE: f64 = 1.609344;

/// Millimeters per inch
const MM_PER_INCH: f64 = 25.4;

/// The 8 compass points, full ordinal plus abbreviation
const DIRECTIONS: [(&str, &str); 8] = [
    ("north", "N"),
    ("northeast", "NE"),
    ("east", "E"),
    ("southeast", "SE"),
    ("south", "S"),
    ("southwest", "SW"),
    ("west", "W"),
    ("northwest", "NW"),
];

/// A compass direction as display strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompassPoint {
    pub ordinal: &'static str,
    pub abbreviation: &'static str,
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Kilometers per hour to miles per hour, rounded to a whole number
pub fn kmh_to_mph(kmh: f64) -> i64 {
    (kmh / KM_PER_MILE).round() as i64
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// Buckets a wind angle into one of 8 compass points
///
/// 45° sectors with a 22.5° offset, so north spans [337.5°, 22.5°). The
/// bucket index is `floor(((angle mod 360) + 22.5) / 45)`; index 8 aliases
/// back to north.
pub fn compass_point(angle_degrees: f64) -> CompassPoint {
    let normalized = angle_degrees.rem_euclid(360.0);
    let index = ((normalized + 22.5) / 45.0).floor() as usize % DIRECTIONS.len();
    let (ordinal, abbreviation) = DIRECTIONS[index];
    CompassPoint {
        ordinal,
        abbreviation,
    }
}
