//! Forecast period windowing, grouping, and formatting
//!
//! Pure functions over a time-ordered sequence of [`ForecastPeriod`] plus a
//! reference "now" in the target place's timezone. Upstream periods
//! alternate day/night across irregular boundaries ("This Afternoon",
//! "Tonight", ...); the groupings here are deterministic regardless of
//! where the sequence starts relative to the calendar day.

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveTime, TimeZone};

use crate::data::api::ApiPeriod;
use crate::data::{DailyPeriod, DayNightPair, ForecastPeriod};
use crate::icons;

/// Days covered by the detailed forecast group when the caller has no
/// preference
pub const DEFAULT_DETAILED_DAYS: usize = 5;

/// Start of the next calendar day after `now`, in `now`'s timezone
///
/// Falls back to `now + 24h` for the pathological DST gap where local
/// midnight does not exist.
pub fn start_of_next_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let next_date = now.date_naive() + Days::new(1);
    now.timezone()
        .from_local_datetime(&next_date.and_time(NaiveTime::MIN))
        .earliest()
        .unwrap_or_else(|| now.clone() + Duration::days(1))
}

/// Periods belonging to the remainder of today: start strictly before the
/// start of the next calendar day
pub fn filter_to_today<Tz: TimeZone>(
    periods: &[ForecastPeriod],
    now: &DateTime<Tz>,
) -> Vec<ForecastPeriod> {
    let boundary = start_of_next_day(now);
    periods
        .iter()
        .filter(|p| p.start_time < boundary)
        .cloned()
        .collect()
}

/// Periods for future days: start strictly after the start of the next
/// calendar day
///
/// With `limit_days` the result is truncated to `limit_days * 2` periods
/// (one daytime and one nighttime period per day), preserving order.
pub fn filter_to_future_days<Tz: TimeZone>(
    periods: &[ForecastPeriod],
    now: &DateTime<Tz>,
    limit_days: Option<usize>,
) -> Vec<ForecastPeriod> {
    let boundary = start_of_next_day(now);
    let mut future: Vec<ForecastPeriod> = periods
        .iter()
        .filter(|p| p.start_time > boundary)
        .cloned()
        .collect();
    if let Some(days) = limit_days {
        future.truncate(days * 2);
    }
    future
}

/// Periods past the detailed group: the future-days set minus its first
/// `detailed_days * 2` periods
pub fn filter_to_extended<Tz: TimeZone>(
    periods: &[ForecastPeriod],
    now: &DateTime<Tz>,
    detailed_days: usize,
) -> Vec<ForecastPeriod> {
    filter_to_future_days(periods, now, None)
        .into_iter()
        .skip(detailed_days * 2)
        .collect()
}

/// Chunks a sequence into consecutive (day, night) pairs
///
/// An odd trailing period forms a pair whose missing side is absent, never
/// an error.
pub fn group_into_pairs(periods: &[ForecastPeriod]) -> Vec<DayNightPair> {
    periods
        .chunks(2)
        .map(|chunk| DayNightPair {
            daytime: format_daily_period(chunk.first()),
            nighttime: format_daily_period(chunk.get(1)),
        })
        .collect()
}

/// Formats one period for daily display; an absent period formats to an
/// absent result
pub fn format_daily_period(period: Option<&ForecastPeriod>) -> Option<DailyPeriod> {
    let period = period?;
    let start = period.start_time;
    let display = icons::resolve_or_no_data(&icons::derive_key(period.icon.as_deref()));

    Some(DailyPeriod {
        day_name: start.format("%A").to_string(),
        short_day_name: start.format("%a").to_string(),
        month_day: start.format("%B %-d").to_string(),
        start_time: start,
        is_daytime: period.is_daytime,
        short_forecast: sentence_case(&period.short_forecast),
        icon_basename: icons::icon_basename(&display.icon).to_string(),
        icon: display.icon,
        temperature: period.temperature,
        probability_of_precipitation: period.probability_of_precipitation,
    })
}

/// Lowercases the text and capitalizes only its first letter
pub fn sentence_case(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => lowered,
    }
}

/// Parses an upstream `<ISO8601 start>/<ISO8601 duration>` validity window
/// into explicit bounds
pub fn parse_validity_window(
    valid_time: &str,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let (start_raw, duration_raw) = valid_time.split_once('/')?;
    let start = DateTime::parse_from_rfc3339(start_raw).ok()?;
    let duration = parse_iso8601_duration(duration_raw)?;
    let end = start.checked_add_signed(duration)?;
    Some((start, end))
}

/// Parses an ISO 8601 duration of whole weeks/days/hours/minutes/seconds
/// (the only shapes the upstream emits, e.g. `PT6H`, `P1DT12H`)
pub fn parse_iso8601_duration(raw: &str) -> Option<Duration> {
    let rest = raw.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let date_seconds = parse_duration_components(date_part, &[('W', 604_800), ('D', 86_400)])?;
    let time_seconds = parse_duration_components(time_part, &[('H', 3_600), ('M', 60), ('S', 1)])?;
    Some(Duration::seconds(date_seconds + time_seconds))
}

fn parse_duration_components(part: &str, units: &[(char, i64)]) -> Option<i64> {
    let mut total = 0i64;
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let scale = units.iter().find(|(unit, _)| *unit == c).map(|(_, s)| *s)?;
        let value: i64 = digits.parse().ok()?;
        total += value * scale;
        digits.clear();
    }
    // Trailing digits with no unit letter are malformed
    if digits.is_empty() {
        Some(total)
    } else {
        None
    }
}

/// Converts an upstream period into the model shape
pub(crate) fn period_from_api(api: &ApiPeriod) -> Option<ForecastPeriod> {
    let start_time = DateTime::parse_from_rfc3339(&api.start_time).ok()?;
    let end_time = DateTime::parse_from_rfc3339(&api.end_time).ok()?;
    Some(ForecastPeriod {
        number: api.number,
        name: api.name.clone(),
        start_time,
        end_time,
        is_daytime: api.is_daytime,
        temperature: api.temperature,
        probability_of_precipitation: api
            .probability_of_precipitation
            .as_ref()
            .and_then(|p| p.value),
        short_forecast: api.short_forecast.clone(),
        wind_speed: api.wind_speed.clone(),
        wind_direction: api.wind_direction.clone(),
        icon: api.icon.clone(),
    })
}
