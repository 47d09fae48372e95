use chrono::{NaiveDateTime, Timelike};

/// Textual timestamp format used at the session-store and wire boundaries.
/// Preserves microsecond precision.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub(crate) fn format_timestamp(time: NaiveDateTime) -> String {
    time.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_FORMAT).ok()
}

/// Drops sub-microsecond precision so an instant survives a round-trip
/// through [`DATE_FORMAT`] unchanged.
pub(crate) fn truncate_to_micros(time: NaiveDateTime) -> NaiveDateTime {
    let nanos = (time.nanosecond() / 1_000) * 1_000;
    time.with_nanosecond(nanos).unwrap_or(time)
}

/// Elapsed seconds between two instants, decomposed through
/// day/hour/minute/second factors rather than one big float subtraction,
/// keeping sub-second precision across large intervals.
pub(crate) fn date_diff(now: NaiveDateTime, then: NaiveDateTime) -> f64 {
    let diff = now.signed_duration_since(then).abs();

    let days = diff.num_days();
    let hours = diff.num_hours() - days * 24;
    let minutes = diff.num_minutes() - diff.num_hours() * 60;
    let seconds = diff.num_seconds() - diff.num_minutes() * 60;
    let micros = diff
        .num_microseconds()
        .map(|m| m - diff.num_seconds() * 1_000_000)
        .unwrap_or(0);

    let factors = [24.0, 60.0, 60.0, 1.0];
    let bits = [
        days as f64,
        hours as f64,
        minutes as f64,
        seconds as f64 + micros as f64 / 1_000_000.0,
    ];

    let mut duration = 0.0;
    for (factor, bit) in factors.iter().zip(bits) {
        duration = factor * (duration + bit);
    }
    duration
}
