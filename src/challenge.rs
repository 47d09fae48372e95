use chrono::{NaiveDateTime, Timelike};

/// Derives the two-number arithmetic challenge for a page-view timestamp.
///
/// The first operand is the seconds-of-minute component (0–59). The second
/// is the fractional second parsed as `0.<six microsecond digits>` and
/// scaled by 100, truncated (0–99); microseconds `000010` give 0, `123456`
/// give 12. Pure: the same timestamp always yields the same pair, which is
/// what lets a submission be re-validated against the stored visit time.
pub fn challenge_for(time: NaiveDateTime) -> (u32, u32) {
    let second = time.second();

    let micro = (time.nanosecond() % 1_000_000_000) / 1_000;
    let fraction: f64 = format!("0.{micro:06}").parse().unwrap_or(0.0);
    let scaled = (fraction * 100.0) as u32;

    (second, scaled)
}
