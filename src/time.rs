//! Human-facing time strings.
//!
//! Every function takes "now" explicitly so output is reproducible in tests.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::fmt::Display;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Coarse magnitude of a duration: "5 minutes", "2 days", "1 year".
fn magnitude(seconds: i64) -> String {
    match seconds {
        s if s < MINUTE => plural(s, "second"),
        s if s < HOUR => plural(s / MINUTE, "minute"),
        s if s < DAY => plural(s / HOUR, "hour"),
        s if s < WEEK => plural(s / DAY, "day"),
        s if s < MONTH => plural(s / WEEK, "week"),
        s if s < YEAR => plural(s / MONTH, "month"),
        s => plural(s / YEAR, "year"),
    }
}

/// Relative age of `then` as seen from `now`: "5 minutes ago", "in 2 days".
///
/// Anything within ten seconds either way is "just now".
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds.abs() < 10 {
        return "just now".to_string();
    }
    if seconds > 0 {
        format!("{} ago", magnitude(seconds))
    } else {
        format!("in {}", magnitude(-seconds))
    }
}

/// Calendar-aware timestamp in `tz`, with less detail the closer it is to `now`.
///
/// Same day: "3:45 PM UTC". Same year: "July 19 at 3:45 PM UTC".
/// Otherwise: "July 19, 2024 at 3:45 PM UTC".
pub fn format_readable<Tz>(then: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = then.with_timezone(tz);
    let today = now.with_timezone(tz);
    if local.date_naive() == today.date_naive() {
        local.format("%-I:%M %p %Z").to_string()
    } else if local.year() == today.year() {
        local.format("%B %-d at %-I:%M %p %Z").to_string()
    } else {
        local.format("%B %-d, %Y at %-I:%M %p %Z").to_string()
    }
}

/// Compact timestamp for listings: "7/20/2025 5:06 AM UTC".
pub fn format_scannable<Tz>(then: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    then.with_timezone(tz)
        .format("%-m/%-d/%Y %-I:%M %p %Z")
        .to_string()
}

/// Length of the interval between two instants: "3 days", "less than a minute".
///
/// Order of the arguments does not matter.
pub fn format_span(oldest: DateTime<Utc>, newest: DateTime<Utc>) -> String {
    let seconds = (newest - oldest).num_seconds().abs();
    if seconds < MINUTE {
        return "less than a minute".to_string();
    }
    if seconds < HOUR {
        return plural(seconds / MINUTE, "minute");
    }
    if seconds < DAY {
        return plural(seconds / HOUR, "hour");
    }
    plural(seconds / DAY, "day")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn seconds_before(t: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
        t - Duration::seconds(seconds)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 20, 15, 45, 0).unwrap()
    }

    #[test]
    fn age_in_the_past() {
        assert_eq!(format_age(seconds_before(now(), 3), now()), "just now");
        assert_eq!(format_age(seconds_before(now(), 30), now()), "30 seconds ago");
        assert_eq!(format_age(seconds_before(now(), 5 * MINUTE), now()), "5 minutes ago");
        assert_eq!(format_age(seconds_before(now(), HOUR), now()), "1 hour ago");
        assert_eq!(format_age(seconds_before(now(), 3 * DAY), now()), "3 days ago");
        assert_eq!(format_age(seconds_before(now(), 2 * WEEK), now()), "2 weeks ago");
        assert_eq!(format_age(seconds_before(now(), 90 * DAY), now()), "3 months ago");
        assert_eq!(format_age(seconds_before(now(), 800 * DAY), now()), "2 years ago");
    }

    #[test]
    fn age_in_the_future() {
        assert_eq!(format_age(seconds_before(now(), -2 * DAY), now()), "in 2 days");
    }

    #[test]
    fn readable_drops_detail_near_now() {
        let today = Utc.with_ymd_and_hms(2025, 7, 20, 9, 5, 0).unwrap();
        assert_eq!(format_readable(today, now(), &Utc), "9:05 AM UTC");

        let this_year = Utc.with_ymd_and_hms(2025, 7, 19, 15, 45, 0).unwrap();
        assert_eq!(format_readable(this_year, now(), &Utc), "July 19 at 3:45 PM UTC");

        let last_year = Utc.with_ymd_and_hms(2024, 7, 19, 15, 45, 0).unwrap();
        assert_eq!(
            format_readable(last_year, now(), &Utc),
            "July 19, 2024 at 3:45 PM UTC"
        );
    }

    #[test]
    fn readable_respects_the_day_boundary_of_the_zone() {
        // 23:30 UTC on the 19th is already the 20th at +02:00.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 7, 19, 23, 30, 0).unwrap();
        assert_eq!(format_readable(late, now(), &tz), "1:30 AM +02:00");
    }

    #[test]
    fn scannable_format() {
        let t = Utc.with_ymd_and_hms(2025, 7, 20, 5, 6, 0).unwrap();
        assert_eq!(format_scannable(t, &Utc), "7/20/2025 5:06 AM UTC");
    }

    #[test]
    fn span_units() {
        let t = now();
        assert_eq!(format_span(t, t), "less than a minute");
        assert_eq!(format_span(seconds_before(t, 2 * MINUTE), t), "2 minutes");
        assert_eq!(format_span(seconds_before(t, 5 * HOUR), t), "5 hours");
        assert_eq!(format_span(seconds_before(t, 3 * DAY), t), "3 days");
        assert_eq!(format_span(t, seconds_before(t, DAY)), "1 day");
    }
}
