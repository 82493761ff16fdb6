//! Distance between two instants in words, e.g. "3 minutes ago" or "about 2 hours ago".

use chrono::{DateTime, Datelike, Timelike, Utc};

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2520;
const MINUTES_IN_MONTH: i64 = 43200;
const MINUTES_IN_TWO_MONTHS: i64 = 86400;

/// How long ago `created_at` was, seen from `now`. Instants after `now` read "in ...".
pub fn format_distance(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let (earlier, later) = if created_at <= now {
        (created_at, now)
    } else {
        (now, created_at)
    };

    let distance = distance_in_words(earlier, later);
    if created_at > now {
        format!("in {}", distance)
    } else {
        format!("{} ago", distance)
    }
}

fn distance_in_words(earlier: DateTime<Utc>, later: DateTime<Utc>) -> String {
    let seconds = (later - earlier).num_seconds();
    let minutes = div_round(seconds, 60);

    if minutes < 2 {
        return match minutes {
            0 => "less than a minute".into(),
            _ => "1 minute".into(),
        };
    }

    if minutes < 45 {
        return format!("{} minutes", minutes);
    }

    if minutes < 90 {
        return "about 1 hour".into();
    }

    if minutes < MINUTES_IN_DAY {
        return plural("about", div_round(minutes, 60), "hour");
    }

    if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        return "1 day".into();
    }

    if minutes < MINUTES_IN_MONTH {
        return format!("{} days", div_round(minutes, MINUTES_IN_DAY));
    }

    if minutes < MINUTES_IN_TWO_MONTHS {
        return plural("about", div_round(minutes, MINUTES_IN_MONTH), "month");
    }

    let months = whole_months(earlier, later);
    if months < 12 {
        let nearest = div_round(minutes, MINUTES_IN_MONTH);
        return plural("", nearest, "month");
    }

    let years = months / 12;
    match months % 12 {
        0..=2 => plural("about", years, "year"),
        3..=8 => plural("over", years, "year"),
        _ => plural("almost", years + 1, "year"),
    }
}

fn plural(qualifier: &str, count: i64, unit: &str) -> String {
    let counted = if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    };

    if qualifier.is_empty() {
        counted
    } else {
        format!("{} {}", qualifier, counted)
    }
}

/// Rounds half away from zero; inputs here are never negative
fn div_round(value: i64, divisor: i64) -> i64 {
    (value + divisor / 2) / divisor
}

/// Full calendar months from `earlier` to `later`
fn whole_months(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    let months = (later.year() - earlier.year()) as i64 * 12 + later.month() as i64
        - earlier.month() as i64;

    let later_in_month = (later.day(), later.num_seconds_from_midnight());
    let earlier_in_month = (earlier.day(), earlier.num_seconds_from_midnight());
    if months > 0 && later_in_month < earlier_in_month {
        months - 1
    } else {
        months
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn ago(duration: Duration) -> String {
        format_distance(now() - duration, now())
    }

    #[test]
    fn test_minutes_and_hours() {
        assert_eq!(ago(Duration::seconds(0)), "less than a minute ago");
        assert_eq!(ago(Duration::seconds(29)), "less than a minute ago");
        assert_eq!(ago(Duration::seconds(45)), "1 minute ago");
        assert_eq!(ago(Duration::minutes(3)), "3 minutes ago");
        assert_eq!(ago(Duration::minutes(44)), "44 minutes ago");
        assert_eq!(ago(Duration::minutes(60)), "about 1 hour ago");
        assert_eq!(ago(Duration::hours(5)), "about 5 hours ago");
    }

    #[test]
    fn test_days_and_months() {
        assert_eq!(ago(Duration::hours(30)), "1 day ago");
        assert_eq!(ago(Duration::days(3)), "3 days ago");
        assert_eq!(ago(Duration::days(31)), "about 1 month ago");
        assert_eq!(ago(Duration::days(45)), "about 2 months ago");
        assert_eq!(ago(Duration::days(150)), "5 months ago");
    }

    #[test]
    fn test_years() {
        let at = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();

        assert_eq!(format_distance(at(2023, 6, 1), now()), "about 1 year ago");
        assert_eq!(format_distance(at(2022, 12, 1), now()), "over 1 year ago");
        assert_eq!(format_distance(at(2022, 8, 1), now()), "almost 2 years ago");
    }

    #[test]
    fn test_future_instants_read_forward() {
        assert_eq!(
            format_distance(now() + Duration::minutes(10), now()),
            "in 10 minutes"
        );
    }
}
