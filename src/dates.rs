//! Date and time format guessing.
//!
//! Maps individual strings to strftime-style tokens through an ordered rule
//! list, aggregates tokens across a column, and converts values to ISO 8601
//! once a token is known.
//!
//! Ambiguous day/month strings such as `03/04/2021` resolve month-first. That
//! is a guess with no confidence signal attached; only a part greater than 12
//! settles the order.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexSet;
use regex::Regex;

pub const MIXED_FORMAT: &str = "mixed";
pub const YEAR_FORMAT: &str = "%Y";

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\s*([AaPp][Mm]))?$").expect("time regex")
});

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})(?:([T ])(\d{2}):(\d{2})(?::(\d{2})(\.\d+)?)?(Z|z|[+-]\d{2}:?\d{2})?)?$",
    )
    .expect("iso date regex")
});

static YMD_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").expect("ymd regex"));

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})([/-])(\d{1,2})([/-])(\d{4})$").expect("day month year regex")
});

static OFFSET_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Z|z|([+-]\d{2}):?(\d{2}))$").expect("offset suffix regex")
});

type DateRule = fn(&str) -> Option<String>;

/// Evaluated in order; the first rule producing a token wins.
const DATE_RULES: &[(&str, DateRule)] = &[
    ("time", guess_time),
    ("iso", guess_iso),
    ("year-month-day", guess_ymd_slash),
    ("day-month-year", guess_day_month_year),
];

/// Returns the strftime token describing `value`, or `None` when it is not a
/// recognised date or time.
pub fn guess_date_format(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_RULES.iter().find_map(|(_, rule)| rule(trimmed))
}

/// Tallies tokens over every value of a column: the token when unanimous,
/// `"mixed"` when several appear, `None` when nothing parses as a date.
pub fn guess_column_date_format<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: IndexSet<String> = IndexSet::new();
    for value in values {
        if let Some(token) = guess_date_format(value) {
            seen.insert(token);
        }
    }
    match seen.len() {
        0 => None,
        1 => seen.pop(),
        _ => Some(MIXED_FORMAT.to_string()),
    }
}

fn in_range(raw: Option<regex::Match<'_>>, min: u32, max: u32) -> bool {
    raw.and_then(|m| m.as_str().parse::<u32>().ok())
        .is_some_and(|value| (min..=max).contains(&value))
}

fn guess_time(value: &str) -> Option<String> {
    let caps = TIME.captures(value)?;
    let meridiem = caps.get(4).is_some();
    let hour_max = if meridiem { 12 } else { 23 };
    let hour_min = if meridiem { 1 } else { 0 };
    if !in_range(caps.get(1), hour_min, hour_max) || !in_range(caps.get(2), 0, 59) {
        return None;
    }
    let seconds = caps.get(3).is_some();
    if seconds && !in_range(caps.get(3), 0, 59) {
        return None;
    }
    let mut token = String::from(if meridiem { "%I:%M" } else { "%H:%M" });
    if seconds {
        token.push_str(":%S");
    }
    if meridiem {
        token.push_str(" %p");
    }
    Some(token)
}

fn guess_iso(value: &str) -> Option<String> {
    let caps = ISO_DATE.captures(value)?;
    if !in_range(caps.get(2), 1, 12) || !in_range(caps.get(3), 1, 31) {
        return None;
    }
    let mut token = String::from("%Y-%m-%d");
    if let Some(separator) = caps.get(4) {
        if !in_range(caps.get(5), 0, 23) || !in_range(caps.get(6), 0, 59) {
            return None;
        }
        token.push_str(separator.as_str());
        token.push_str("%H:%M");
        if caps.get(7).is_some() {
            if !in_range(caps.get(7), 0, 60) {
                return None;
            }
            token.push_str(":%S");
        }
        if caps.get(8).is_some() {
            token.push_str(".%f");
        }
        if caps.get(9).is_some() {
            token.push_str("%z");
        }
    }
    Some(token)
}

fn guess_ymd_slash(value: &str) -> Option<String> {
    let caps = YMD_SLASH.captures(value)?;
    (in_range(caps.get(2), 1, 12) && in_range(caps.get(3), 1, 31)).then(|| "%Y/%m/%d".to_string())
}

fn guess_day_month_year(value: &str) -> Option<String> {
    let caps = DAY_MONTH_YEAR.captures(value)?;
    let separator = caps.get(2)?.as_str();
    if separator != caps.get(4)?.as_str() {
        return None;
    }
    let first: u32 = caps.get(1)?.as_str().parse().ok()?;
    let second: u32 = caps.get(3)?.as_str().parse().ok()?;
    if first == 0 || second == 0 || first > 31 || second > 31 {
        return None;
    }
    let day_first = if first > 12 {
        if second > 12 {
            return None;
        }
        true
    } else {
        false
    };
    let token = if day_first {
        format!("%d{separator}%m{separator}%Y")
    } else {
        format!("%m{separator}%d{separator}%Y")
    };
    Some(token)
}

/// Rewrites `value` as ISO 8601 using a token produced by
/// [`guess_date_format`]. Returns `None` when the value does not parse with
/// the token, or when the token carries nothing worth converting (`%Y`,
/// `mixed`).
pub fn parse_with_format(value: &str, token: &str) -> Option<String> {
    if token == YEAR_FORMAT || token == MIXED_FORMAT {
        return None;
    }
    let value = value.trim();
    let pattern = token.replace(".%f", "%.f");
    let has_date = token.contains("%Y");
    let has_time = token.contains("%H") || token.contains("%I");

    match (has_date, has_time) {
        (true, true) if token.ends_with("%z") => {
            let normalized = normalize_offset(value)?;
            DateTime::parse_from_str(&normalized, &pattern)
                .ok()
                .map(|dt| dt.to_rfc3339())
        }
        (true, true) => NaiveDateTime::parse_from_str(value, &pattern)
            .ok()
            .map(|dt| {
                if dt.nanosecond() == 0 {
                    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
                } else {
                    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
                }
            }),
        (true, false) => NaiveDate::parse_from_str(value, &pattern)
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string()),
        (false, true) => NaiveTime::parse_from_str(value, &pattern)
            .ok()
            .map(|t| t.format("%H:%M:%S").to_string()),
        (false, false) => None,
    }
}

/// Rewrites a trailing `Z` or `+hh:mm` offset into the `+hhmm` shape `%z`
/// parses.
fn normalize_offset(value: &str) -> Option<String> {
    let caps = OFFSET_SUFFIX.captures(value)?;
    let whole = caps.get(0)?;
    let head = &value[..whole.start()];
    let offset = match (caps.get(1), caps.get(2)) {
        (Some(hours), Some(minutes)) => format!("{}{}", hours.as_str(), minutes.as_str()),
        _ => "+0000".to_string(),
    };
    Some(format!("{head}{offset}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_times_use_24h_or_meridiem_tokens() {
        assert_eq!(guess_date_format("13:45").as_deref(), Some("%H:%M"));
        assert_eq!(guess_date_format("08:05:59").as_deref(), Some("%H:%M:%S"));
        assert_eq!(guess_date_format("9:30 PM").as_deref(), Some("%I:%M %p"));
        assert_eq!(guess_date_format("9:30:10am").as_deref(), Some("%I:%M:%S %p"));
        assert_eq!(guess_date_format("25:00"), None);
    }

    #[test]
    fn iso_dates_and_datetimes() {
        assert_eq!(guess_date_format("2020-01-31").as_deref(), Some("%Y-%m-%d"));
        assert_eq!(
            guess_date_format("2020-01-31T10:20").as_deref(),
            Some("%Y-%m-%dT%H:%M")
        );
        assert_eq!(
            guess_date_format("2020-01-31 10:20:30").as_deref(),
            Some("%Y-%m-%d %H:%M:%S")
        );
        assert_eq!(
            guess_date_format("2020-01-31T10:20:30.123Z").as_deref(),
            Some("%Y-%m-%dT%H:%M:%S.%f%z")
        );
        assert_eq!(
            guess_date_format("2020-01-31T10:20:30+02:00").as_deref(),
            Some("%Y-%m-%dT%H:%M:%S%z")
        );
        assert_eq!(guess_date_format("2020-13-01"), None);
    }

    #[test]
    fn slash_year_first() {
        assert_eq!(guess_date_format("2021/3/9").as_deref(), Some("%Y/%m/%d"));
    }

    #[test]
    fn day_month_disambiguation() {
        assert_eq!(guess_date_format("31/12/2020").as_deref(), Some("%d/%m/%Y"));
        assert_eq!(guess_date_format("12/31/2020").as_deref(), Some("%m/%d/%Y"));
        assert_eq!(guess_date_format("03-04-2021").as_deref(), Some("%m-%d-%Y"));
        assert_eq!(guess_date_format("13/13/2020"), None);
        assert_eq!(guess_date_format("03/04-2021"), None);
    }

    #[test]
    fn non_dates_are_rejected() {
        assert_eq!(guess_date_format("hello"), None);
        assert_eq!(guess_date_format("2011-12"), None);
        assert_eq!(guess_date_format("1999"), None);
        assert_eq!(guess_date_format(""), None);
    }

    #[test]
    fn column_aggregation() {
        assert_eq!(
            guess_column_date_format(["2020-01-01", "2020-02-01"]).as_deref(),
            Some("%Y-%m-%d")
        );
        assert_eq!(
            guess_column_date_format(["2020-01-01", "31/12/2020"]).as_deref(),
            Some(MIXED_FORMAT)
        );
        assert_eq!(guess_column_date_format(["x", "y"]), None);
    }

    #[test]
    fn conversion_to_iso() {
        assert_eq!(
            parse_with_format("31/12/2020", "%d/%m/%Y").as_deref(),
            Some("2020-12-31")
        );
        assert_eq!(
            parse_with_format("2020-01-31 10:20:30", "%Y-%m-%d %H:%M:%S").as_deref(),
            Some("2020-01-31T10:20:30")
        );
        assert_eq!(parse_with_format("1999", YEAR_FORMAT), None);
        assert_eq!(parse_with_format("not a date", "%Y-%m-%d"), None);
    }

    #[test]
    fn offsets_are_normalized_for_parsing() {
        assert_eq!(
            normalize_offset("2020-01-31T10:20:30Z").as_deref(),
            Some("2020-01-31T10:20:30+0000")
        );
        assert_eq!(
            normalize_offset("2020-01-31T10:20:30+02:00").as_deref(),
            Some("2020-01-31T10:20:30+0200")
        );
    }
}
