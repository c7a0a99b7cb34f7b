//! Parsing of work log durations and start dates.
//!
//! Durations are written the way people type them: `1h 12m`, `90m`, `1.5h`,
//! `2d 4h`, `1 hour and 30 minutes`. Days and weeks are working days and
//! weeks, sized by the `[worklog]` settings.

use std::sync::OnceLock;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, TimeZone};
use regex::Regex;

use crate::config::WorklogSettings;

/// Format the tracker expects for `started`.
pub const STARTED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

static TERM: OnceLock<Regex> = OnceLock::new();

fn term_regex() -> &'static Regex {
    TERM.get_or_init(|| {
        Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*([a-z]*)\s*(?:,|and\b)?\s*")
            .expect("Duration term regex should compile")
    })
}

fn unit_seconds(unit: &str, settings: &WorklogSettings) -> Option<f64> {
    let hour = 3600.0;
    let day = settings.hours_per_day * hour;
    let seconds = match unit.to_lowercase().as_str() {
        "w" | "wk" | "wks" | "week" | "weeks" => settings.days_per_week * day,
        "d" | "day" | "days" => day,
        "h" | "hr" | "hrs" | "hour" | "hours" => hour,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        _ => return None,
    };
    Some(seconds)
}

/// Parse a time spent into whole seconds.
///
/// Every number needs a unit; a bare `90` is rejected rather than guessed.
///
/// ```
/// use jm::config::WorklogSettings;
/// use jm::duration::parse_time_spent;
///
/// let settings = WorklogSettings::default();
/// assert_eq!(parse_time_spent("1h 12m", &settings).unwrap(), 4320);
/// assert_eq!(parse_time_spent("1d", &settings).unwrap(), 8 * 3600);
/// ```
pub fn parse_time_spent(text: &str, settings: &WorklogSettings) -> Result<u64> {
    let mut rest = text.trim();
    if rest.is_empty() {
        bail!("Invalid time spent: nothing given (try '1h 30m')");
    }

    let mut total = 0.0;
    while !rest.is_empty() {
        let captures = term_regex()
            .captures(rest)
            .ok_or_else(|| anyhow!("Invalid time spent '{}': cannot read '{}'", text, rest))?;
        let amount: f64 = captures[1]
            .parse()
            .map_err(|_| anyhow!("Invalid time spent '{}': bad number '{}'", text, &captures[1]))?;
        let unit = &captures[2];
        if unit.is_empty() {
            bail!(
                "Invalid time spent '{}': '{}' has no unit (use w, d, h, m or s)",
                text,
                &captures[1]
            );
        }
        let seconds = unit_seconds(unit, settings)
            .ok_or_else(|| anyhow!("Invalid time spent '{}': unknown unit '{}'", text, unit))?;
        total += amount * seconds;
        rest = &rest[captures[0].len()..];
    }

    let total = total.round();
    if total < 1.0 {
        bail!("Invalid time spent '{}': must be more than zero", text);
    }
    Ok(total as u64)
}

/// Parse a `--date` value relative to `now`.
///
/// Accepts `now`, `today`, `yesterday`, `YYYY-MM-DD`, `D-mon-YYYY` and RFC 3339.
/// Date-only values keep the time of day of `now`.
pub fn parse_started(text: &str, now: DateTime<Local>) -> Result<DateTime<FixedOffset>> {
    let text = text.trim();
    match text.to_lowercase().as_str() {
        "now" | "today" => return Ok(now.into()),
        "yesterday" => {
            return now
                .checked_sub_days(Days::new(1))
                .map(Into::into)
                .ok_or_else(|| anyhow!("Invalid --date '{}'", text))
        }
        _ => {}
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed);
    }

    let date = ["%Y-%m-%d", "%d-%b-%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| {
            anyhow!(
                "Invalid --date '{}': use today, yesterday, YYYY-MM-DD, 7-feb-2017 or RFC 3339",
                text
            )
        })?;

    let local = Local
        .from_local_datetime(&date.and_time(now.time()))
        .earliest()
        .ok_or_else(|| anyhow!("Invalid --date '{}': no such local time", text))?;
    Ok(local.into())
}

/// Render a start time the way the tracker wants it.
pub fn format_started(started: &DateTime<FixedOffset>) -> String {
    started.format(STARTED_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;

    fn settings() -> WorklogSettings {
        WorklogSettings::default()
    }

    #[test]
    fn test_common_forms() {
        let s = settings();
        assert_eq!(parse_time_spent("1h 12m", &s).unwrap(), 4320);
        assert_eq!(parse_time_spent("90m", &s).unwrap(), 5400);
        assert_eq!(parse_time_spent("1.5h", &s).unwrap(), 5400);
        assert_eq!(parse_time_spent("2d 4h", &s).unwrap(), 20 * 3600);
        assert_eq!(parse_time_spent("1w", &s).unwrap(), 40 * 3600);
        assert_eq!(parse_time_spent("45s", &s).unwrap(), 45);
    }

    #[test]
    fn test_word_forms_and_separators() {
        let s = settings();
        assert_eq!(
            parse_time_spent("1 hour and 30 minutes", &s).unwrap(),
            5400
        );
        assert_eq!(parse_time_spent("2 Hours, 5 mins", &s).unwrap(), 7500);
    }

    #[test]
    fn test_day_length_is_configurable() {
        let s = WorklogSettings {
            hours_per_day: 6.0,
            days_per_week: 4.0,
        };
        assert_eq!(parse_time_spent("1d", &s).unwrap(), 6 * 3600);
        assert_eq!(parse_time_spent("1w", &s).unwrap(), 24 * 3600);
    }

    #[test]
    fn test_rejects_bad_input() {
        let s = settings();
        assert!(parse_time_spent("", &s).is_err());
        assert!(parse_time_spent("90", &s).is_err());
        assert!(parse_time_spent("1 fortnight", &s).is_err());
        assert!(parse_time_spent("0h", &s).is_err());
        assert!(parse_time_spent("lots", &s).is_err());
    }

    fn now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 12, 14, 30, 5)
            .earliest()
            .unwrap()
    }

    #[test]
    fn test_relative_dates() {
        let today = parse_started("today", now()).unwrap();
        assert_eq!(today, DateTime::<FixedOffset>::from(now()));

        let yesterday = parse_started("Yesterday", now()).unwrap();
        assert_eq!(yesterday.day(), 11);
        assert_eq!(yesterday.hour(), 14);
    }

    #[test]
    fn test_date_only_keeps_time_of_day() {
        let started = parse_started("2017-02-07", now()).unwrap();
        assert_eq!((started.year(), started.month(), started.day()), (2017, 2, 7));
        assert_eq!((started.hour(), started.minute()), (14, 30));

        let started = parse_started("7-feb-2017", now()).unwrap();
        assert_eq!((started.year(), started.month(), started.day()), (2017, 2, 7));
    }

    #[test]
    fn test_rfc3339_is_taken_as_is() {
        let started = parse_started("2024-01-02T09:15:00+01:00", now()).unwrap();
        assert_eq!(format_started(&started), "2024-01-02T09:15:00.000+0100");
    }

    #[test]
    fn test_invalid_date() {
        let err = parse_started("next blue moon", now()).unwrap_err();
        assert!(err.to_string().contains("Invalid --date"));
    }

    proptest! {
        #[test]
        fn prop_hours_and_minutes_add_up(h in 0u64..200, m in 1u64..60) {
            let text = format!("{}h {}m", h, m);
            prop_assert_eq!(parse_time_spent(&text, &settings()).unwrap(), h * 3600 + m * 60);
        }
    }
}
