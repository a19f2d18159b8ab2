//! Argument validation shared by the tools.

use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::constants::{ASTRONOMY_MAX_DAYS_AHEAD, BEIJING_UTC_OFFSET_HOURS};
use crate::error::{Error, Result};

pub const UNITS: &[&str] = &["m", "i"];
pub const POI_TYPES: &[&str] = &["scenic", "TSTA"];
pub const CITY_TYPES: &[&str] = &["cn", "world", "overseas"];

/// Trimmed `value`, or an error naming `name` when it is blank.
pub fn required<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid_argument(format!("{} must not be empty", name)));
    }
    Ok(value)
}

pub fn one_of(name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "invalid {} '{}', expected one of: {}",
            name,
            value,
            allowed.join(", ")
        )))
    }
}

pub fn in_range(name: &str, value: u32, range: RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "{} must be between {} and {}, got {}",
            name,
            range.start(),
            range.end(),
            value
        )))
    }
}

/// `location` if non-blank, else `city`; at least one is required.
pub fn location_or_city<'a>(
    location: Option<&'a str>,
    city: Option<&'a str>,
) -> Result<&'a str> {
    location
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| city.map(str::trim).filter(|s| !s.is_empty()))
        .ok_or_else(|| Error::invalid_argument("either location or city must be provided"))
}

/// Calendar date in the provider's reference timezone.
pub fn beijing_today(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::hours(i64::from(BEIJING_UTC_OFFSET_HOURS))).date_naive()
}

/// The `days` dates before `today`, oldest first, as yyyyMMdd.
pub fn history_dates(today: NaiveDate, days: u32) -> Vec<String> {
    (1..=i64::from(days))
        .rev()
        .map(|offset| (today - Duration::days(offset)).format("%Y%m%d").to_string())
        .collect()
}

/// Check a yyyyMMdd date falls between today and the astronomy horizon.
pub fn astronomy_date(date: &str, today: NaiveDate) -> Result<String> {
    let date = date.trim();
    let parsed = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| {
        Error::invalid_argument(format!("date '{}' must be formatted yyyyMMdd, e.g. 20240220", date))
    })?;

    let last = today + Duration::days(ASTRONOMY_MAX_DAYS_AHEAD);
    if parsed < today || parsed > last {
        return Err(Error::invalid_argument(format!(
            "date must be between {} and {}",
            today.format("%Y%m%d"),
            last.format("%Y%m%d")
        )));
    }
    Ok(parsed.format("%Y%m%d").to_string())
}

/// Station ids normally look like `P58911`.
pub fn looks_like_station_id(id: &str) -> bool {
    id.strip_prefix('P')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn one_of_lists_allowed_values() {
        assert!(one_of("days", "7d", &["3d", "7d"]).is_ok());
        let err = one_of("days", "5d", &["3d", "7d"]).unwrap_err();
        assert!(err.to_string().contains("3d, 7d"));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(in_range("days", 1, 1..=10).is_ok());
        assert!(in_range("days", 10, 1..=10).is_ok());
        assert!(in_range("days", 0, 1..=10).is_err());
        assert!(in_range("days", 11, 1..=10).is_err());
    }

    #[test]
    fn location_takes_precedence_over_city() {
        assert_eq!(location_or_city(Some("101010100"), Some("上海")).unwrap(), "101010100");
        assert_eq!(location_or_city(Some("  "), Some(" 上海 ")).unwrap(), "上海");
        assert!(location_or_city(None, Some("")).is_err());
    }

    #[test]
    fn beijing_date_rolls_over_at_16_utc() {
        let before = Utc.with_ymd_and_hms(2024, 3, 1, 15, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 16, 0, 0).unwrap();
        assert_eq!(beijing_today(before), date(2024, 3, 1));
        assert_eq!(beijing_today(after), date(2024, 3, 2));
    }

    #[test]
    fn history_runs_oldest_to_yesterday() {
        let dates = history_dates(date(2024, 3, 2), 3);
        assert_eq!(dates, vec!["20240228", "20240229", "20240301"]);
    }

    #[test]
    fn astronomy_window() {
        let today = date(2024, 3, 1);
        assert_eq!(astronomy_date("20240301", today).unwrap(), "20240301");
        assert!(astronomy_date("20240430", today).is_ok());
        assert!(astronomy_date("20240501", today).is_err());
        assert!(astronomy_date("20240229", today).is_err());
        assert!(astronomy_date("2024-03-01", today).is_err());
    }

    #[test]
    fn station_id_shape() {
        assert!(looks_like_station_id("P58911"));
        assert!(!looks_like_station_id("P"));
        assert!(!looks_like_station_id("101010100"));
    }
}
