//! Weekly recurrence of inspection schedules.
//!
//! A schedule stores the ISO weekdays it runs on (Monday = 1 .. Sunday = 7)
//! as a comma separated list, e.g. `"1,3,5"`, and a local start time
//! `HH:MM`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdaySet(Vec<u32>);

impl WeekdaySet {
    /// Builds a validated set: every day within 1..=7, at least one day.
    /// Duplicates are dropped and the days sorted.
    pub fn new(days: &[u32]) -> Result<WeekdaySet, String> {
        if days.is_empty() {
            return Err("At least one weekday is required".to_string());
        }
        if let Some(bad) = days.iter().find(|d| !(1..=7).contains(*d)) {
            return Err(format!("Invalid weekday {}: expected 1 (Monday) to 7 (Sunday)", bad));
        }
        let mut days = days.to_vec();
        days.sort_unstable();
        days.dedup();
        Ok(WeekdaySet(days))
    }

    pub fn days(&self) -> &[u32] {
        &self.0
    }

    /// Whether the schedule runs on `date`.
    pub fn matches(&self, date: NaiveDate) -> bool {
        self.0.contains(&date.weekday().number_from_monday())
    }
}

impl FromStr for WeekdaySet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| format!("Invalid weekday '{}'", part))
            })
            .collect::<Result<Vec<u32>, String>>()?;
        WeekdaySet::new(&days)
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

/// Validates and normalizes a `HH:MM` start time, e.g. `"7:05"` -> `"07:05"`.
pub fn normalize_start_time(value: &str) -> Result<String, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| format!("Invalid start time '{}': expected HH:MM", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_and_format() {
        let set: WeekdaySet = "5, 1,3,3".parse().expect("valid");
        assert_eq!(set.days(), &[1, 3, 5]);
        assert_eq!(set.to_string(), "1,3,5");
    }

    #[test]
    fn test_rejects_invalid_days() {
        assert!(WeekdaySet::new(&[]).is_err());
        assert!(WeekdaySet::new(&[0]).is_err());
        assert!(WeekdaySet::new(&[8]).is_err());
        assert!("".parse::<WeekdaySet>().is_err());
        assert!("mon".parse::<WeekdaySet>().is_err());
    }

    #[test]
    fn test_matches_iso_weekday() {
        // 2025-03-10 is a Monday, 2025-03-16 a Sunday
        let set = WeekdaySet::new(&[1, 7]).expect("valid");
        assert!(set.matches(date(2025, 3, 10)));
        assert!(!set.matches(date(2025, 3, 11)));
        assert!(set.matches(date(2025, 3, 16)));
    }

    #[test]
    fn test_normalize_start_time() {
        assert_eq!(normalize_start_time("7:05").expect("valid"), "07:05");
        assert_eq!(normalize_start_time("23:59").expect("valid"), "23:59");
        assert!(normalize_start_time("24:00").is_err());
        assert!(normalize_start_time("noon").is_err());
    }
}
