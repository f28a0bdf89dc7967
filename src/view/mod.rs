//! Pure projections used for presenting entries. Nothing here keeps state, every function returns
//! the same output for the same input.

use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::store::entities::TimesheetEntry;

/// Shown instead of a duration when the end precedes the start.
pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthFilter {
    #[default]
    All,
    /// 1 to 12.
    Month(u32),
}

impl MonthFilter {
    fn matches(self, month: u32) -> bool {
        match self {
            MonthFilter::All => true,
            MonthFilter::Month(selected) => selected == month,
        }
    }
}

impl FromStr for MonthFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(MonthFilter::All);
        }
        match s.parse::<u32>()? {
            month @ 1..=12 => Ok(MonthFilter::Month(month)),
            month => Err(anyhow!("Month {month} is not between 1 and 12")),
        }
    }
}

impl Display for MonthFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonthFilter::All => write!(f, "all"),
            MonthFilter::Month(month) => write!(f, "{month}"),
        }
    }
}

/// Distinct years of `entries`, newest first. Falls back to `current_year` so that a year
/// selector always has something to show.
pub fn available_years(entries: &[TimesheetEntry], current_year: i32) -> Vec<i32> {
    let years = entries
        .iter()
        .map(|entry| entry.date.year())
        .collect::<BTreeSet<_>>();
    if years.is_empty() {
        return vec![current_year];
    }
    years.into_iter().rev().collect()
}

pub fn filter_by_period(
    entries: &[TimesheetEntry],
    year: i32,
    month: MonthFilter,
) -> Vec<TimesheetEntry> {
    entries
        .iter()
        .filter(|entry| entry.date.year() == year && month.matches(entry.date.month()))
        .cloned()
        .collect()
}

/// Entries between `start` and `end`, both inclusive.
pub fn filter_by_range(
    entries: &[TimesheetEntry],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<TimesheetEntry> {
    entries
        .iter()
        .filter(|entry| (start..=end).contains(&entry.date))
        .cloned()
        .collect()
}

pub fn earliest_date(entries: &[TimesheetEntry]) -> Option<NaiveDate> {
    entries.iter().map(|entry| entry.date).min()
}

/// Formats elapsed time as `"<H> jam <M> menit"`, leaving out zero parts.
pub fn duration_label(start: NaiveTime, end: NaiveTime) -> String {
    let elapsed = end.signed_duration_since(start);
    if elapsed < Duration::zero() {
        return NOT_APPLICABLE.to_string();
    }

    let hours = elapsed.num_hours();
    let minutes = elapsed.num_minutes() % 60;

    let mut parts = Vec::with_capacity(2);
    if hours > 0 {
        parts.push(format!("{hours} jam"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} menit"));
    }

    if parts.is_empty() {
        "0 menit".to_string()
    } else {
        parts.join(" ")
    }
}

/// Splits a task into achievements. Blank lines are dropped.
pub fn task_lines(task: &str) -> Vec<&str> {
    task.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::store::entities::{parse_clock_time, test_entry};

    use super::*;

    fn entries() -> Vec<TimesheetEntry> {
        vec![
            test_entry("a", (2025, 2, 10), "08:00", "09:00"),
            test_entry("b", (2025, 1, 31), "08:00", "09:00"),
            test_entry("c", (2024, 12, 31), "13:00", "14:00"),
            test_entry("d", (2024, 12, 31), "08:00", "09:00"),
            test_entry("e", (2023, 1, 1), "08:00", "09:00"),
        ]
    }

    fn ids(entries: &[TimesheetEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    fn duration(start: &str, end: &str) -> String {
        duration_label(
            parse_clock_time(start).unwrap(),
            parse_clock_time(end).unwrap(),
        )
    }

    #[test]
    fn test_available_years() {
        assert_eq!(available_years(&entries(), 1999), vec![2025, 2024, 2023]);

        let mut unordered = entries();
        unordered.reverse();
        unordered.extend(entries());
        let years = available_years(&unordered, 1999);
        assert_eq!(years, vec![2025, 2024, 2023]);
        assert!(years.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn test_available_years_falls_back_to_current() {
        assert_eq!(available_years(&[], 2026), vec![2026]);
    }

    #[test]
    fn test_filter_by_year() {
        assert_eq!(ids(&filter_by_period(&entries(), 2024, MonthFilter::All)), ["c", "d"]);
        assert_eq!(ids(&filter_by_period(&entries(), 2025, MonthFilter::All)), ["a", "b"]);
        assert!(filter_by_period(&entries(), 2030, MonthFilter::All).is_empty());
    }

    #[test]
    fn test_filter_by_month() {
        assert_eq!(
            ids(&filter_by_period(&entries(), 2025, MonthFilter::Month(1))),
            ["b"]
        );
        // Same month of another year doesn't match.
        assert!(filter_by_period(&entries(), 2025, MonthFilter::Month(12)).is_empty());
    }

    #[test]
    fn test_filter_by_range_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(ids(&filter_by_range(&entries(), start, end)), ["b", "c", "d"]);
        assert!(filter_by_range(&entries(), end, start).is_empty());
    }

    #[test]
    fn test_earliest_date() {
        assert_eq!(
            earliest_date(&entries()),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        assert_eq!(earliest_date(&[]), None);
    }

    #[test]
    fn test_duration_label() {
        assert_eq!(duration("08:30", "17:00"), "8 jam 30 menit");
        assert_eq!(duration("09:00", "09:00"), "0 menit");
        assert_eq!(duration("10:00", "09:00"), NOT_APPLICABLE);
        assert_eq!(duration("09:00", "11:00"), "2 jam");
        assert_eq!(duration("09:15", "09:45"), "30 menit");
        // Seconds never round up.
        assert_eq!(duration("09:00:00", "09:59:59"), "59 menit");
    }

    #[test]
    fn test_month_filter_parsing() {
        assert_eq!("all".parse::<MonthFilter>().unwrap(), MonthFilter::All);
        assert_eq!("ALL".parse::<MonthFilter>().unwrap(), MonthFilter::All);
        assert_eq!("7".parse::<MonthFilter>().unwrap(), MonthFilter::Month(7));
        assert!("0".parse::<MonthFilter>().is_err());
        assert!("13".parse::<MonthFilter>().is_err());
        assert!("july".parse::<MonthFilter>().is_err());
    }

    #[test]
    fn test_task_lines() {
        assert_eq!(
            task_lines("  wrote tests \n\n fixed bug\n"),
            ["wrote tests", "fixed bug"]
        );
        assert_eq!(task_lines("single"), ["single"]);
        assert!(task_lines(" \n ").is_empty());
    }
}
