use std::fmt::Display;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum DateStyle {
    #[default]
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Parses a calendar day. Accepts ISO dates ("2025-03-15") as well as anything chrono-english
/// understands relative to `now`, for example "yesterday" or "15/03/2025".
pub fn parse_day(input: &str, now: DateTime<Local>, style: DateStyle) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(input, now, style.into())
        .map(|v| v.date_naive())
        .map_err(|e| anyhow!("Can't parse {input:?} into a date: {e}"))
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone};

    use super::{parse_day, DateStyle};

    #[test]
    fn test_parse_day() {
        let now = Local.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

        assert_eq!(parse_day("2025-01-02", now, DateStyle::Uk).unwrap(), date(2025, 1, 2));
        assert_eq!(parse_day("yesterday", now, DateStyle::Uk).unwrap(), date(2025, 3, 14));
        assert_eq!(parse_day("04/03/2025", now, DateStyle::Uk).unwrap(), date(2025, 3, 4));
        assert_eq!(parse_day("04/03/2025", now, DateStyle::Us).unwrap(), date(2025, 4, 3));
        assert!(parse_day("not a date", now, DateStyle::Uk).is_err());
    }
}
