use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::{
    store::entities::TimesheetEntry,
    view::{earliest_date, filter_by_range},
};

use super::{Summarizer, SummaryError};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("no entries between {start} and {end}")]
    NoEntriesInRange { start: NaiveDate, end: NaiveDate },
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

/// Range preselected for a report: from the first recorded day up to today.
pub fn default_report_range(entries: &[TimesheetEntry], today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (earliest_date(entries).unwrap_or(today), today)
}

/// Summarizes the entries recorded between `start` and `end` (inclusive). The summarizer is only
/// called when there is something to summarize.
pub async fn generate_report(
    summarizer: &impl Summarizer,
    entries: &[TimesheetEntry],
    start: NaiveDate,
    end: NaiveDate,
    instructions: &str,
) -> Result<String, ReportError> {
    if start > end {
        return Err(ReportError::InvalidRange { start, end });
    }

    let selected = filter_by_range(entries, start, end);
    if selected.is_empty() {
        return Err(ReportError::NoEntriesInRange { start, end });
    }

    info!("Summarizing {} entries from {start} to {end}", selected.len());
    Ok(summarizer.summarize(&selected, instructions).await?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        store::entities::{test_entry, TimesheetEntry},
        summary::{MockSummarizer, SummaryError},
    };

    use super::{default_report_range, generate_report, ReportError};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn entries() -> Vec<TimesheetEntry> {
        vec![
            test_entry("late", (2024, 6, 10), "08:00", "09:00"),
            test_entry("mid", (2024, 6, 5), "08:00", "09:00"),
            test_entry("early", (2024, 5, 20), "08:00", "09:00"),
        ]
    }

    #[tokio::test]
    async fn test_report_uses_entries_in_range() {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .withf(|entries, instructions| {
                entries.iter().map(|v| v.id.as_str()).eq(["late", "mid"])
                    && instructions.to_string() == "short"
            })
            .times(1)
            .returning(|_, _| Ok("- shipped".into()));

        let report = generate_report(
            &summarizer,
            &entries(),
            date(2024, 6, 1),
            date(2024, 6, 10),
            "short",
        )
        .await
        .unwrap();

        assert_eq!(report, "- shipped");
    }

    #[tokio::test]
    async fn test_report_rejects_inverted_range() {
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().never();

        let result = generate_report(
            &summarizer,
            &entries(),
            date(2024, 6, 10),
            date(2024, 6, 1),
            "",
        )
        .await;

        assert!(matches!(result, Err(ReportError::InvalidRange { .. })));
    }

    #[tokio::test]
    async fn test_report_requires_entries() {
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().never();

        let result = generate_report(
            &summarizer,
            &entries(),
            date(2024, 7, 1),
            date(2024, 7, 31),
            "",
        )
        .await;

        assert!(matches!(result, Err(ReportError::NoEntriesInRange { .. })));
    }

    #[tokio::test]
    async fn test_report_propagates_summary_failure() {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .returning(|_, _| Err(SummaryError::Communication("offline".into())));

        let result = generate_report(
            &summarizer,
            &entries(),
            date(2024, 1, 1),
            date(2024, 12, 31),
            "",
        )
        .await;

        assert!(matches!(
            result,
            Err(ReportError::Summary(SummaryError::Communication(_)))
        ));
    }

    #[test]
    fn test_default_range() {
        assert_eq!(
            default_report_range(&entries(), date(2024, 8, 1)),
            (date(2024, 5, 20), date(2024, 8, 1))
        );
        assert_eq!(
            default_report_range(&[], date(2024, 8, 1)),
            (date(2024, 8, 1), date(2024, 8, 1))
        );
    }
}
