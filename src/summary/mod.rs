//! Summaries of recorded work produced by a language model.
//!
//! [Summarizer] abstracts the model, [gemini::GeminiSummarizer] is the realization used by the
//! cli and [report] validates what gets sent to it.

pub mod gemini;
pub mod report;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::entities::{TimesheetEntry, CLOCK_TIME_FORMAT};

/// Instructions given to the model when the user doesn't provide their own.
pub const DEFAULT_INSTRUCTIONS: &str = "\
Anda adalah asisten AI yang bertugas merangkum poin-poin penting dari catatan kerja.
Analisis data timesheet berikut dan buat ringkasan singkat dalam bentuk poin-poin (bullet points).
Fokus hanya pada pencapaian utama dan hasil konkret. Hindari kalimat yang panjang dan bertele-tele.
Tujuannya adalah untuk memberikan inti sari dari pekerjaan yang telah dilakukan.
Format output dalam Markdown.";

const CONTENT_PREAMBLE: &str = "Berikut adalah data catatan kerja harian yang perlu diringkas:";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("communication error: {0}")]
    Communication(String),
    #[error("the model returned no text")]
    EmptyResponse,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        entries: &[TimesheetEntry],
        instructions: &str,
    ) -> Result<String, SummaryError>;
}

/// Renders entries into the text the model is asked to summarize.
pub fn format_entries_for_prompt(entries: &[TimesheetEntry]) -> String {
    let formatted = entries
        .iter()
        .map(|entry| {
            format!(
                "- Tanggal: {}, Waktu Kerja: {}-{}\n  Rangkuman: {}",
                entry.date,
                entry.start_time.format(CLOCK_TIME_FORMAT),
                entry.end_time.format(CLOCK_TIME_FORMAT),
                entry.task
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{CONTENT_PREAMBLE}\n{formatted}")
}

#[cfg(test)]
mod tests {
    use crate::store::entities::test_entry;

    use super::format_entries_for_prompt;

    #[test]
    fn test_prompt_format() {
        let mut first = test_entry("a", (2024, 6, 3), "08:30", "17:00");
        first.task = "deployed api\nwrote docs".into();
        let second = test_entry("b", (2024, 6, 2), "09:00", "10:15");

        let prompt = format_entries_for_prompt(&[first, second]);

        assert_eq!(
            prompt,
            "Berikut adalah data catatan kerja harian yang perlu diringkas:\n\
             - Tanggal: 2024-06-03, Waktu Kerja: 08:30-17:00\n  Rangkuman: deployed api\nwrote docs\n\n\
             - Tanggal: 2024-06-02, Waktu Kerja: 09:00-10:15\n  Rangkuman: task b"
        );
    }
}
