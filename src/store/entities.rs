use std::{cmp::Ordering, fmt::Display, sync::Arc};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of an entry. Assigned by the repository when the entry is first saved.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Clone)]
#[serde(transparent)]
pub struct EntryId(Arc<str>);

impl EntryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The struct stored and displayed for every day of work. Multiple lines in `task` are treated as
/// separate achievements.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub task: String,
    #[serde(with = "clock_time_ser")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time_ser")]
    pub end_time: NaiveTime,
}

impl TimesheetEntry {
    pub fn from_draft(id: EntryId, draft: EntryDraft) -> Self {
        let EntryDraft {
            date,
            task,
            start_time,
            end_time,
        } = draft;
        Self {
            id,
            date,
            task,
            start_time,
            end_time,
        }
    }

    /// Replaces every field except the id.
    pub fn apply(&mut self, patch: EntryDraft) {
        self.date = patch.date;
        self.task = patch.task;
        self.start_time = patch.start_time;
        self.end_time = patch.end_time;
    }

    pub fn to_draft(&self) -> EntryDraft {
        EntryDraft {
            date: self.date,
            task: self.task.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Most recent work first: date descending, then start time descending.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        other
            .date
            .cmp(&self.date)
            .then_with(|| other.start_time.cmp(&self.start_time))
    }
}

pub fn sort_canonical(entries: &mut [TimesheetEntry]) {
    entries.sort_by(TimesheetEntry::canonical_cmp);
}

/// Entry without an id. Used both for creating entries and as a full replacement during updates.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    pub date: NaiveDate,
    pub task: String,
    #[serde(with = "clock_time_ser")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time_ser")]
    pub end_time: NaiveTime,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task description must not be empty")]
    EmptyTask,
    #[error("end time {end} must be after start time {start}")]
    EndNotAfterStart { start: NaiveTime, end: NaiveTime },
}

impl EntryDraft {
    /// Checks performed before a draft is handed to the store. The store itself never validates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task.trim().is_empty() {
            return Err(ValidationError::EmptyTask);
        }
        if self.end_time <= self.start_time {
            return Err(ValidationError::EndNotAfterStart {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }
}

pub const CLOCK_TIME_FORMAT: &str = "%H:%M";

/// Parses `HH:mm`, also accepting `HH:mm:ss` which some backends return for time columns.
pub fn parse_clock_time(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(value, CLOCK_TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
}

mod clock_time_ser {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::{parse_clock_time, CLOCK_TIME_FORMAT};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(CLOCK_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_clock_time(&s).map_err(serde::de::Error::custom)
    }
}

/// Shorthand for building entries in tests.
#[cfg(test)]
pub(crate) fn test_entry(id: &str, date: (i32, u32, u32), start: &str, end: &str) -> TimesheetEntry {
    TimesheetEntry {
        id: id.into(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        task: format!("task {id}"),
        start_time: parse_clock_time(start).unwrap(),
        end_time: parse_clock_time(end).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{test_entry as entry, *};

    #[test]
    fn test_serializes_wire_names() {
        let value = serde_json::to_value(entry("a", (2024, 5, 3), "08:30", "17:00")).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["date"], "2024-05-03");
        assert_eq!(value["startTime"], "08:30");
        assert_eq!(value["endTime"], "17:00");
    }

    #[test]
    fn test_deserializes_times_with_seconds() {
        let parsed: TimesheetEntry = serde_json::from_str(
            r#"{"id":"x","date":"2024-01-02","task":"t","startTime":"08:30:00","endTime":"09:15:59"}"#,
        )
        .unwrap();
        assert_eq!(parsed.start_time, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(parsed.end_time, NaiveTime::from_hms_opt(9, 15, 59).unwrap());
    }

    #[test]
    fn test_canonical_sort() {
        let mut entries = vec![
            entry("old", (2023, 12, 31), "08:00", "09:00"),
            entry("morning", (2024, 1, 1), "08:00", "09:00"),
            entry("evening", (2024, 1, 1), "18:00", "19:00"),
        ];
        sort_canonical(&mut entries);
        let ids = entries.iter().map(|v| v.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["evening", "morning", "old"]);
    }

    #[test]
    fn test_validation() {
        let mut draft = entry("a", (2024, 1, 1), "08:30", "17:00").to_draft();
        assert_eq!(draft.validate(), Ok(()));

        draft.task = "  \n ".into();
        assert_eq!(draft.validate(), Err(ValidationError::EmptyTask));

        draft.task = "done".into();
        draft.end_time = draft.start_time;
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::EndNotAfterStart { .. })
        ));
    }

    #[test]
    fn test_apply_keeps_id() {
        let mut target = entry("keep", (2024, 1, 1), "08:00", "09:00");
        let patch = entry("other", (2024, 2, 2), "10:00", "11:30").to_draft();
        target.apply(patch.clone());
        assert_eq!(target.id.as_str(), "keep");
        assert_eq!(target.to_draft(), patch);
    }
}
