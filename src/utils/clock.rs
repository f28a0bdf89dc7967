use chrono::{DateTime, Datelike, Local, NaiveDate};

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Local>;

    /// Entries carry plain dates, so "today" is the local calendar day.
    fn today(&self) -> NaiveDate {
        self.time().date_naive()
    }

    fn current_year(&self) -> i32 {
        self.today().year()
    }
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }
}
