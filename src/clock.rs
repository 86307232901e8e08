use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of the current date and time
///
/// Every operation that defaults a date to "today" or a moment to "now"
/// reads it from here, so tests and batch replays can pin time.
pub trait Clock {
    /// The current local date-time
    fn now(&self) -> NaiveDateTime;

    /// The current local date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Reads the wall clock in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one moment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Freeze the clock at midnight of `date`
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::default()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
