use chrono::{Local, NaiveDateTime, Timelike};

/// Represents an entity responsible for providing the current time across application. Every
/// time dependent operation takes one, so tests can pin "now" to a fixed moment.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Sync + Send + 'static {
    /// Current local wall-clock time.
    fn time(&self) -> NaiveDateTime;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    /// Whole seconds only, stored entries don't need sub-second precision.
    fn time(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}
