//! Time source for submissions
//!
//! The workflow reads "now" through [`Clock`] so date rules and protocol
//! years can be pinned in tests.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use std::fmt::Debug;

/// Source of the current local time
pub trait Clock: Send + Sync + Debug {
    /// Current local timestamp
    fn now(&self) -> NaiveDateTime;

    /// Current local date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current calendar year
    fn year(&self) -> i32 {
        self.today().year()
    }
}

/// Wall clock in the process's local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
