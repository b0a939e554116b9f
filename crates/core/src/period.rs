use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive date range where either end may be open.
///
/// Dates carry no time or zone, so an inclusive bound behaves like
/// start-of-day for `start` and end-of-day for `end` in UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}
