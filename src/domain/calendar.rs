//! Trading calendar: the date axis every ledger is aligned on.

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};

/// Whether Saturdays and Sundays are part of the date axis.
///
/// There is deliberately no default: callers must state what they want.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekendFilter {
    Keep,
    Skip,
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The current day, truncated to local midnight.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Daily date sequence from `start` through `end`, both inclusive.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    start: NaiveDate,
    end: NaiveDate,
    weekends: WeekendFilter,
}

impl TradingCalendar {
    pub fn new(start: NaiveDate, end: NaiveDate, weekends: WeekendFilter) -> Self {
        Self {
            start,
            end,
            weekends,
        }
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            if self.weekends == WeekendFilter::Keep || !is_weekend(current) {
                days.push(current);
            }
            current += Duration::days(1);
        }
        days
    }
}
