//! Decides which events belong to which day cell.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::event::{CalendarEvent, EventFields};

/// Which membership test a view uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Start day, end day, or any day strictly inside the span (month view).
    Span,
    /// Start day only (time-grid views draw an event once, at its start).
    StartDay,
}

/// Calendar-date equality; time of day is ignored.
pub fn same_day(a: impl Datelike, b: impl Datelike) -> bool {
    a.year() == b.year() && a.month() == b.month() && a.day() == b.day()
}

/// Month-view membership.
///
/// All-day events match on their start date alone. Timed events match on
/// their start date, their end date, or when `date` at midnight lies strictly
/// between start and end. Comparing against midnight means an event that
/// ends exactly at 00:00 also shows on that day through the end-date test.
pub fn event_occurs_on(fields: &EventFields, date: NaiveDate) -> bool {
    if fields.all_day {
        return same_day(fields.start_time, date);
    }

    let midnight = date.and_time(NaiveTime::MIN);
    same_day(fields.start_time, date)
        || same_day(fields.end_time, date)
        || (fields.start_time < midnight && fields.end_time > midnight)
}

pub fn event_starts_on(fields: &EventFields, date: NaiveDate) -> bool {
    same_day(fields.start_time, date)
}

impl MatchMode {
    pub fn matches(self, fields: &EventFields, date: NaiveDate) -> bool {
        match self {
            MatchMode::Span => event_occurs_on(fields, date),
            MatchMode::StartDay => event_starts_on(fields, date),
        }
    }
}

/// Events shown on `date`, in the order they were given.
pub fn events_on(events: &[CalendarEvent], date: NaiveDate, mode: MatchMode) -> Vec<&CalendarEvent> {
    events
        .iter()
        .filter(|event| mode.matches(event.fields(), date))
        .collect()
}
