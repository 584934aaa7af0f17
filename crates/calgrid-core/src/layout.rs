//! Vertical placement of events on a time grid.

use std::ops::Range;

use chrono::{NaiveDateTime, Timelike};

/// Layout units per hour before any view scaling.
pub const HOUR_HEIGHT: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventBox {
    pub top: f64,
    pub height: f64,
}

fn fractional_hour(ts: NaiveDateTime) -> f64 {
    f64::from(ts.hour()) + f64::from(ts.minute()) / 60.0
}

/// Offset and height of an event, 60 units per hour.
///
/// Only the time of day of each timestamp is read. An end earlier in the day
/// than the start yields a negative height; clamping belongs to the caller.
pub fn layout(start: NaiveDateTime, end: NaiveDateTime, day_start_hour: f64) -> EventBox {
    let start_hour = fractional_hour(start);
    let end_hour = fractional_hour(end);
    let duration = end_hour - start_hour;

    EventBox {
        top: (start_hour - day_start_hour) * HOUR_HEIGHT,
        height: duration * HOUR_HEIGHT,
    }
}

impl EventBox {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Hour rows of height `hour_height` that this box overlaps.
    ///
    /// A box always occupies at least the row it starts in.
    pub fn rows(&self, hour_height: f64) -> Range<i64> {
        if hour_height <= 0.0 {
            return 0..0;
        }
        let first = (self.top / hour_height).floor() as i64;
        let last = (self.bottom() / hour_height).ceil() as i64;
        first..last.max(first + 1)
    }
}

/// Display scale applied on top of [`layout`] by a particular view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewScale {
    pub hour_height: f64,
    pub min_height: f64,
}

impl ViewScale {
    pub const DAY: ViewScale = ViewScale {
        hour_height: 80.0,
        min_height: 40.0,
    };
    pub const WEEK: ViewScale = ViewScale {
        hour_height: HOUR_HEIGHT,
        min_height: 20.0,
    };

    pub fn apply(&self, raw: EventBox) -> EventBox {
        EventBox {
            top: raw.top * self.hour_height / HOUR_HEIGHT,
            height: (raw.height * self.hour_height / HOUR_HEIGHT).max(self.min_height),
        }
    }
}
