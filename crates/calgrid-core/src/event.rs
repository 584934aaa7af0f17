use anyhow::anyhow;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_EVENT_COLOR: &str = "#1a73e8";

/// Named colors offered when creating an event.
pub const EVENT_COLORS: [(&str, &str); 7] = [
    ("Blue", "#1a73e8"),
    ("Red", "#d93025"),
    ("Green", "#188038"),
    ("Yellow", "#f9ab00"),
    ("Orange", "#fa903e"),
    ("Purple", "#9334e6"),
    ("Gray", "#5f6368"),
];

/// Maps a palette name to its hex token. Anything else is kept verbatim.
pub fn resolve_color(token: &str) -> String {
    let trimmed = token.trim();
    EVENT_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        .map(|(_, hex)| (*hex).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

fn default_color() -> String {
    DEFAULT_EVENT_COLOR.to_string()
}

/// An opaque recurrence rule. It is stored and shown, never expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecurrenceSpec(String);

impl RecurrenceSpec {
    pub fn new(rule: impl Into<String>) -> Option<Self> {
        let rule = rule.into();
        let trimmed = rule.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Recurrence {
    #[default]
    None,
    Rule(RecurrenceSpec),
}

impl Recurrence {
    pub fn parse(raw: &str) -> Self {
        RecurrenceSpec::new(raw).map_or(Self::None, Self::Rule)
    }

    pub fn rule(&self) -> Option<&RecurrenceSpec> {
        match self {
            Self::None => None,
            Self::Rule(spec) => Some(spec),
        }
    }
}

impl From<Option<String>> for Recurrence {
    fn from(raw: Option<String>) -> Self {
        raw.as_deref().map_or(Self::None, Self::parse)
    }
}

impl From<Recurrence> for Option<String> {
    fn from(recurrence: Recurrence) -> Self {
        match recurrence {
            Recurrence::None => None,
            Recurrence::Rule(spec) => Some(spec.0),
        }
    }
}

/// The user-editable part of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFields {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub start_time: NaiveDateTime,

    pub end_time: NaiveDateTime,

    #[serde(default)]
    pub all_day: bool,

    #[serde(default)]
    pub location: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default, rename = "recurrence_rule")]
    pub recurrence: Recurrence,
}

impl EventFields {
    pub fn new(title: impl Into<String>, start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start_time,
            end_time,
            all_day: false,
            location: String::new(),
            color: default_color(),
            recurrence: Recurrence::None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.title.trim().is_empty() {
            return Err(anyhow!("event title must not be empty"));
        }
        if self.end_time <= self.start_time {
            return Err(anyhow!(
                "end time must be after start time ({} <= {})",
                self.end_time,
                self.start_time
            ));
        }
        Ok(())
    }

    /// Trims the title and checks the fields before they reach storage.
    pub fn into_validated(mut self) -> anyhow::Result<Self> {
        self.title = self.title.trim().to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn apply_patch(&mut self, patch: &EventPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(start) = patch.start_time {
            self.start_time = start;
        }
        if let Some(end) = patch.end_time {
            self.end_time = end;
        }
        if let Some(all_day) = patch.all_day {
            self.all_day = all_day;
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(recurrence) = &patch.recurrence {
            self.recurrence = recurrence.clone();
        }
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub all_day: Option<bool>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub recurrence: Option<Recurrence>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A patch that overwrites every field.
impl From<EventFields> for EventPatch {
    fn from(fields: EventFields) -> Self {
        Self {
            title: Some(fields.title),
            description: Some(fields.description),
            start_time: Some(fields.start_time),
            end_time: Some(fields.end_time),
            all_day: Some(fields.all_day),
            location: Some(fields.location),
            color: Some(fields.color),
            recurrence: Some(fields.recurrence),
        }
    }
}

/// One row of the event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: Uuid,

    #[serde(flatten)]
    pub fields: EventFields,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl StoredEvent {
    pub fn new(fields: EventFields, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarEvent {
    Draft(EventFields),
    Persisted(StoredEvent),
}

impl CalendarEvent {
    pub fn fields(&self) -> &EventFields {
        match self {
            Self::Draft(fields) => fields,
            Self::Persisted(stored) => &stored.fields,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Self::Draft(_) => None,
            Self::Persisted(stored) => Some(stored.id),
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }

    /// Noon-to-one draft used when a whole day is picked.
    pub fn draft_for_day(date: NaiveDate) -> Self {
        Self::draft_for_slot(date, 12)
    }

    /// One-hour draft starting at the first whole hour after `now` on
    /// `date`. From 23:xx it starts at midnight of the following day.
    pub fn draft_next_hour(date: NaiveDate, now: NaiveTime) -> Self {
        let this_hour = NaiveTime::from_hms_opt(now.hour(), 0, 0).unwrap_or(NaiveTime::MIN);
        let this_hour = date.and_time(this_hour);
        let start = this_hour
            .checked_add_signed(Duration::hours(1))
            .unwrap_or(this_hour);
        let end = start
            .checked_add_signed(Duration::hours(1))
            .unwrap_or(start);
        Self::Draft(EventFields::new(String::new(), start, end))
    }

    /// One-hour draft starting at `hour:00` of `date`.
    pub fn draft_for_slot(date: NaiveDate, hour: u32) -> Self {
        let start_time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
        let start = date.and_time(start_time);
        let end = start
            .checked_add_signed(Duration::hours(1))
            .unwrap_or(start);
        Self::Draft(EventFields::new(String::new(), start, end))
    }
}

impl From<StoredEvent> for CalendarEvent {
    fn from(stored: StoredEvent) -> Self {
        Self::Persisted(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn validation_rejects_blank_title_and_backwards_range() {
        let ok = EventFields::new("  standup ", at(2024, 3, 5, 10, 0), at(2024, 3, 5, 10, 15));
        let validated = ok.into_validated().expect("valid event");
        assert_eq!(validated.title, "standup");

        let blank = EventFields::new("   ", at(2024, 3, 5, 10, 0), at(2024, 3, 5, 11, 0));
        assert!(blank.validate().is_err());

        let empty_range = EventFields::new("x", at(2024, 3, 5, 10, 0), at(2024, 3, 5, 10, 0));
        let err = empty_range.validate().expect_err("zero duration rejected");
        assert!(err.to_string().contains("end time must be after start time"));
    }

    #[test]
    fn drafts_have_no_identity() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date");
        let draft = CalendarEvent::draft_for_day(date);
        assert!(draft.is_draft());
        assert_eq!(draft.id(), None);
        assert_eq!(draft.fields().start_time, at(2024, 3, 5, 12, 0));
        assert_eq!(draft.fields().end_time, at(2024, 3, 5, 13, 0));
        assert_eq!(draft.fields().color, DEFAULT_EVENT_COLOR);

        let late = CalendarEvent::draft_for_slot(date, 23);
        assert_eq!(late.fields().end_time, at(2024, 3, 6, 0, 0));
    }

    #[test]
    fn next_hour_draft_rolls_past_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date");
        let quarter_past = NaiveTime::from_hms_opt(8, 15, 0).expect("valid time");
        let draft = CalendarEvent::draft_next_hour(date, quarter_past);
        assert!(draft.is_draft());
        assert_eq!(draft.fields().start_time, at(2024, 3, 5, 9, 0));
        assert_eq!(draft.fields().end_time, at(2024, 3, 5, 10, 0));

        let late = NaiveTime::from_hms_opt(23, 40, 0).expect("valid time");
        let new_years_eve = NaiveDate::from_ymd_opt(2024, 12, 31).expect("valid date");
        let draft = CalendarEvent::draft_next_hour(new_years_eve, late);
        assert_eq!(draft.fields().start_time, at(2025, 1, 1, 0, 0));
        assert_eq!(draft.fields().end_time, at(2025, 1, 1, 1, 0));
    }

    #[test]
    fn recurrence_is_stored_as_nullable_rule() {
        let mut fields = EventFields::new("gym", at(2024, 3, 5, 7, 0), at(2024, 3, 5, 8, 0));
        let json = serde_json::to_value(&fields).expect("serialize");
        assert_eq!(json["recurrence_rule"], serde_json::Value::Null);

        fields.recurrence = Recurrence::parse("FREQ=WEEKLY;BYDAY=TU");
        let json = serde_json::to_string(&fields).expect("serialize");
        assert!(json.contains("\"recurrence_rule\":\"FREQ=WEEKLY;BYDAY=TU\""));

        let back: EventFields = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(
            back.recurrence.rule().map(RecurrenceSpec::as_str),
            Some("FREQ=WEEKLY;BYDAY=TU")
        );
        assert_eq!(Recurrence::parse("  "), Recurrence::None);
    }

    #[test]
    fn stored_rows_flatten_fields() {
        let raw = r#"{
            "id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
            "title": "Dentist",
            "start_time": "2024-03-05T09:30:00",
            "end_time": "2024-03-05T10:00:00",
            "created_at": "2024-03-01T00:00:00Z",
            "updated_at": "2024-03-01T00:00:00Z"
        }"#;
        let stored: StoredEvent = serde_json::from_str(raw).expect("deserialize row");
        assert_eq!(stored.fields.title, "Dentist");
        assert_eq!(stored.fields.color, DEFAULT_EVENT_COLOR);
        assert!(!stored.fields.all_day);
        assert_eq!(stored.fields.recurrence, Recurrence::None);
    }

    #[test]
    fn palette_names_resolve() {
        assert_eq!(resolve_color("purple"), "#9334e6");
        assert_eq!(resolve_color("#123456"), "#123456");
    }

    #[test]
    fn patch_applies_only_given_fields() {
        let mut fields = EventFields::new("a", at(2024, 3, 5, 9, 0), at(2024, 3, 5, 10, 0));
        let patch = EventPatch {
            location: Some("Room 4".to_string()),
            all_day: Some(true),
            ..EventPatch::default()
        };
        assert!(!patch.is_empty());
        fields.apply_patch(&patch);
        assert_eq!(fields.title, "a");
        assert_eq!(fields.location, "Room 4");
        assert!(fields.all_day);
        assert!(EventPatch::default().is_empty());
    }
}
