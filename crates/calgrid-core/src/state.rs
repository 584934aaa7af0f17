//! Application state and the controller that owns it.
//!
//! The controller is the only writer. Renderers receive `&AppState` and read
//! a consistent snapshot; after every storage mutation the snapshot is
//! fetched again rather than patched in place.

use chrono::NaiveDate;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::datastore::EventStore;
use crate::datetime::{add_days, add_months, add_weeks, format_date, format_month_year};
use crate::event::{CalendarEvent, EventFields, EventPatch, StoredEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewType {
    #[default]
    Month,
    Week,
    Day,
}

impl ViewType {
    pub fn as_key(self) -> &'static str {
        match self {
            ViewType::Month => "month",
            ViewType::Week => "week",
            ViewType::Day => "day",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "month" => Some(ViewType::Month),
            "week" => Some(ViewType::Week),
            "day" => Some(ViewType::Day),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    events: Vec<CalendarEvent>,
    current_date: NaiveDate,
    view_type: ViewType,
    selected_event: Option<CalendarEvent>,
    editor_open: bool,
    loading: bool,
}

impl AppState {
    pub fn new(current_date: NaiveDate) -> Self {
        Self {
            events: Vec::new(),
            current_date,
            view_type: ViewType::default(),
            selected_event: None,
            editor_open: false,
            loading: false,
        }
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    pub fn selected_event(&self) -> Option<&CalendarEvent> {
        self.selected_event.as_ref()
    }

    pub fn is_editor_open(&self) -> bool {
        self.editor_open
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_current_date(&mut self, date: NaiveDate) {
        self.current_date = date;
    }

    pub fn set_view_type(&mut self, view: ViewType) {
        self.view_type = view;
    }

    pub fn set_events(&mut self, events: Vec<CalendarEvent>) {
        self.events = events;
    }

    /// Selects an event (draft or persisted) and opens the editor on it.
    pub fn select_event(&mut self, event: CalendarEvent) {
        self.selected_event = Some(event);
        self.editor_open = true;
    }

    pub fn close_editor(&mut self) {
        self.editor_open = false;
        self.selected_event = None;
    }

    /// Heading shown above the current view.
    pub fn date_label(&self) -> String {
        date_label(self.view_type, self.current_date)
    }

    fn replace_events(&mut self, events: Vec<StoredEvent>) {
        self.set_events(events.into_iter().map(CalendarEvent::from).collect());
    }
}

pub fn date_label(view: ViewType, date: NaiveDate) -> String {
    match view {
        ViewType::Month | ViewType::Week => format_month_year(date),
        ViewType::Day => format_date(date),
    }
}

/// Moves `date` by `step` pages of `view`.
pub fn shift_focus(date: NaiveDate, view: ViewType, step: i64) -> NaiveDate {
    match view {
        ViewType::Month => {
            let months = i32::try_from(step).unwrap_or(if step < 0 { i32::MIN } else { i32::MAX });
            add_months(date, months)
        }
        ViewType::Week => add_weeks(date, step),
        ViewType::Day => add_days(date, step),
    }
}

pub struct CalendarController<S: EventStore> {
    store: S,
    state: AppState,
}

impl<S: EventStore> CalendarController<S> {
    pub fn new(store: S, today: NaiveDate) -> Self {
        Self {
            store,
            state: AppState::new(today),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reloads the snapshot. On failure the previous snapshot is kept.
    #[instrument(skip(self))]
    pub fn refresh(&mut self) -> anyhow::Result<()> {
        self.state.loading = true;
        let result = self.store.list_events();
        self.state.loading = false;

        match result {
            Ok(events) => {
                debug!(count = events.len(), "refreshed events");
                self.state.replace_events(events);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to fetch events");
                Err(err)
            }
        }
    }

    #[instrument(skip(self, fields))]
    pub fn create_event(&mut self, fields: EventFields) -> anyhow::Result<StoredEvent> {
        let created = self.store.create_event(fields).inspect_err(|err| {
            error!(error = %err, "failed to create event");
        })?;
        self.refresh()?;
        Ok(created)
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    pub fn update_event(&mut self, id: Uuid, patch: &EventPatch) -> anyhow::Result<StoredEvent> {
        let updated = self.store.update_event(id, patch).inspect_err(|err| {
            error!(error = %err, "failed to update event");
        })?;
        self.refresh()?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn delete_event(&mut self, id: Uuid) -> anyhow::Result<()> {
        self.store.delete_event(id).inspect_err(|err| {
            error!(error = %err, "failed to delete event");
        })?;
        if self.state.selected_event.as_ref().and_then(CalendarEvent::id) == Some(id) {
            self.state.close_editor();
        }
        self.refresh()
    }

    /// Saves the event open in the editor: drafts are created, persisted
    /// events are updated with the given fields.
    #[instrument(skip(self, fields))]
    pub fn save_selected(&mut self, fields: EventFields) -> anyhow::Result<StoredEvent> {
        let id = self
            .state
            .selected_event()
            .and_then(CalendarEvent::id);
        let saved = match id {
            Some(id) => self.update_event(id, &EventPatch::from(fields))?,
            None => self.create_event(fields)?,
        };
        self.state.close_editor();
        Ok(saved)
    }

    pub fn set_view(&mut self, view: ViewType) {
        info!(view = view.as_key(), "switching view");
        self.state.view_type = view;
    }

    pub fn navigate(&mut self, step: i64) {
        let next = shift_focus(self.state.current_date, self.state.view_type, step);
        debug!(from = %self.state.current_date, to = %next, "navigating");
        self.state.current_date = next;
    }

    pub fn go_to_today(&mut self, today: NaiveDate) {
        self.state.set_current_date(today);
    }

    pub fn find_event(&self, id: Uuid) -> Option<&CalendarEvent> {
        self.state.events.iter().find(|event| event.id() == Some(id))
    }
}
