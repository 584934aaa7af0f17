use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::event::{EventFields, EventPatch, StoredEvent};

/// Persistence boundary for events.
///
/// `list_events` returns rows ascending by start time. Create and update
/// validate the fields before anything is written.
pub trait EventStore {
    fn list_events(&self) -> anyhow::Result<Vec<StoredEvent>>;

    fn create_event(&mut self, fields: EventFields) -> anyhow::Result<StoredEvent>;

    fn update_event(&mut self, id: Uuid, patch: &EventPatch) -> anyhow::Result<StoredEvent>;

    fn delete_event(&mut self, id: Uuid) -> anyhow::Result<()>;
}

/// JSONL-backed store: one event per line in `events.data`.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub events_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let events_path = data_dir.join("events.data");
        if !events_path.exists() {
            fs::write(&events_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            events = %events_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            events_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_events(&self) -> anyhow::Result<Vec<StoredEvent>> {
        load_jsonl(&self.events_path).context("failed to load events.data")
    }

    #[tracing::instrument(skip(self, events))]
    pub fn save_events(&self, events: &[StoredEvent]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.events_path, events).context("failed to save events.data")
    }
}

impl EventStore for DataStore {
    fn list_events(&self) -> anyhow::Result<Vec<StoredEvent>> {
        let mut events = self.load_events()?;
        sort_by_start(&mut events);
        Ok(events)
    }

    #[tracing::instrument(skip(self, fields), fields(title = %fields.title))]
    fn create_event(&mut self, fields: EventFields) -> anyhow::Result<StoredEvent> {
        let fields = fields.into_validated()?;
        let mut events = self.load_events()?;
        let stored = StoredEvent::new(fields, Utc::now());
        events.push(stored.clone());
        sort_by_start(&mut events);
        self.save_events(&events)?;
        info!(id = %stored.id, "created event");
        Ok(stored)
    }

    #[tracing::instrument(skip(self, patch), fields(id = %id))]
    fn update_event(&mut self, id: Uuid, patch: &EventPatch) -> anyhow::Result<StoredEvent> {
        let mut events = self.load_events()?;
        let updated = apply_update(&mut events, id, patch)?;
        sort_by_start(&mut events);
        self.save_events(&events)?;
        info!("updated event");
        Ok(updated)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    fn delete_event(&mut self, id: Uuid) -> anyhow::Result<()> {
        let mut events = self.load_events()?;
        remove_event(&mut events, id)?;
        self.save_events(&events)?;
        info!("deleted event");
        Ok(())
    }
}

/// In-process store with the same semantics as [`DataStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    events: Vec<StoredEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryStore {
    fn list_events(&self) -> anyhow::Result<Vec<StoredEvent>> {
        let mut events = self.events.clone();
        sort_by_start(&mut events);
        Ok(events)
    }

    fn create_event(&mut self, fields: EventFields) -> anyhow::Result<StoredEvent> {
        let stored = StoredEvent::new(fields.into_validated()?, Utc::now());
        self.events.push(stored.clone());
        Ok(stored)
    }

    fn update_event(&mut self, id: Uuid, patch: &EventPatch) -> anyhow::Result<StoredEvent> {
        apply_update(&mut self.events, id, patch)
    }

    fn delete_event(&mut self, id: Uuid) -> anyhow::Result<()> {
        remove_event(&mut self.events, id)
    }
}

fn sort_by_start(events: &mut [StoredEvent]) {
    events.sort_by(|a, b| {
        a.fields
            .start_time
            .cmp(&b.fields.start_time)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

fn apply_update(
    events: &mut [StoredEvent],
    id: Uuid,
    patch: &EventPatch,
) -> anyhow::Result<StoredEvent> {
    let event = events
        .iter_mut()
        .find(|event| event.id == id)
        .ok_or_else(|| anyhow!("event not found: {id}"))?;

    let mut fields = event.fields.clone();
    fields.apply_patch(patch);
    event.fields = fields.into_validated()?;
    event.updated_at = Utc::now();
    Ok(event.clone())
}

fn remove_event(events: &mut Vec<StoredEvent>, id: Uuid) -> anyhow::Result<()> {
    let idx = events
        .iter()
        .position(|event| event.id == id)
        .ok_or_else(|| anyhow!("event not found: {id}"))?;
    events.remove(idx);
    Ok(())
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<StoredEvent>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: StoredEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(event);
    }

    debug!(count = out.len(), "loaded events from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, events))]
fn save_jsonl_atomic(path: &Path, events: &[StoredEvent]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = events.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for event in events {
        let serialized = serde_json::to_string(event)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
