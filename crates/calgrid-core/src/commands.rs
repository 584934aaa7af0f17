use std::io::{self, Read};

use anyhow::{Context, anyhow};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::EventStore;
use crate::datetime::{parse_date, parse_date_expr};
use crate::event::{
    CalendarEvent, DEFAULT_EVENT_COLOR, EventFields, EventPatch, Recurrence, StoredEvent,
    resolve_color,
};
use crate::matcher::{MatchMode, events_on};
use crate::render::{Renderer, short_id};
use crate::state::{CalendarController, ViewType};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "month", "week", "day", "list", "add", "modify", "delete", "info", "export", "import",
        "_commands", "_show", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(controller, cfg, renderer, inv, now))]
pub fn dispatch<S: EventStore>(
    controller: &mut CalendarController<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = &inv.command_args;

    debug!(command, args = ?args, "dispatching command");

    match command {
        "month" | "week" | "day" => {
            let view = ViewType::from_key(command)
                .ok_or_else(|| anyhow!("unknown view: {command}"))?;
            cmd_view(controller, renderer, view, args, now)
        }
        "list" => cmd_list(controller, renderer, args, now),
        "add" => cmd_add(controller, cfg, args, now),
        "modify" => cmd_modify(controller, args, now),
        "delete" => cmd_delete(controller, args),
        "info" => cmd_info(controller, renderer, args),
        "export" => cmd_export(controller),
        "import" => cmd_import(controller),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(controller, renderer, args, now))]
fn cmd_view<S: EventStore>(
    controller: &mut CalendarController<S>,
    renderer: &mut Renderer,
    view: ViewType,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!(view = view.as_key(), "command view");

    let today = now.date();
    let (focus, step) = parse_view_args(args, today)?;

    controller.refresh()?;
    controller.set_view(view);
    controller.go_to_today(focus);
    controller.navigate(step);

    renderer.print_view(controller.state(), today)
}

/// `[DATE] [+N|-N]`: the focus date (default today) and a page offset.
fn parse_view_args(args: &[String], today: NaiveDate) -> anyhow::Result<(NaiveDate, i64)> {
    let mut step = 0_i64;
    let mut date_terms = Vec::new();

    for arg in args {
        if let Some(offset) = parse_step(arg) {
            step = step.saturating_add(offset);
        } else {
            date_terms.push(arg.as_str());
        }
    }

    let focus = if date_terms.is_empty() {
        today
    } else {
        parse_date(&date_terms.join(" "), today)?
    };

    Ok((focus, step))
}

fn parse_step(token: &str) -> Option<i64> {
    let digits = token.strip_prefix('+').or_else(|| token.strip_prefix('-'))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if token.starts_with('-') { -value } else { value })
}

#[instrument(skip(controller, renderer, args, now))]
fn cmd_list<S: EventStore>(
    controller: &mut CalendarController<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command list");
    controller.refresh()?;

    let events = controller.state().events();
    if args.is_empty() {
        return renderer.print_event_table(events);
    }

    let day = parse_date(&args.join(" "), now.date())?;
    let rows: Vec<CalendarEvent> = events_on(events, day, MatchMode::Span)
        .into_iter()
        .cloned()
        .collect();
    renderer.print_event_table(&rows)
}

#[instrument(skip(controller, cfg, args, now))]
fn cmd_add<S: EventStore>(
    controller: &mut CalendarController<S>,
    cfg: &Config,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command add");

    let (title, mods) = parse_title_and_mods(args, now)?;
    let default_color = cfg
        .get("event.color")
        .map(|color| resolve_color(&color))
        .unwrap_or_else(|| DEFAULT_EVENT_COLOR.to_string());
    let fields = build_new_event(title, &mods, now, &default_color);

    let created = controller.create_event(fields)?;
    println!("Created event {}.", short_id(&created.id.to_string()));
    Ok(())
}

#[instrument(skip(controller, args, now))]
fn cmd_modify<S: EventStore>(
    controller: &mut CalendarController<S>,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command modify");

    let (prefix, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("modify requires an event id"))?;
    controller.refresh()?;
    let existing = find_by_prefix(controller.state().events(), prefix)?.clone();

    let mods = parse_mods(rest, now)?;
    let patch = build_patch(&existing.fields, &mods);
    if patch.is_empty() {
        return Err(anyhow!("modify: no changes given"));
    }

    let updated = controller.update_event(existing.id, &patch)?;
    println!("Modified event {}.", short_id(&updated.id.to_string()));
    Ok(())
}

#[instrument(skip(controller, args))]
fn cmd_delete<S: EventStore>(
    controller: &mut CalendarController<S>,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command delete");

    let prefix = args
        .first()
        .ok_or_else(|| anyhow!("delete requires an event id"))?;
    controller.refresh()?;
    let id = find_by_prefix(controller.state().events(), prefix)?.id;

    controller.delete_event(id)?;
    println!("Deleted event {}.", short_id(&id.to_string()));
    Ok(())
}

fn cmd_info<S: EventStore>(
    controller: &mut CalendarController<S>,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command info");

    let prefix = args
        .first()
        .ok_or_else(|| anyhow!("info requires an event id"))?;
    controller.refresh()?;
    let stored = find_by_prefix(controller.state().events(), prefix)?.clone();

    renderer.print_event_info(&CalendarEvent::Persisted(stored))
}

fn cmd_export<S: EventStore>(controller: &mut CalendarController<S>) -> anyhow::Result<()> {
    info!("command export");
    controller.refresh()?;

    let rows: Vec<&StoredEvent> = persisted(controller.state().events()).collect();
    let out = serde_json::to_string(&rows)?;
    println!("{out}");
    Ok(())
}

/// One record of `import` input. The id is optional; unknown fields such as
/// `created_at` are ignored.
#[derive(Debug, Clone, Deserialize)]
struct ImportEvent {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(flatten)]
    fields: EventFields,
}

#[instrument(skip(controller))]
fn cmd_import<S: EventStore>(controller: &mut CalendarController<S>) -> anyhow::Result<()> {
    info!("command import");

    let mut stdin = String::new();
    io::stdin()
        .read_to_string(&mut stdin)
        .context("failed reading stdin")?;

    let imported = validate_import_items(parse_import_items(stdin.trim())?)?;
    controller.refresh()?;

    let mut adds = 0_u64;
    let mut mods = 0_u64;
    for row in imported {
        let existing = row.id.filter(|id| controller.find_event(*id).is_some());
        match existing {
            Some(id) => {
                controller.update_event(id, &EventPatch::from(row.fields))?;
                mods += 1;
            }
            None => {
                controller.create_event(row.fields)?;
                adds += 1;
            }
        }
    }

    debug!(adds, mods, "import finished");
    println!("Imported {} event(s).", adds + mods);
    Ok(())
}

fn parse_import_items(trimmed: &str) -> anyhow::Result<Vec<ImportEvent>> {
    if trimmed.is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("failed parsing JSON array");
    }

    let mut out = Vec::new();
    for (idx, line) in trimmed.lines().enumerate() {
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let item: ImportEvent = serde_json::from_str(token)
            .with_context(|| format!("failed parsing import line {}", idx + 1))?;
        out.push(item);
    }

    if out.is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    Ok(out)
}

/// Checks every record so that a bad row fails the import before anything
/// is written.
fn validate_import_items(items: Vec<ImportEvent>) -> anyhow::Result<Vec<ImportEvent>> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let fields = item
                .fields
                .into_validated()
                .with_context(|| format!("import record {} is invalid", idx + 1))?;
            Ok(ImportEvent { id: item.id, fields })
        })
        .collect()
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<_> = cfg.iter().collect();
    entries.sort();
    for (k, v) in entries {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "usage: calgrid [options] <command> [args]

  month|week|day [DATE] [+N|-N]   show a calendar page
  list [DATE]                     list events (optionally those on DATE)
  add <title> [field:value ...]   create an event
  modify <id> [field:value ...]   change an event
  delete <id>                     remove an event
  info <id>                       show every field of an event
  export                          print events as JSON
  import                          read a JSON array or JSON lines from stdin
  _show                           print the effective configuration

fields: start: end: allday: location: desc: color: rrule: title:
ids may be shortened to any unique prefix"
    );
    Ok(())
}

fn persisted(events: &[CalendarEvent]) -> impl Iterator<Item = &StoredEvent> {
    events.iter().filter_map(|event| match event {
        CalendarEvent::Persisted(stored) => Some(stored),
        CalendarEvent::Draft(_) => None,
    })
}

/// Resolves a full id or a unique id prefix against the current snapshot.
fn find_by_prefix<'a>(events: &'a [CalendarEvent], prefix: &str) -> anyhow::Result<&'a StoredEvent> {
    let needle = prefix.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(anyhow!("event id must not be empty"));
    }

    let matches: Vec<&StoredEvent> = persisted(events)
        .filter(|stored| stored.id.to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("no event matches id {prefix}")),
        [only] => Ok(*only),
        many => Err(anyhow!(
            "id prefix {prefix} is ambiguous ({} events match)",
            many.len()
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Mod {
    Title(String),
    Start(NaiveDateTime),
    End(NaiveDateTime),
    AllDay(bool),
    Location(String),
    Description(String),
    Color(String),
    Recurrence(Recurrence),
}

#[instrument(skip(args, now))]
fn parse_title_and_mods(args: &[String], now: NaiveDateTime) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut title_parts = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
            continue;
        }

        title_parts.push(arg.clone());
    }

    let explicit_title = mods.iter().any(|one_mod| matches!(one_mod, Mod::Title(_)));
    if title_parts.is_empty() && !explicit_title {
        return Err(anyhow!("add: title is required"));
    }

    Ok((title_parts.join(" "), mods))
}

#[instrument(skip(args, now))]
fn parse_mods(args: &[String], now: NaiveDateTime) -> anyhow::Result<Vec<Mod>> {
    let mut mods = Vec::new();
    for arg in args {
        if let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
        } else {
            warn!(arg = %arg, "unrecognized modifier token ignored");
        }
    }
    Ok(mods)
}

/// `key:value` or `key=value`, whichever separator comes first.
fn parse_one_mod(tok: &str, now: NaiveDateTime) -> anyhow::Result<Option<Mod>> {
    let Some(idx) = tok.find([':', '=']) else {
        return Ok(None);
    };
    let key = tok[..idx].to_ascii_lowercase();
    let value = &tok[idx + 1..];

    match key.as_str() {
        "title" => Ok(Some(Mod::Title(value.to_string()))),
        "start" => Ok(Some(Mod::Start(parse_date_expr(value, now)?))),
        "end" => Ok(Some(Mod::End(parse_date_expr(value, now)?))),
        "allday" => Ok(Some(Mod::AllDay(parse_flag(value)?))),
        "loc" | "location" => Ok(Some(Mod::Location(value.to_string()))),
        "desc" | "description" => Ok(Some(Mod::Description(value.to_string()))),
        "color" => Ok(Some(Mod::Color(resolve_color(value)))),
        "rrule" => Ok(Some(Mod::Recurrence(Recurrence::parse(value)))),
        _ => Ok(None),
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "y" | "yes" | "on" | "true" => Ok(true),
        "" | "0" | "n" | "no" | "off" | "false" => Ok(false),
        other => Err(anyhow!("invalid allday value: {other}")),
    }
}

/// Fields for `add`. Without `start:` the event begins at the next whole
/// hour; without `end:` it lasts an hour, or the rest of the day when
/// all-day.
fn build_new_event(
    title: String,
    mods: &[Mod],
    now: NaiveDateTime,
    default_color: &str,
) -> EventFields {
    let draft = CalendarEvent::draft_next_hour(now.date(), now.time());
    let mut fields = draft.fields().clone();
    fields.title = title;
    fields.color = default_color.to_string();

    let mut start = None;
    let mut end = None;
    for one_mod in mods {
        match one_mod {
            Mod::Start(ts) => start = Some(*ts),
            Mod::End(ts) => end = Some(*ts),
            other => apply_mod(&mut fields, other),
        }
    }

    if fields.all_day {
        let day = start.map_or(now.date(), |ts| ts.date());
        let start = start.unwrap_or_else(|| day.and_time(NaiveTime::MIN));
        fields.start_time = start;
        fields.end_time = end.unwrap_or_else(|| {
            let one_minute = start
                .checked_add_signed(Duration::minutes(1))
                .unwrap_or(start);
            end_of_day(day).max(one_minute)
        });
    } else {
        if let Some(start) = start {
            fields.start_time = start;
        }
        let start = fields.start_time;
        fields.end_time = end.unwrap_or_else(|| {
            start
                .checked_add_signed(Duration::hours(1))
                .unwrap_or(start)
        });
    }

    fields
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN))
}

fn apply_mod(fields: &mut EventFields, one_mod: &Mod) {
    match one_mod {
        Mod::Title(title) => fields.title = title.clone(),
        Mod::Start(ts) => fields.start_time = *ts,
        Mod::End(ts) => fields.end_time = *ts,
        Mod::AllDay(flag) => fields.all_day = *flag,
        Mod::Location(location) => fields.location = location.clone(),
        Mod::Description(description) => fields.description = description.clone(),
        Mod::Color(color) => fields.color = color.clone(),
        Mod::Recurrence(recurrence) => fields.recurrence = recurrence.clone(),
    }
}

/// Patch for `modify`. Moving only the start keeps the event's duration.
fn build_patch(existing: &EventFields, mods: &[Mod]) -> EventPatch {
    let mut patch = EventPatch::default();
    for one_mod in mods {
        match one_mod {
            Mod::Title(title) => patch.title = Some(title.clone()),
            Mod::Start(ts) => patch.start_time = Some(*ts),
            Mod::End(ts) => patch.end_time = Some(*ts),
            Mod::AllDay(flag) => patch.all_day = Some(*flag),
            Mod::Location(location) => patch.location = Some(location.clone()),
            Mod::Description(description) => patch.description = Some(description.clone()),
            Mod::Color(color) => patch.color = Some(color.clone()),
            Mod::Recurrence(recurrence) => patch.recurrence = Some(recurrence.clone()),
        }
    }

    if let (Some(start), None) = (patch.start_time, patch.end_time) {
        patch.end_time = Some(
            start
                .checked_add_signed(existing.duration())
                .unwrap_or(start),
        );
    }

    patch
}


#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .and_then(|date| date.and_hms_opt(h, m, 0))
            .expect("valid timestamp")
    }

    fn words(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn abbreviations_must_be_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("mo", &known), None);
        assert_eq!(expand_command_abbrev("mon", &known), Some("month"));
        assert_eq!(expand_command_abbrev("del", &known), Some("delete"));
        assert_eq!(expand_command_abbrev("d", &known), None);
        assert_eq!(expand_command_abbrev("day", &known), Some("day"));
    }

    #[test]
    fn add_defaults_to_next_whole_hour() {
        let now = at(5, 8, 15);
        let (title, mods) =
            parse_title_and_mods(&words(&["Team", "lunch", "loc:Cafe"]), now).expect("parse");
        let fields = build_new_event(title, &mods, now, "#188038");

        assert_eq!(fields.title, "Team lunch");
        assert_eq!(fields.location, "Cafe");
        assert_eq!(fields.start_time, at(5, 9, 0));
        assert_eq!(fields.end_time, at(5, 10, 0));
        assert_eq!(fields.color, "#188038");
    }

    #[test]
    fn late_evening_add_starts_tomorrow_at_midnight() {
        let now = at(5, 23, 30);
        let (title, mods) = parse_title_and_mods(&words(&["Night", "shift"]), now).expect("parse");
        let fields = build_new_event(title, &mods, now, DEFAULT_EVENT_COLOR);
        assert_eq!(fields.start_time, at(6, 0, 0));
        assert_eq!(fields.end_time, at(6, 1, 0));
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn add_with_start_lasts_an_hour_unless_end_given() {
        let now = at(5, 8, 0);
        let (title, mods) = parse_title_and_mods(
            &words(&["Review", "start:2024-03-06T09:30", "color:red"]),
            now,
        )
        .expect("parse");
        let fields = build_new_event(title, &mods, now, DEFAULT_EVENT_COLOR);
        assert_eq!(fields.start_time, at(6, 9, 30));
        assert_eq!(fields.end_time, at(6, 10, 30));
        assert_eq!(fields.color, "#d93025");

        let (title, mods) =
            parse_title_and_mods(&words(&["Call", "start=9am", "end:11am"]), now).expect("parse");
        let fields = build_new_event(title, &mods, now, DEFAULT_EVENT_COLOR);
        assert_eq!(fields.start_time, at(5, 9, 0));
        assert_eq!(fields.end_time, at(5, 11, 0));
    }

    #[test]
    fn all_day_add_with_a_date_covers_the_day() {
        let now = at(5, 8, 0);
        let (title, mods) =
            parse_title_and_mods(&words(&["Holiday", "allday:yes", "start:2024-03-08"]), now)
                .expect("parse");
        let fields = build_new_event(title, &mods, now, DEFAULT_EVENT_COLOR);
        assert!(fields.all_day);
        assert_eq!(fields.start_time, at(8, 0, 0));
        assert_eq!(fields.end_time, at(8, 23, 59));

        let (title, mods) = parse_title_and_mods(
            &words(&["Countdown", "allday:yes", "start:2024-03-08T23:59"]),
            now,
        )
        .expect("parse");
        let fields = build_new_event(title, &mods, now, DEFAULT_EVENT_COLOR);
        assert_eq!(fields.start_time, at(8, 23, 59));
        assert_eq!(fields.end_time, at(9, 0, 0));
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn title_words_with_colons_are_kept() {
        let now = at(5, 8, 0);
        let (title, mods) =
            parse_title_and_mods(&words(&["Re:", "budget", "--", "desc:literal"]), now)
                .expect("parse");
        assert_eq!(title, "Re: budget desc:literal");
        assert!(mods.is_empty());
        assert!(parse_title_and_mods(&words(&["loc:Home"]), now).is_err());
        assert!(parse_one_mod("allday:maybe", now).is_err());
    }

    #[test]
    fn modify_moving_start_keeps_duration_and_rrule_clears() {
        let existing = EventFields::new("Sync", at(5, 10, 0), at(5, 10, 45));
        let mods = vec![Mod::Start(at(7, 15, 0)), Mod::Recurrence(Recurrence::parse(""))];
        let patch = build_patch(&existing, &mods);
        assert_eq!(patch.start_time, Some(at(7, 15, 0)));
        assert_eq!(patch.end_time, Some(at(7, 15, 45)));
        assert_eq!(patch.recurrence, Some(Recurrence::None));
        assert!(build_patch(&existing, &[]).is_empty());
    }

    #[test]
    fn id_prefixes_resolve_uniquely() {
        let mut first = StoredEvent::new(EventFields::new("a", at(5, 9, 0), at(5, 10, 0)), Utc::now());
        first.id = Uuid::parse_str("aaaa1111-0000-4000-8000-000000000000").expect("uuid");
        let mut second = first.clone();
        second.id = Uuid::parse_str("aaaa2222-0000-4000-8000-000000000000").expect("uuid");
        let events = vec![CalendarEvent::from(first.clone()), CalendarEvent::from(second)];

        assert_eq!(find_by_prefix(&events, "AAAA1").expect("unique").id, first.id);
        assert!(find_by_prefix(&events, "aaaa").is_err());
        assert!(find_by_prefix(&events, "bbbb").is_err());
        assert!(find_by_prefix(&events, " ").is_err());
    }

    #[test]
    fn view_args_accept_date_and_offset() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).expect("date");
        assert_eq!(parse_view_args(&[], today).expect("args"), (today, 0));

        let (focus, step) = parse_view_args(&words(&["2024-12-25", "-2"]), today).expect("args");
        assert_eq!(focus, NaiveDate::from_ymd_opt(2024, 12, 25).expect("date"));
        assert_eq!(step, -2);

        assert_eq!(parse_step("+3"), Some(3));
        assert_eq!(parse_step("+3d"), None);
        assert!(parse_view_args(&words(&["someday"]), today).is_err());
    }

    #[test]
    fn import_accepts_arrays_and_json_lines() {
        let array = r#"[{"title":"A","start_time":"2024-03-05T09:00:00","end_time":"2024-03-05T10:00:00"}]"#;
        let items = parse_import_items(array).expect("array");
        assert_eq!(items.len(), 1);
        assert!(items[0].id.is_none());
        assert_eq!(items[0].fields.color, DEFAULT_EVENT_COLOR);

        let lines = concat!(
            r#"{"id":"aaaa1111-0000-4000-8000-000000000000","title":"A","start_time":"2024-03-05T09:00:00","end_time":"2024-03-05T10:00:00","created_at":"2024-03-01T00:00:00Z"}"#,
            "\n\n",
            r#"{"title":"B","start_time":"2024-03-06T09:00:00","end_time":"2024-03-06T10:00:00","recurrence_rule":"FREQ=WEEKLY"}"#,
        );
        let items = parse_import_items(lines).expect("jsonl");
        assert_eq!(items.len(), 2);
        assert!(items[0].id.is_some());
        assert_eq!(
            items[1].fields.recurrence.rule().map(|rule| rule.as_str()),
            Some("FREQ=WEEKLY")
        );

        assert_eq!(validate_import_items(items).expect("valid records").len(), 2);

        let mixed = concat!(
            r#"{"title":"Kept","start_time":"2024-03-05T09:00:00","end_time":"2024-03-05T10:00:00"}"#,
            "\n",
            r#"{"title":"  ","start_time":"2024-03-06T09:00:00","end_time":"2024-03-06T10:00:00"}"#,
        );
        let items = parse_import_items(mixed).expect("jsonl");
        let err = validate_import_items(items).expect_err("second record has no title");
        assert!(format!("{err:#}").contains("import record 2"));

        let err = parse_import_items("{\"title\":\"A\"}\nnot json").expect_err("bad line");
        assert!(format!("{err:#}").contains("import line 1"));
        assert!(parse_import_items("").is_err());
    }
}
