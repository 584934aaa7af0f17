use std::io::{self, IsTerminal, Write};
use std::ops::RangeInclusive;

use anyhow::anyhow;
use chrono::{NaiveDate, Weekday};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::datetime::{format_time, hour_label, is_today, time_slot_labels};
use crate::event::{CalendarEvent, EventFields};
use crate::grid::{is_in_month, month_grid_containing, month_rows, week_grid, weekday_labels};
use crate::layout::{ViewScale, layout};
use crate::matcher::{MatchMode, events_on};
use crate::state::{AppState, ViewType};

const MONTH_CELL_WIDTH: usize = 16;
const WEEK_CELL_WIDTH: usize = 14;
const HOUR_LABEL_WIDTH: usize = 6;
const SLOT_LABEL_WIDTH: usize = 8;
const CONTINUED: &str = "|";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    week_start: Weekday,
    max_events: usize,
    hours: RangeInclusive<u32>,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        let max_events = cfg.get_u32("month.max_events")?.unwrap_or(3) as usize;
        let (hour_start, hour_end) = cfg.hour_range()?;

        Ok(Self {
            color: color && io::stdout().is_terminal(),
            week_start: cfg.week_start(),
            max_events,
            hours: hour_start..=hour_end,
        })
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    #[tracing::instrument(skip(self, state))]
    pub fn print_view(&mut self, state: &AppState, today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        match state.view_type() {
            ViewType::Month => self.write_month(&mut out, state, today),
            ViewType::Week => self.write_week(&mut out, state, today),
            ViewType::Day => self.write_day(&mut out, state, today),
        }
    }

    pub fn write_month<W: Write>(
        &self,
        mut out: W,
        state: &AppState,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let focus = state.current_date();
        let grid = month_grid_containing(focus, self.week_start);

        writeln!(out, "{}", self.paint(&state.date_label(), "1"))?;
        let header = weekday_labels(self.week_start)
            .iter()
            .map(|label| fit(label, MONTH_CELL_WIDTH))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{}", header.trim_end())?;

        for week in month_rows(&grid) {
            let cells: Vec<Vec<String>> = week
                .iter()
                .map(|day| self.month_cell(*day, focus, today, state.events()))
                .collect();
            let height = cells.iter().map(Vec::len).max().unwrap_or(1);
            let blank = " ".repeat(MONTH_CELL_WIDTH);

            for line in 0..height {
                let row = cells
                    .iter()
                    .map(|cell| cell.get(line).map_or(blank.as_str(), String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(out, "{}", row.trim_end())?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    /// Lines of one month cell, each already padded to the cell width.
    fn month_cell(
        &self,
        day: NaiveDate,
        focus: NaiveDate,
        today: NaiveDate,
        events: &[CalendarEvent],
    ) -> Vec<String> {
        let number = if is_today(day, today) {
            format!("{}*", day.format("%-d"))
        } else {
            day.format("%-d").to_string()
        };
        let number = fit(&number, MONTH_CELL_WIDTH);
        let number = if is_today(day, today) {
            self.paint(&number, "1;34")
        } else if !is_in_month(day, focus) {
            self.paint(&number, "2")
        } else {
            number
        };

        let matching = events_on(events, day, MatchMode::Span);
        let mut lines = vec![number];
        for event in matching.iter().take(self.max_events) {
            let fields = event.fields();
            let text = fit(&month_event_line(fields), MONTH_CELL_WIDTH);
            lines.push(self.paint_event(&text, fields));
        }
        if matching.len() > self.max_events {
            let more = format!("+{} more", matching.len() - self.max_events);
            lines.push(self.paint(&fit(&more, MONTH_CELL_WIDTH), "2"));
        }
        lines
    }

    pub fn write_week<W: Write>(
        &self,
        mut out: W,
        state: &AppState,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let days = week_grid(state.current_date(), self.week_start);
        let labels = weekday_labels(self.week_start);

        writeln!(out, "{}", self.paint(&state.date_label(), "1"))?;

        let mut header = vec![" ".repeat(HOUR_LABEL_WIDTH)];
        for (day, label) in days.iter().zip(labels) {
            let text = fit(&format!("{label} {}", day.format("%-d")), WEEK_CELL_WIDTH);
            header.push(if is_today(*day, today) {
                self.paint(&text, "1;34")
            } else {
                text
            });
        }
        writeln!(out, "{}", header.join(" ").trim_end())?;

        let columns: Vec<Vec<&CalendarEvent>> = days
            .iter()
            .map(|day| events_on(state.events(), *day, MatchMode::StartDay))
            .collect();

        if columns.iter().flatten().any(|event| event.fields().all_day) {
            let mut row = vec![fit("all", HOUR_LABEL_WIDTH)];
            for column in &columns {
                let titles: Vec<&str> = column
                    .iter()
                    .filter(|event| event.fields().all_day)
                    .map(|event| event.fields().title.as_str())
                    .collect();
                row.push(fit(&titles.join(", "), WEEK_CELL_WIDTH));
            }
            writeln!(out, "{}", row.join(" ").trim_end())?;
        }

        for hour in self.hours.clone() {
            let mut row = vec![fit(&hour_label(hour), HOUR_LABEL_WIDTH)];
            for column in &columns {
                row.push(self.slot_cell(column, hour, ViewScale::WEEK, WEEK_CELL_WIDTH, false));
            }
            writeln!(out, "{}", row.join(" ").trim_end())?;
        }

        Ok(())
    }

    pub fn write_day<W: Write>(
        &self,
        mut out: W,
        state: &AppState,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let day = state.current_date();
        let heading = if is_today(day, today) {
            format!("{} (today)", state.date_label())
        } else {
            state.date_label()
        };
        writeln!(out, "{}", self.paint(&heading, "1"))?;

        let events = events_on(state.events(), day, MatchMode::StartDay);
        for event in events.iter().filter(|event| event.fields().all_day) {
            let fields = event.fields();
            let line = format!("{} {}", fit("all day", SLOT_LABEL_WIDTH), detail_line(fields));
            writeln!(out, "{}", line.trim_end())?;
        }

        let slots = time_slot_labels();
        for hour in self.hours.clone() {
            let label = slots.get(hour as usize).map_or("", String::as_str);
            let label = fit(label, SLOT_LABEL_WIDTH);
            let cell = self.slot_cell(&events, hour, ViewScale::DAY, 0, true);
            writeln!(out, "{}", format!("{label} {cell}").trim_end())?;
        }

        Ok(())
    }

    /// Text for one hour row of a time grid column.
    ///
    /// An event is named in the first visible row it covers, which is its
    /// start row unless it begins above `view.hour.start`; later rows get a
    /// continuation mark. A `width` of zero leaves the text unpadded.
    fn slot_cell(
        &self,
        events: &[&CalendarEvent],
        hour: u32,
        scale: ViewScale,
        width: usize,
        detailed: bool,
    ) -> String {
        let hour = i64::from(hour);
        let first_visible = i64::from(*self.hours.start());
        let mut starting = Vec::new();
        let mut covered = None;

        for event in events.iter().filter(|event| !event.fields().all_day) {
            let fields = event.fields();
            let placed = scale.apply(layout(fields.start_time, fields.end_time, 0.0));
            let rows = placed.rows(scale.hour_height);
            if rows.contains(&hour) && rows.start.max(first_visible) == hour {
                starting.push(fields);
            } else if rows.contains(&hour) && covered.is_none() {
                covered = Some(fields);
            }
        }

        if let Some(first) = starting.first() {
            let text = if detailed {
                starting
                    .iter()
                    .map(|fields| detail_line(fields))
                    .collect::<Vec<_>>()
                    .join("; ")
            } else {
                starting
                    .iter()
                    .map(|fields| fields.title.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let text = if width == 0 { text } else { fit(&text, width) };
            return self.paint_event(&text, first);
        }

        if let Some(fields) = covered {
            let text = if width == 0 {
                CONTINUED.to_string()
            } else {
                fit(CONTINUED, width)
            };
            return self.paint_event(&text, fields);
        }

        if width == 0 {
            String::new()
        } else {
            " ".repeat(width)
        }
    }

    #[tracing::instrument(skip(self, events))]
    pub fn print_event_table(&mut self, events: &[CalendarEvent]) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_event_table(out, events)
    }

    pub fn write_event_table<W: Write>(
        &self,
        out: W,
        events: &[CalendarEvent],
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Date".to_string(),
            "Time".to_string(),
            "Title".to_string(),
            "Location".to_string(),
            "Repeat".to_string(),
        ];

        let mut rows = Vec::with_capacity(events.len());
        for event in events {
            let fields = event.fields();
            let id = event
                .id()
                .map(|id| short_id(&id.to_string()))
                .unwrap_or_else(|| "-".to_string());
            let rule = fields
                .recurrence
                .rule()
                .map(|rule| rule.as_str().to_string())
                .unwrap_or_default();

            rows.push(vec![
                self.paint(&id, "33"),
                fields.start_time.format("%Y-%m-%d").to_string(),
                time_range(fields),
                self.paint_event(&fields.title, fields),
                fields.location.clone(),
                rule,
            ]);
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, event))]
    pub fn print_event_info(&mut self, event: &CalendarEvent) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_event_info(out, event)
    }

    pub fn write_event_info<W: Write>(&self, mut out: W, event: &CalendarEvent) -> anyhow::Result<()> {
        let fields = event.fields();

        match event {
            CalendarEvent::Persisted(stored) => {
                writeln!(out, "id          {}", stored.id)?;
            }
            CalendarEvent::Draft(_) => {
                writeln!(out, "id          (draft)")?;
            }
        }
        writeln!(out, "title       {}", fields.title)?;
        writeln!(out, "start       {}", fields.start_time.format("%Y-%m-%d %H:%M"))?;
        writeln!(out, "end         {}", fields.end_time.format("%Y-%m-%d %H:%M"))?;
        writeln!(out, "all day     {}", if fields.all_day { "yes" } else { "no" })?;
        if !fields.location.is_empty() {
            writeln!(out, "location    {}", fields.location)?;
        }
        if !fields.description.is_empty() {
            writeln!(out, "description {}", fields.description)?;
        }
        writeln!(out, "color       {}", fields.color)?;
        if let Some(rule) = fields.recurrence.rule() {
            writeln!(out, "repeat      {}", rule.as_str())?;
        }
        if let CalendarEvent::Persisted(stored) = event {
            writeln!(out, "created     {}", stored.created_at.format("%Y%m%dT%H%M%SZ"))?;
            writeln!(out, "modified    {}", stored.updated_at.format("%Y%m%dT%H%M%SZ"))?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    /// Paints with the event's `#rrggbb` color as a 24-bit foreground.
    fn paint_event(&self, text: &str, fields: &EventFields) -> String {
        match hex_rgb(&fields.color) {
            Some((r, g, b)) => self.paint(text, &format!("38;2;{r};{g};{b}")),
            None => text.to_string(),
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn month_event_line(fields: &EventFields) -> String {
    if fields.all_day {
        fields.title.clone()
    } else {
        format!("{} {}", format_time(fields.start_time), fields.title)
    }
}

fn time_range(fields: &EventFields) -> String {
    if fields.all_day {
        "all day".to_string()
    } else {
        format!(
            "{} - {}",
            format_time(fields.start_time),
            format_time(fields.end_time)
        )
    }
}

fn detail_line(fields: &EventFields) -> String {
    let mut line = format!("{} ({})", fields.title, time_range(fields));
    if !fields.location.is_empty() {
        line.push_str(" @ ");
        line.push_str(&fields.location);
    }
    line
}

fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Truncates to `width` display columns and pads with spaces up to it.
fn fit(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push_str(&" ".repeat(width - used));
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDateTime, Utc};

    use super::*;
    use crate::event::StoredEvent;

    fn plain_renderer() -> Renderer {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        Renderer::new(&cfg).expect("renderer")
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .and_then(|date| date.and_hms_opt(h, m, 0))
            .expect("valid timestamp")
    }

    fn stored(title: &str, start: NaiveDateTime, end: NaiveDateTime) -> CalendarEvent {
        StoredEvent::new(EventFields::new(title, start, end), Utc::now()).into()
    }

    fn state_with(view: ViewType, events: Vec<CalendarEvent>) -> AppState {
        let mut state = AppState::new(NaiveDate::from_ymd_opt(2024, 3, 5).expect("date"));
        state.set_view_type(view);
        state.set_events(events);
        state
    }

    fn render(view: ViewType, events: Vec<CalendarEvent>) -> String {
        let renderer = plain_renderer();
        let state = state_with(view, events);
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).expect("date");
        let mut buf = Vec::new();
        match view {
            ViewType::Month => renderer.write_month(&mut buf, &state, today),
            ViewType::Week => renderer.write_week(&mut buf, &state, today),
            ViewType::Day => renderer.write_day(&mut buf, &state, today),
        }
        .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn month_view_caps_events_per_day() {
        let events = (0..5)
            .map(|idx| stored(&format!("E{idx}"), at(5, 9 + idx, 0), at(5, 10 + idx, 0)))
            .collect();
        let text = render(ViewType::Month, events);

        assert!(text.starts_with("March 2024\n"));
        assert!(text.contains("5*"));
        assert!(text.contains("9:00 AM E0"));
        assert!(text.contains("11:00 AM E2"));
        assert!(!text.contains("E3"));
        assert!(text.contains("+2 more"));
    }

    #[test]
    fn month_view_has_six_week_rows() {
        let text = render(ViewType::Month, Vec::new());
        let lines: Vec<&str> = text.lines().collect();
        // label, weekday header, then a number line and a spacer per week
        assert_eq!(lines.len(), 2 + 6 * 2);
        assert!(lines[1].starts_with("Sun"));
        assert!(lines[2].starts_with("25"));
    }

    #[test]
    fn week_view_marks_covered_hours() {
        let text = render(ViewType::Week, vec![stored("Review", at(6, 10, 30), at(6, 12, 15))]);
        let row = |label: &str| {
            text.lines()
                .find(|line| line.starts_with(label))
                .map(str::to_string)
                .expect("hour row")
        };

        assert!(row("10 AM").contains("Review"));
        assert!(row("11 AM").contains(CONTINUED));
        assert!(row("12 PM").contains(CONTINUED));
        assert!(!row("1 PM").contains(CONTINUED));
        assert!(text.contains("Wed 6"));
    }

    #[test]
    fn event_starting_above_visible_hours_is_named_in_first_row() {
        let mut cfg = Config::default();
        cfg.apply_overrides([
            ("color".to_string(), "off".to_string()),
            ("view.hour.start".to_string(), "8".to_string()),
        ]);
        let renderer = Renderer::new(&cfg).expect("renderer");
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).expect("date");
        let state = state_with(ViewType::Day, vec![stored("Early shift", at(5, 6, 0), at(5, 10, 0))]);

        let mut buf = Vec::new();
        renderer.write_day(&mut buf, &state, today).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[1].starts_with("8:00 AM"));
        assert!(lines[1].contains("Early shift"));
        assert!(lines[2].starts_with("9:00 AM"));
        assert!(lines[2].ends_with(CONTINUED));
        assert!(!lines[3].contains(CONTINUED));
    }

    #[test]
    fn day_view_shows_time_range_and_location() {
        let mut event = EventFields::new("Dentist", at(5, 14, 0), at(5, 15, 0));
        event.location = "Main St".to_string();
        let event = StoredEvent::new(event, Utc::now()).into();
        let text = render(ViewType::Day, vec![event]);

        assert!(text.starts_with("March 5, 2024 (today)\n"));
        assert!(text.contains("2:00 PM  Dentist (2:00 PM - 3:00 PM) @ Main St"));
    }

    #[test]
    fn table_pads_by_visible_width() {
        let renderer = plain_renderer();
        let mut buf = Vec::new();
        renderer
            .write_event_table(&mut buf, &[stored("Café", at(5, 9, 0), at(5, 10, 0))])
            .expect("table");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.lines().next().expect("header").starts_with("ID "));
        assert!(text.contains("9:00 AM - 10:00 AM"));
        assert_eq!(strip_ansi("\x1b[33mabc\x1b[0m"), "abc");
        assert_eq!(fit("abcdef", 3), "abc");
        assert_eq!(fit("ab", 4), "ab  ");
    }
}
