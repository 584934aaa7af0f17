//! Parsing and formatting of wall-clock timestamps.
//!
//! Every value here is a naive local time. Nothing is converted between
//! timezones; an RFC3339 offset, when present, is dropped and the written
//! wall-clock time kept.

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Months,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Weekday
};
use regex::Regex;

pub use crate::grid::add_days;

const TIMESTAMP_FORMATS: [&str; 5] = [
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y%m%dT%H%M%S"
];

#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();
  if let Some(parsed) =
    parse_single_expr(token, now)?
  {
    return Ok(parsed);
  }

  // "<day> <clock>", e.g. "tomorrow 3pm" or "2024-03-05 9:30am"
  if let Some((day_part, clock_part)) =
    token.rsplit_once(char::is_whitespace)
    && let Some(time) =
      parse_clock_time(clock_part)
    && let Some(day) = parse_single_expr(
      day_part.trim(),
      now
    )?
  {
    return Ok(day.date().and_time(time));
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     4-digit year, weekday names (e.g. \
     monday), month names (e.g. \
     march), clock times (e.g. 3:23pm \
     or 15:23), +Nd/+Nw/+Nh/+Nm, \
     RFC3339, YYYY-MM-DD, \
     YYYY-MM-DDTHH:MM[:SS], \
     YYYY-MM-DD HH:MM[:SS], \
     YYYYMMDDTHHMMSS, and any day \
     followed by a clock time"
  })
}

/// Date part of [`parse_date_expr`].
pub fn parse_date(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  parse_date_expr(
    input,
    today.and_time(NaiveTime::MIN)
  )
  .map(|ts| ts.date())
}

fn parse_single_expr(
  token: &str,
  now: NaiveDateTime
) -> anyhow::Result<Option<NaiveDateTime>>
{
  let lower =
    token.to_ascii_lowercase();
  let today = now.date();

  match lower.as_str() {
    | "now" => return Ok(Some(now)),
    | "today" => {
      return Ok(Some(midnight(today)));
    }
    | "tomorrow" => {
      return Ok(Some(midnight(
        add_days(today, 1)
      )));
    }
    | "yesterday" => {
      return Ok(Some(midnight(
        add_days(today, -1)
      )));
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().context(
        "invalid 4-digit year"
      )?;
    let date = NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year value: {year}"
      )
    })?;
    return Ok(Some(midnight(date)));
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(Some(midnight(
      next_weekday_date(
        today,
        target_weekday
      )
    )));
  }

  if let Some(time) =
    parse_clock_time(token)
  {
    return Ok(Some(today.and_time(time)));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    let mut year = today.year();
    if target_month < today.month() {
      year = year.saturating_add(1);
    }
    let date = NaiveDate::from_ymd_opt(
      year,
      target_month,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month/year \
         candidate"
      )
    })?;
    return Ok(Some(midnight(date)));
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[wdhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "w" => Duration::weeks(num),
      | "d" => Duration::days(num),
      | "h" => Duration::hours(num),
      | "m" => Duration::minutes(num),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ))
      }
    };

    let shifted = if sign == "-" {
      now.checked_sub_signed(duration)
    } else {
      now.checked_add_signed(duration)
    };
    return shifted.map(Some).ok_or_else(
      || {
        anyhow!(
          "relative offset out of \
           range: {token}"
        )
      }
    );
  }

  for fmt in TIMESTAMP_FORMATS {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(Some(ndt));
    }
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(Some(dt.naive_local()));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(Some(midnight(date)));
  }

  Ok(None)
}

/// Parses a wall-clock time such as `3:00 PM`, `9am` or `15:30`.
pub fn parse_time_string(
  input: &str
) -> anyhow::Result<NaiveTime> {
  parse_clock_time(input).ok_or_else(
    || {
      anyhow!(
        "invalid clock time: {input}"
      )
    }
  )
}

fn parse_clock_time(
  token: &str
) -> Option<NaiveTime> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = match captures
    .name("minute")
  {
    | Some(raw) => {
      raw.as_str().parse::<u32>().ok()?
    }
    | None => {
      // a bare number is a year or a day, not a time
      captures.name("ampm")?;
      0
    }
  };
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// `week.start` values: `sunday`/`monday` and their short forms.
pub fn parse_week_start(
  raw: &str
) -> Option<Weekday> {
  match parse_weekday_name(
    &raw.trim().to_ascii_lowercase()
  ) {
    | Some(
      day @ (Weekday::Sun | Weekday::Mon)
    ) => Some(day),
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

fn midnight(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(NaiveTime::MIN)
}

pub fn add_weeks(
  date: NaiveDate,
  weeks: i64
) -> NaiveDate {
  add_days(date, weeks.saturating_mul(7))
}

/// Moves by whole months, clamping the day to the target month's length
/// (Jan 31 + 1 month is the last day of February).
pub fn add_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let shifted = if months >= 0 {
    date.checked_add_months(Months::new(
      months.unsigned_abs()
    ))
  } else {
    date.checked_sub_months(Months::new(
      months.unsigned_abs()
    ))
  };
  shifted.unwrap_or(date)
}

#[must_use]
pub fn is_today(
  date: NaiveDate,
  today: NaiveDate
) -> bool {
  date == today
}

/// `3:05 PM`
pub fn format_time(
  ts: NaiveDateTime
) -> String {
  ts.format("%-I:%M %p").to_string()
}

/// `March 5, 2024`
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format("%B %-d, %Y").to_string()
}

/// `March 2024`
pub fn format_month_year(
  date: NaiveDate
) -> String {
  date.format("%B %Y").to_string()
}

/// Row label of a time grid: `12 AM`, `1 AM`, ..., `11 PM`.
pub fn hour_label(hour: u32) -> String {
  let display = match hour % 12 {
    | 0 => 12,
    | h => h
  };
  let period =
    if hour % 24 < 12 { "AM" } else { "PM" };
  format!("{display} {period}")
}

/// The 24 slot labels offered by the event editor: `12:00 AM` .. `11:00 PM`.
pub fn time_slot_labels() -> Vec<String> {
  (0..24)
    .map(|hour| {
      let display = match hour % 12 {
        | 0 => 12,
        | h => h
      };
      let period =
        if hour < 12 { "AM" } else { "PM" };
      format!("{display}:00 {period}")
    })
    .collect()
}
