//! Date grids for the month and week views.
//!
//! Every function here is a pure function of its arguments. Nothing reads
//! the clock, so the same inputs always produce the same grid.

use chrono::{
  Datelike,
  Duration,
  Month,
  NaiveDate,
  Weekday
};

/// Cells in a month page: six rows of seven days.
pub const MONTH_GRID_CELLS: usize = 42;
pub const WEEK_DAYS: usize = 7;
pub const DEFAULT_WEEK_START: Weekday =
  Weekday::Sun;

pub type MonthGrid =
  [NaiveDate; MONTH_GRID_CELLS];
pub type WeekGrid = [NaiveDate; WEEK_DAYS];

/// Builds the 42-day page for `month` of `year`.
///
/// The page opens with the tail of the previous month so that index 0 falls
/// on `week_start`, then lists the whole month, then pads with the head of
/// the next month. The length never depends on how many weeks the month
/// spans.
#[must_use]
pub fn month_grid(
  year: i32,
  month: Month,
  week_start: Weekday
) -> MonthGrid {
  grid_from_first_day(
    first_day_of_month(
      year,
      month.number_from_month()
    ),
    week_start
  )
}

/// Same page as [`month_grid`] for the month that contains `focus`.
#[must_use]
pub fn month_grid_containing(
  focus: NaiveDate,
  week_start: Weekday
) -> MonthGrid {
  grid_from_first_day(
    first_day_of_month(
      focus.year(),
      focus.month()
    ),
    week_start
  )
}

fn grid_from_first_day(
  first: NaiveDate,
  week_start: Weekday
) -> MonthGrid {
  let leading = i64::from(
    weekday_index(first, week_start)
  );
  let grid_start =
    add_days(first, -leading);
  std::array::from_fn(|offset| {
    add_days(grid_start, offset as i64)
  })
}

/// The seven days of the week that contains `reference`.
#[must_use]
pub fn week_grid(
  reference: NaiveDate,
  week_start: Weekday
) -> WeekGrid {
  let start =
    start_of_week(reference, week_start);
  std::array::from_fn(|offset| {
    add_days(start, offset as i64)
  })
}

/// Position of `date` inside its week, 0 being `week_start`.
#[must_use]
pub fn weekday_index(
  date: NaiveDate,
  week_start: Weekday
) -> u32 {
  let day_idx = date
    .weekday()
    .num_days_from_monday();
  let start_idx =
    week_start.num_days_from_monday();
  (7 + day_idx - start_idx) % 7
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    day,
    -i64::from(weekday_index(
      day, week_start
    ))
  )
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

/// Calendar addition that stays put at the edges of the representable range.
#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

#[must_use]
pub fn is_in_month(
  date: NaiveDate,
  focus: NaiveDate
) -> bool {
  date.year() == focus.year()
    && date.month() == focus.month()
}

#[must_use]
pub fn weekday_labels(
  week_start: Weekday
) -> [&'static str; WEEK_DAYS] {
  let mut day = week_start;
  std::array::from_fn(|_| {
    let label = weekday_short(day);
    day = day.succ();
    label
  })
}

pub fn month_rows(
  grid: &MonthGrid
) -> impl Iterator<Item = &[NaiveDate]> {
  grid.chunks(WEEK_DAYS)
}

fn weekday_short(
  day: Weekday
) -> &'static str {
  match day {
    | Weekday::Mon => "Mon",
    | Weekday::Tue => "Tue",
    | Weekday::Wed => "Wed",
    | Weekday::Thu => "Thu",
    | Weekday::Fri => "Fri",
    | Weekday::Sat => "Sat",
    | Weekday::Sun => "Sun"
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    Month,
    NaiveDate,
    Weekday
  };

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn assert_consecutive(
    days: &[NaiveDate]
  ) {
    for pair in days.windows(2) {
      assert_eq!(
        pair[1]
          .signed_duration_since(pair[0])
          .num_days(),
        1,
        "gap between {} and {}",
        pair[0],
        pair[1]
      );
    }
  }

  #[test]
  fn month_grid_is_six_full_weeks() {
    for year in [1999, 2023, 2024, 2100]
    {
      for number in 1_u8..=12 {
        let month = Month::try_from(number)
          .expect("valid month");
        let grid = month_grid(
          year,
          month,
          Weekday::Sun
        );
        assert_eq!(grid.len(), 42);
        assert_eq!(
          weekday_index(
            grid[0],
            Weekday::Sun
          ),
          0
        );
        assert_consecutive(&grid);
        let first = date(
          year,
          u32::from(number),
          1
        );
        assert!(grid.contains(&first));
      }
    }
  }

  #[test]
  fn february_leap_and_common_years() {
    let leap = month_grid(
      2024,
      Month::February,
      Weekday::Sun
    );
    let common = month_grid(
      2023,
      Month::February,
      Weekday::Sun
    );

    assert_eq!(leap[0], date(2024, 1, 28));
    assert_eq!(leap[41], date(2024, 3, 9));
    assert_eq!(
      common[0],
      date(2023, 1, 29)
    );
    assert_eq!(
      common[41],
      date(2023, 3, 11)
    );

    let feb_days = |grid: &MonthGrid| {
      grid
        .iter()
        .filter(|d| d.month() == 2)
        .count()
    };
    assert_eq!(feb_days(&leap), 29);
    assert_eq!(feb_days(&common), 28);
  }

  #[test]
  fn month_grid_rolls_over_year_boundaries(
  ) {
    let december = month_grid(
      2024,
      Month::December,
      Weekday::Sun
    );
    assert_eq!(
      december[0],
      date(2024, 12, 1)
    );
    assert_eq!(
      december[41],
      date(2025, 1, 11)
    );

    let january = month_grid(
      2025,
      Month::January,
      Weekday::Sun
    );
    assert_eq!(
      january[0],
      date(2024, 12, 29)
    );
  }

  #[test]
  fn month_grid_honours_monday_start() {
    let grid = month_grid(
      2025,
      Month::January,
      Weekday::Mon
    );
    assert_eq!(grid[0], date(2024, 12, 30));
    assert_eq!(
      grid[0].weekday(),
      Weekday::Mon
    );
  }

  #[test]
  fn month_grid_is_deterministic() {
    let a = month_grid(
      2026,
      Month::July,
      Weekday::Sun
    );
    let b = month_grid(
      2026,
      Month::July,
      Weekday::Sun
    );
    assert_eq!(a, b);
    assert_eq!(
      a,
      month_grid_containing(
        date(2026, 7, 19),
        Weekday::Sun
      )
    );
  }

  #[test]
  fn week_grid_contains_reference() {
    let reference = date(2024, 3, 6);
    let week =
      week_grid(reference, Weekday::Sun);
    assert_eq!(week[0], date(2024, 3, 3));
    assert_eq!(week[6], date(2024, 3, 9));
    assert!(week.contains(&reference));
    assert_consecutive(&week);

    let monday =
      week_grid(reference, Weekday::Mon);
    assert_eq!(
      monday[0],
      date(2024, 3, 4)
    );
  }

  #[test]
  fn week_grid_crosses_month_end() {
    let week = week_grid(
      date(2025, 1, 1),
      Weekday::Sun
    );
    assert_eq!(
      week[0],
      date(2024, 12, 29)
    );
    assert_eq!(week[6], date(2025, 1, 4));
  }

  #[test]
  fn labels_rotate_with_week_start() {
    assert_eq!(
      weekday_labels(Weekday::Sun)[0],
      "Sun"
    );
    assert_eq!(
      weekday_labels(Weekday::Mon),
      [
        "Mon", "Tue", "Wed", "Thu", "Fri",
        "Sat", "Sun"
      ]
    );
  }

  #[test]
  fn month_lengths() {
    assert_eq!(days_in_month(2024, 2), 29);
    assert_eq!(days_in_month(2023, 2), 28);
    assert_eq!(days_in_month(2024, 12), 31);
    assert_eq!(
      last_day_of_month(2024, 12),
      date(2024, 12, 31)
    );
  }
}
