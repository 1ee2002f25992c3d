use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  TimeZone,
  Weekday
};
use tracing::debug;

use crate::task::Task;

pub const GRID_CELLS: usize = 42;

pub const WEEKDAY_LABELS: [&str; 7] = [
  "Sun", "Mon", "Tue", "Wed", "Thu",
  "Fri", "Sat"
];

const MONTH_NAMES: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December"
];

/// A displayed calendar month. `month` is 1..=12.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct YearMonth {
  pub year:  i32,
  pub month: u32
}

impl YearMonth {
  pub fn new(
    year: i32,
    month: u32
  ) -> anyhow::Result<Self> {
    if !(1..=12).contains(&month) {
      return Err(anyhow::anyhow!(
        "month out of range: {month}"
      ));
    }
    Ok(Self {
      year,
      month
    })
  }

  pub fn of(date: NaiveDate) -> Self {
    Self {
      year:  date.year(),
      month: date.month()
    }
  }

  pub fn next(self) -> Self {
    if self.month >= 12 {
      Self {
        year:  self
          .year
          .saturating_add(1),
        month: 1
      }
    } else {
      Self {
        year:  self.year,
        month: self.month + 1
      }
    }
  }

  pub fn previous(self) -> Self {
    if self.month <= 1 {
      Self {
        year:  self
          .year
          .saturating_sub(1),
        month: 12
      }
    } else {
      Self {
        year:  self.year,
        month: self.month - 1
      }
    }
  }

  pub fn first_day(self) -> NaiveDate {
    NaiveDate::from_ymd_opt(
      self.year, self.month, 1
    )
    .unwrap_or(NaiveDate::MIN)
  }

  pub fn name(self) -> &'static str {
    MONTH_NAMES
      [(self.month.clamp(1, 12) - 1)
        as usize]
  }

  pub fn title(self) -> String {
    format!(
      "{} {}",
      self.name(),
      self.year
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub struct DayStats {
  pub completed: usize,
  pub total:     usize
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DayStatus {
  None,
  AllDone,
  InProgress,
  Pending
}

impl DayStats {
  pub fn status(self) -> DayStatus {
    if self.total == 0 {
      DayStatus::None
    } else if self.completed
      >= self.total
    {
      DayStatus::AllDone
    } else if self.completed > 0 {
      DayStatus::InProgress
    } else {
      DayStatus::Pending
    }
  }
}

fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

/// Six full Sunday-first weeks covering `ym`.
pub fn month_grid(
  ym: YearMonth
) -> Vec<NaiveDate> {
  let start = start_of_week(
    ym.first_day(),
    Weekday::Sun
  );
  let grid: Vec<NaiveDate> = start
    .iter_days()
    .take(GRID_CELLS)
    .collect();
  debug!(
    year = ym.year,
    month = ym.month,
    first = %start,
    "built month grid"
  );
  grid
}

/// Tasks created on `date` as seen from `tz`, in store order.
pub fn tasks_on_date<'a, Tz>(
  tasks: &'a [Task],
  date: NaiveDate,
  tz: &Tz
) -> Vec<&'a Task>
where
  Tz: TimeZone
{
  tasks
    .iter()
    .filter(|task| {
      task.created_on(tz) == date
    })
    .collect()
}

pub fn has_tasks<Tz: TimeZone>(
  tasks: &[Task],
  date: NaiveDate,
  tz: &Tz
) -> bool {
  tasks.iter().any(|task| {
    task.created_on(tz) == date
  })
}

pub fn date_stats<Tz: TimeZone>(
  tasks: &[Task],
  date: NaiveDate,
  tz: &Tz
) -> DayStats {
  let on_day =
    tasks_on_date(tasks, date, tz);
  DayStats {
    completed: on_day
      .iter()
      .filter(|t| t.completed)
      .count(),
    total:     on_day.len()
  }
}

pub fn status_for_date<Tz: TimeZone>(
  tasks: &[Task],
  date: NaiveDate,
  tz: &Tz
) -> DayStatus {
  date_stats(tasks, date, tz).status()
}

pub fn is_today(
  date: NaiveDate,
  today: NaiveDate
) -> bool {
  date == today
}

pub fn is_same_month(
  date: NaiveDate,
  ym: YearMonth
) -> bool {
  YearMonth::of(date) == ym
}

/// One rendered grid cell.
#[derive(Debug, Clone, Copy)]
pub struct DayCell {
  pub date:     NaiveDate,
  pub stats:    DayStats,
  pub in_month: bool,
  pub today:    bool,
  pub selected: bool
}

impl DayCell {
  pub fn status(&self) -> DayStatus {
    self.stats.status()
  }
}

/// Displayed month plus the optional selected day.
#[derive(Debug, Clone)]
pub struct CalendarState {
  cursor:   YearMonth,
  selected: Option<NaiveDate>
}

impl CalendarState {
  pub fn new(today: NaiveDate) -> Self {
    Self {
      cursor:   YearMonth::of(today),
      selected: None
    }
  }

  pub fn cursor(&self) -> YearMonth {
    self.cursor
  }

  pub fn selected(
    &self
  ) -> Option<NaiveDate> {
    self.selected
  }

  pub fn next_month(&mut self) {
    self.cursor = self.cursor.next();
  }

  pub fn previous_month(&mut self) {
    self.cursor =
      self.cursor.previous();
  }

  pub fn jump_to(
    &mut self,
    date: NaiveDate
  ) {
    self.cursor = YearMonth::of(date);
  }

  /// Selects `date` and returns the tasks created that day.
  pub fn select<'a, Tz: TimeZone>(
    &mut self,
    date: NaiveDate,
    tasks: &'a [Task],
    tz: &Tz
  ) -> Vec<&'a Task> {
    self.selected = Some(date);
    tasks_on_date(tasks, date, tz)
  }

  pub fn clear_selection(&mut self) {
    self.selected = None;
  }

  pub fn is_selected(
    &self,
    date: NaiveDate
  ) -> bool {
    self.selected == Some(date)
  }

  pub fn cells<Tz: TimeZone>(
    &self,
    tasks: &[Task],
    today: NaiveDate,
    tz: &Tz
  ) -> Vec<DayCell> {
    month_grid(self.cursor)
      .into_iter()
      .map(|date| DayCell {
        date,
        stats: date_stats(
          tasks, date, tz
        ),
        in_month: is_same_month(
          date,
          self.cursor
        ),
        today: is_today(date, today),
        selected: self
          .is_selected(date)
      })
      .collect()
  }
}
