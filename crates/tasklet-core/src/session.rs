use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::{debug, info, instrument};

use crate::calendar::{self, CalendarState, DayCell, DayStats};
use crate::filter::{self, SearchQuery, StatusFilter, ViewSummary};
use crate::preferences::{KeyValueStore, Theme, ThemeStore};
use crate::store::{Change, EditDraft, TaskStore};
use crate::task::{Task, TaskId};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "done", "star", "edit", "save", "cancel", "delete", "filter", "search", "clear",
        "list", "stats", "calendar", "day", "theme", "export", "help", "quit",
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarAction {
    Toggle,
    Show,
    Hide,
    Next,
    Previous,
    Today,
}

impl std::str::FromStr for CalendarAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Self::Toggle),
            "show" | "open" => Ok(Self::Show),
            "hide" | "close" => Ok(Self::Hide),
            "next" | ">" => Ok(Self::Next),
            "prev" | "previous" | "<" => Ok(Self::Previous),
            "today" => Ok(Self::Today),
            other => Err(anyhow!(
                "unknown calendar action '{other}'; expected next, prev, today, show or hide"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    ToggleDone(TaskId),
    ToggleImportant(TaskId),
    Edit { id: TaskId, text: Option<String> },
    Save(String),
    Cancel,
    Delete(TaskId),
    Filter(StatusFilter),
    Search(String),
    ClearSearch,
    List,
    Stats,
    Calendar(CalendarAction),
    Day(NaiveDate),
    Theme,
    Export,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines and `#` comments yield `None`.
    #[instrument]
    pub fn parse(input: &str) -> anyhow::Result<Option<Self>> {
        let input = input.trim_end_matches(['\r', '\n']);
        let line = input.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map(|(verb, rest)| (verb, rest.trim()))
            .unwrap_or((line, ""));
        let lowered = verb.to_ascii_lowercase();
        let known = known_command_names();
        let command = match lowered.as_str() {
            "exit" => "quit",
            other => expand_command_abbrev(other, &known)
                .ok_or_else(|| anyhow!("unknown or ambiguous command: {verb}"))?,
        };
        debug!(verb, expanded = command, "resolved command token");

        let parsed = match command {
            "add" => Self::Add(rest.to_string()),
            "done" => Self::ToggleDone(parse_id(rest)?),
            "star" => Self::ToggleImportant(parse_id(rest)?),
            "edit" => {
                let (id, text) = rest
                    .split_once(char::is_whitespace)
                    .map(|(id, text)| (id, Some(text.to_string())))
                    .unwrap_or((rest, None));
                Self::Edit {
                    id: parse_id(id)?,
                    text,
                }
            }
            "save" => Self::Save(rest.to_string()),
            "cancel" => Self::Cancel,
            "delete" => Self::Delete(parse_id(rest)?),
            "filter" => Self::Filter(rest.parse()?),
            "search" => {
                let query = raw_argument(input);
                if query.trim().is_empty() {
                    Self::ClearSearch
                } else {
                    Self::Search(query.to_string())
                }
            }
            "clear" => Self::ClearSearch,
            "list" => Self::List,
            "stats" => Self::Stats,
            "calendar" => Self::Calendar(rest.parse()?),
            "day" => Self::Day(
                NaiveDate::parse_from_str(rest, "%Y-%m-%d")
                    .with_context(|| format!("expected a date as YYYY-MM-DD, got: {rest}"))?,
            ),
            "theme" => Self::Theme,
            "export" => Self::Export,
            "help" => Self::Help,
            "quit" => Self::Quit,
            other => return Err(anyhow!("command not handled: {other}")),
        };
        Ok(Some(parsed))
    }
}

/// Text after the verb and its single separator, otherwise untouched.
fn raw_argument(input: &str) -> &str {
    input
        .trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest)
        .unwrap_or("")
}

fn parse_id(raw: &str) -> anyhow::Result<TaskId> {
    if raw.is_empty() {
        return Err(anyhow!("command requires a task id"));
    }
    raw.parse()
}

/// A listed task with its creation day in the session's calendar zone.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub task: Task,
    pub added: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct TaskView {
    pub rows: Vec<TaskRow>,
    pub filter: StatusFilter,
    pub query: String,
    pub summary: ViewSummary,
    pub active: usize,
    pub completed: usize,
    pub empty_hint: Option<String>,
    pub editing: Option<EditDraft>,
}

#[derive(Debug, Clone)]
pub struct CalendarView {
    pub title: String,
    pub cells: Vec<DayCell>,
}

#[derive(Debug, Clone)]
pub struct DayView {
    pub date: NaiveDate,
    pub stats: DayStats,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tasks: TaskView,
    pub calendar: Option<CalendarView>,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Refresh(Snapshot),
    Stats { active: usize, completed: usize, total: usize },
    Day(DayView),
    Editing(EditDraft),
    Theme(Theme),
    Export(String),
    Help,
    Quit,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub notice: Option<String>,
    pub outcome: Outcome,
}

/// Everything one running session owns. Commands mutate it and every
/// response carries a freshly derived view.
pub struct Session<Tz: TimeZone> {
    store: TaskStore,
    filter: StatusFilter,
    query: SearchQuery,
    calendar: CalendarState,
    show_calendar: bool,
    theme: ThemeStore<Box<dyn KeyValueStore>>,
    tz: Tz,
}

impl<Tz: TimeZone> Session<Tz> {
    pub fn new(
        store: TaskStore,
        preferences: Box<dyn KeyValueStore>,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        let theme = ThemeStore::load(preferences);
        info!(tasks = store.len(), theme = %theme.get(), "session started");
        Self {
            store,
            filter: StatusFilter::All,
            query: SearchQuery::default(),
            calendar: CalendarState::new(today),
            show_calendar: false,
            theme,
            tz,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn theme(&self) -> Theme {
        self.theme.get()
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn calendar(&self) -> &CalendarState {
        &self.calendar
    }

    fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    pub fn apply(&mut self, command: Command) -> anyhow::Result<Response> {
        self.apply_at(command, Utc::now())
    }

    #[instrument(skip(self, now))]
    pub fn apply_at(&mut self, command: Command, now: DateTime<Utc>) -> anyhow::Result<Response> {
        let notice = match command {
            Command::Add(text) => match self.store.add_at(&text, now) {
                Some(_) => None,
                None => Some("Task text cannot be empty.".to_string()),
            },
            Command::ToggleDone(id) => missing(self.store.toggle_completed(id), id),
            Command::ToggleImportant(id) => missing(self.store.toggle_important(id), id),
            Command::Edit { id, text: Some(text) } => {
                if self.store.begin_edit(id).applied() {
                    discarded(self.store.commit_edit(&text))
                } else {
                    missing(Change::Ignored, id)
                }
            }
            Command::Edit { id, text: None } => {
                if !self.store.begin_edit(id).applied() {
                    return Ok(self.respond(missing(Change::Ignored, id), now));
                }
                let draft = self
                    .store
                    .editing()
                    .cloned()
                    .ok_or_else(|| anyhow!("edit draft vanished"))?;
                return Ok(Response {
                    notice: Some("Editing; use `save TEXT` or `cancel`.".to_string()),
                    outcome: Outcome::Editing(draft),
                });
            }
            Command::Save(text) => {
                if self.store.editing().is_none() {
                    Some("Not editing a task.".to_string())
                } else {
                    discarded(self.store.commit_edit(&text))
                }
            }
            Command::Cancel => match self.store.cancel_edit() {
                Change::Applied => Some("Edit cancelled.".to_string()),
                Change::Ignored => None,
            },
            Command::Delete(id) => missing(self.store.remove(id), id),
            Command::Filter(filter) => {
                self.filter = filter;
                None
            }
            Command::Search(text) => {
                self.query = SearchQuery::new(&text);
                None
            }
            Command::ClearSearch => {
                self.query.clear();
                None
            }
            Command::List => None,
            Command::Stats => {
                return Ok(Response {
                    notice: None,
                    outcome: Outcome::Stats {
                        active: self.store.active_count(),
                        completed: self.store.completed_count(),
                        total: self.store.len(),
                    },
                });
            }
            Command::Calendar(action) => {
                self.apply_calendar(action, now);
                None
            }
            Command::Day(date) => {
                self.show_calendar = true;
                self.calendar.jump_to(date);
                let tasks: Vec<Task> = self
                    .calendar
                    .select(date, self.store.tasks(), &self.tz)
                    .into_iter()
                    .cloned()
                    .collect();
                let stats = calendar::date_stats(self.store.tasks(), date, &self.tz);
                let notice = (!calendar::has_tasks(self.store.tasks(), date, &self.tz))
                    .then(|| "No tasks on this date.".to_string());
                return Ok(Response {
                    notice,
                    outcome: Outcome::Day(DayView { date, stats, tasks }),
                });
            }
            Command::Theme => {
                let theme = self.theme.toggle();
                return Ok(Response {
                    notice: None,
                    outcome: Outcome::Theme(theme),
                });
            }
            Command::Export => {
                let json = serde_json::to_string_pretty(self.store.tasks())
                    .context("failed to serialize tasks")?;
                return Ok(Response {
                    notice: None,
                    outcome: Outcome::Export(json),
                });
            }
            Command::Help => {
                return Ok(Response {
                    notice: None,
                    outcome: Outcome::Help,
                });
            }
            Command::Quit => {
                return Ok(Response {
                    notice: None,
                    outcome: Outcome::Quit,
                });
            }
        };

        Ok(self.respond(notice, now))
    }

    fn apply_calendar(&mut self, action: CalendarAction, now: DateTime<Utc>) {
        match action {
            CalendarAction::Toggle => self.show_calendar = !self.show_calendar,
            CalendarAction::Show => self.show_calendar = true,
            CalendarAction::Hide => self.show_calendar = false,
            CalendarAction::Next => {
                self.show_calendar = true;
                self.calendar.next_month();
            }
            CalendarAction::Previous => {
                self.show_calendar = true;
                self.calendar.previous_month();
            }
            CalendarAction::Today => {
                self.show_calendar = true;
                let today = self.today(now);
                self.calendar.jump_to(today);
                self.calendar.clear_selection();
            }
        }
        debug!(
            visible = self.show_calendar,
            month = %self.calendar.cursor().title(),
            "calendar updated"
        );
    }

    fn respond(&self, notice: Option<String>, now: DateTime<Utc>) -> Response {
        Response {
            notice,
            outcome: Outcome::Refresh(self.snapshot(now)),
        }
    }

    /// Recomputes the task list and, when visible, the month grid.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        let tasks = self.store.tasks();
        let shown = filter::view(tasks, self.filter, &self.query);
        let summary = filter::summarize(tasks, &shown);
        let empty_hint = shown
            .is_empty()
            .then(|| filter::empty_hint(self.filter, &self.query));

        let calendar = self.show_calendar.then(|| CalendarView {
            title: self.calendar.cursor().title(),
            cells: self.calendar.cells(tasks, self.today(now), &self.tz),
        });

        Snapshot {
            tasks: TaskView {
                rows: shown
                    .into_iter()
                    .map(|task| TaskRow {
                        added: task.created_on(&self.tz),
                        task: task.clone(),
                    })
                    .collect(),
                filter: self.filter,
                query: self.query.as_str().trim().to_string(),
                summary,
                active: self.store.active_count(),
                completed: self.store.completed_count(),
                empty_hint,
                editing: self.store.editing().cloned(),
            },
            calendar,
        }
    }
}

fn missing(change: Change, id: TaskId) -> Option<String> {
    match change {
        Change::Applied => None,
        Change::Ignored => Some(format!("No task with id {id}.")),
    }
}

fn discarded(change: Change) -> Option<String> {
    match change {
        Change::Applied => None,
        Change::Ignored => Some("Edit discarded: text cannot be empty.".to_string()),
    }
}
