use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Datelike;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{DayStatus, WEEKDAY_LABELS};
use crate::config::Config;
use crate::preferences::Theme;
use crate::session::{CalendarView, DayView, Outcome, Response, TaskRow, TaskView};

const HELP: &str = "\
commands (unique prefixes work):
  add TEXT              add a task at the top of the list
  done ID               toggle completed
  star ID               toggle important
  edit ID [TEXT]        edit now, or start editing and finish with save/cancel
  save TEXT | cancel    finish or abandon the current edit
  delete ID             remove a task
  filter NAME           all, active, completed or important
  search [TEXT]         case-insensitive search; empty clears
  clear                 clear the search
  list | stats          show the list or the counters
  calendar [ACTION]     toggle, show, hide, next, prev or today
  day YYYY-MM-DD        tasks created on a day
  theme                 switch between light and dark
  export                print tasks as JSON
  help | quit";

#[derive(Debug, Clone, Copy)]
struct Palette {
    accent: &'static str,
    dim: &'static str,
    done: &'static str,
    progress: &'static str,
    pending: &'static str,
    important: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                accent: "34",
                dim: "90",
                done: "32",
                progress: "33",
                pending: "31",
                important: "35",
            },
            Theme::Dark => Self {
                accent: "96",
                dim: "37",
                done: "92",
                progress: "93",
                pending: "91",
                important: "95",
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    palette: Palette,
}

impl Renderer {
    pub fn new(cfg: &Config, theme: Theme) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color,
            palette: Palette::for_theme(theme),
        })
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            palette: Palette::for_theme(Theme::Light),
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.palette = Palette::for_theme(theme);
    }

    #[tracing::instrument(skip(self, response))]
    pub fn print_response(&mut self, response: &Response) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_response(&mut out, response)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_response<W: Write>(&mut self, out: &mut W, response: &Response) -> anyhow::Result<()> {
        match &response.outcome {
            Outcome::Refresh(snapshot) => {
                self.write_task_view(out, &snapshot.tasks)?;
                if let Some(calendar) = &snapshot.calendar {
                    writeln!(out)?;
                    self.write_calendar(out, calendar)?;
                }
            }
            Outcome::Stats {
                active,
                completed,
                total,
            } => {
                writeln!(out, "{active} active, {completed} completed, {total} total")?;
            }
            Outcome::Day(day) => self.write_day(out, day)?,
            Outcome::Editing(draft) => {
                writeln!(out, "editing {}: {}", draft.id, draft.text)?;
            }
            Outcome::Theme(theme) => {
                self.set_theme(*theme);
                writeln!(out, "Theme set to {theme}.")?;
            }
            Outcome::Export(json) => writeln!(out, "{json}")?,
            Outcome::Help => writeln!(out, "{HELP}")?,
            Outcome::Quit => {}
        }

        if let Some(notice) = &response.notice {
            let notice = self.paint(notice, self.palette.pending);
            writeln!(out, "{notice}")?;
        }
        Ok(())
    }

    fn write_task_view<W: Write>(&self, out: &mut W, view: &TaskView) -> anyhow::Result<()> {
        let header = format!(
            "[{}] {} active, {} completed",
            view.filter.label(),
            view.active,
            view.completed
        );
        writeln!(out, "{}", self.paint(&header, self.palette.accent))?;

        if !view.query.is_empty() {
            writeln!(
                out,
                "Found {} task(s) matching \"{}\"",
                view.summary.shown, view.query
            )?;
        }

        if let Some(hint) = &view.empty_hint {
            writeln!(out, "{}", self.paint(hint, self.palette.dim))?;
            return Ok(());
        }

        let editing = view.editing.as_ref().map(|draft| draft.id);
        let rows = view
            .rows
            .iter()
            .map(|row| self.task_row(row, editing == Some(row.task.id)))
            .collect();
        write_table(
            out,
            vec![
                "ID".to_string(),
                "Done".to_string(),
                "!".to_string(),
                "Task".to_string(),
                "Added".to_string(),
            ],
            rows,
        )
    }

    fn task_row(&self, row: &TaskRow, editing: bool) -> Vec<String> {
        let task = &row.task;
        let done = if task.completed {
            self.paint("[x]", self.palette.done)
        } else {
            "[ ]".to_string()
        };
        let important = if task.important {
            self.paint("*", self.palette.important)
        } else {
            String::new()
        };
        let text = if task.completed {
            self.paint(&task.text, self.palette.dim)
        } else if editing {
            format!("{} (editing)", task.text)
        } else {
            task.text.clone()
        };
        let added = row.added.format("%Y-%m-%d").to_string();

        vec![task.id.to_string(), done, important, text, added]
    }

    fn write_calendar<W: Write>(&self, out: &mut W, view: &CalendarView) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&view.title, self.palette.accent))?;
        for label in WEEKDAY_LABELS {
            write!(out, "{label:>5}")?;
        }
        writeln!(out)?;

        for week in view.cells.chunks(7) {
            for cell in week {
                let marker = match cell.status() {
                    DayStatus::None => " ",
                    DayStatus::AllDone => "*",
                    DayStatus::InProgress => "~",
                    DayStatus::Pending => "!",
                };
                let day = format!("{:>2}", cell.date.day());
                let day = if cell.selected {
                    self.paint(&day, "7")
                } else if cell.today {
                    self.paint(&day, "1;4")
                } else if !cell.in_month {
                    self.paint(&day, self.palette.dim)
                } else {
                    day
                };
                let marker = match cell.status() {
                    DayStatus::AllDone => self.paint(marker, self.palette.done),
                    DayStatus::InProgress => self.paint(marker, self.palette.progress),
                    DayStatus::Pending => self.paint(marker, self.palette.pending),
                    DayStatus::None => marker.to_string(),
                };
                write!(out, "  {day}{marker}")?;
            }
            writeln!(out)?;
        }
        writeln!(out, "  * all done   ~ in progress   ! pending")?;
        Ok(())
    }

    fn write_day<W: Write>(&self, out: &mut W, day: &DayView) -> anyhow::Result<()> {
        let title = day.date.format("%A, %B %-d, %Y").to_string();
        writeln!(out, "{}", self.paint(&title, self.palette.accent))?;
        writeln!(
            out,
            "{} task(s) on this date, {} completed",
            day.stats.total, day.stats.completed
        )?;
        for task in &day.tasks {
            let mark = if task.completed { "[x]" } else { "[ ]" };
            let star = if task.important { " *" } else { "" };
            writeln!(out, "  {mark} {} {}{star}", task.id, task.text)?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    writer: &mut W,
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
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::preferences::MemoryKeyValueStore;
    use crate::session::{Command, Session};
    use crate::store::TaskStore;

    fn render(renderer: &mut Renderer, response: &Response) -> String {
        let mut buf = Vec::new();
        renderer.write_response(&mut buf, response).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn strip_ansi_removes_escape_codes() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }

    #[test]
    fn table_pads_wide_characters() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["A".to_string(), "B".to_string()],
            vec![vec!["日本".to_string(), "x".to_string()]],
        )
        .expect("table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A    B ");
        assert_eq!(lines[2], "日本 x ");
    }

    #[test]
    fn renders_list_calendar_and_day() {
        let mut session = Session::new(
            TaskStore::new(),
            Box::new(MemoryKeyValueStore::new()),
            Utc,
            Utc::now(),
        );
        let mut renderer = Renderer::plain();

        session
            .apply(Command::Add("Buy milk".to_string()))
            .expect("apply");
        let response = session
            .apply(Command::Search("milk".to_string()))
            .expect("apply");
        let text = render(&mut renderer, &response);
        assert!(text.contains("Buy milk"));
        assert!(text.contains("Found 1 task(s) matching \"milk\""));
        assert!(text.contains("[All] 1 active, 0 completed"));

        let response = session
            .apply(Command::Calendar(crate::session::CalendarAction::Show))
            .expect("apply");
        let text = render(&mut renderer, &response);
        assert!(text.contains("Sun  Mon"));
        assert!(text.contains("!"));

        let date = NaiveDate::from_ymd_opt(2025, 8, 17).expect("valid date");
        let response = session.apply(Command::Day(date)).expect("apply");
        let text = render(&mut renderer, &response);
        assert!(text.contains("Sunday, August 17, 2025"));
        assert!(text.contains("0 task(s) on this date"));
    }

    #[test]
    fn added_column_uses_the_session_zone() {
        let zone = FixedOffset::east_opt(14 * 3600).expect("valid offset");
        let late = Utc
            .with_ymd_and_hms(2025, 8, 17, 23, 30, 0)
            .single()
            .expect("valid time");
        let mut session = Session::new(
            TaskStore::new(),
            Box::new(MemoryKeyValueStore::new()),
            zone,
            late,
        );
        let mut renderer = Renderer::plain();

        let response = session
            .apply_at(Command::Add("Late night".to_string()), late)
            .expect("apply");
        let text = render(&mut renderer, &response);
        assert!(text.contains("2025-08-18"), "{text}");
        assert!(!text.contains("2025-08-17"), "{text}");
    }
}
