use std::fmt;

use anyhow::anyhow;
use tracing::trace;

use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed,
  Important
}

impl StatusFilter {
  pub const ALL: [StatusFilter; 4] = [
    StatusFilter::All,
    StatusFilter::Active,
    StatusFilter::Completed,
    StatusFilter::Important
  ];

  pub fn as_key(
    self
  ) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Active => "active",
      | Self::Completed => "completed",
      | Self::Important => "important"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::All => "All",
      | Self::Active => "Active",
      | Self::Completed => "Completed",
      | Self::Important => "Important"
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Active => !task.completed,
      | Self::Completed => {
        task.completed
      }
      | Self::Important => {
        task.important
      }
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl std::str::FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let wanted =
      s.trim().to_ascii_lowercase();
    if wanted.is_empty() {
      return Err(anyhow!(
        "filter name cannot be empty"
      ));
    }

    let mut matches = Self::ALL
      .into_iter()
      .filter(|f| {
        f.as_key().starts_with(&wanted)
      });
    let first =
      matches.next().ok_or_else(|| {
        anyhow!(
          "unknown filter '{s}'; \
           expected one of all, \
           active, completed, \
           important"
        )
      })?;
    if first.as_key() != wanted
      && matches.next().is_some()
    {
      return Err(anyhow!(
        "ambiguous filter '{s}'"
      ));
    }
    Ok(first)
  }
}

/// Case-insensitive substring query over task text. Surrounding
/// whitespace only decides whether the query is active; matching uses the
/// query as typed.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct SearchQuery {
  raw:    String,
  folded: String
}

impl SearchQuery {
  pub fn new(raw: &str) -> Self {
    Self {
      raw:    raw.to_string(),
      folded: raw.to_lowercase()
    }
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  pub fn is_active(&self) -> bool {
    !self.raw.trim().is_empty()
  }

  pub fn clear(&mut self) {
    self.raw.clear();
    self.folded.clear();
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    !self.is_active()
      || task
        .text
        .to_lowercase()
        .contains(&self.folded)
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct ViewSummary {
  pub shown: usize,
  pub total: usize
}

/// Tasks passing both the status predicate and the search predicate, in
/// store order. Recomputed on every call.
#[tracing::instrument(skip(tasks, query))]
pub fn view<'a>(
  tasks: &'a [Task],
  filter: StatusFilter,
  query: &SearchQuery
) -> Vec<&'a Task> {
  let out: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      filter.matches(task)
        && query.matches(task)
    })
    .collect();
  trace!(
    total = tasks.len(),
    shown = out.len(),
    "computed task view"
  );
  out
}

pub fn summarize(
  tasks: &[Task],
  shown: &[&Task]
) -> ViewSummary {
  ViewSummary {
    shown: shown.len(),
    total: tasks.len()
  }
}

/// Message shown when a view comes back empty.
pub fn empty_hint(
  filter: StatusFilter,
  query: &SearchQuery
) -> String {
  if query.is_active() {
    format!(
      "No tasks found matching \
       \"{}\".",
      query.as_str().trim()
    )
  } else if filter == StatusFilter::All
  {
    "No tasks yet. Add one above!"
      .to_string()
  } else {
    format!(
      "No {} tasks found.",
      filter.as_key()
    )
  }
}
