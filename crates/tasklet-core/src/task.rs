use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| anyhow::anyhow!("expected a numeric task id, got: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,

    pub text: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub important: bool,

    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Builds a fresh task. `text` must already be trimmed and non-empty;
    /// the store is the only caller and enforces that.
    pub fn new(id: TaskId, text: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            important: false,
            created_at: now,
        }
    }

    /// Calendar day of creation as seen from `tz`.
    pub fn created_on<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.created_at.with_timezone(tz).date_naive()
    }
}

/// Trims raw user input, returning `None` for empty or whitespace-only text.
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
struct SampleTask {
    text: &'static str,
    completed: bool,
    important: bool,
    created: Option<(i32, u32, u32)>,
}

const SAMPLE_TASKS: [SampleTask; 6] = [
    SampleTask {
        text: "Complete React todo app",
        completed: false,
        important: true,
        created: None,
    },
    SampleTask {
        text: "Review project documentation",
        completed: false,
        important: false,
        created: Some((2025, 8, 18)),
    },
    SampleTask {
        text: "Plan weekend activities",
        completed: true,
        important: false,
        created: Some((2025, 8, 17)),
    },
    SampleTask {
        text: "Grocery shopping",
        completed: false,
        important: false,
        created: Some((2025, 8, 16)),
    },
    SampleTask {
        text: "Call dentist appointment",
        completed: true,
        important: true,
        created: Some((2025, 8, 15)),
    },
    SampleTask {
        text: "Update portfolio website",
        completed: false,
        important: false,
        created: Some((2025, 8, 14)),
    },
];

/// Seed data shown on a first run, newest first. Ids start at 1.
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    SAMPLE_TASKS
        .iter()
        .zip(1u64..)
        .map(|(sample, id)| {
            let created_at = sample
                .created
                .and_then(|(y, m, d)| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single())
                .unwrap_or(now);
            Task {
                id: TaskId(id),
                text: sample.text.to_string(),
                completed: sample.completed,
                important: sample.important,
                created_at,
            }
        })
        .collect()
}
