use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::task::{Task, TaskId, normalize_text, sample_tasks};

/// Result of a store mutation. Missing ids and blank text are not errors;
/// they only report `Ignored` so a presenter can show a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Applied,
    Ignored,
}

impl Change {
    pub fn applied(self) -> bool {
        self == Change::Applied
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: TaskId,
    pub text: String,
}

/// Ordered task collection, newest first.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    last_id: u64,
    editing: Option<EditDraft>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let last_id = tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        Self {
            tasks,
            last_id,
            editing: None,
        }
    }

    pub fn with_samples(now: DateTime<Utc>) -> Self {
        let store = Self::with_tasks(sample_tasks(now));
        info!(count = store.len(), "seeded sample tasks");
        store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    fn next_id(&mut self) -> TaskId {
        let highest = self.tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        self.last_id = self.last_id.max(highest) + 1;
        TaskId(self.last_id)
    }

    pub fn add(&mut self, text: &str) -> Option<TaskId> {
        self.add_at(text, Utc::now())
    }

    /// Prepends a new task. Returns `None` and leaves the store untouched
    /// when `text` is blank.
    #[tracing::instrument(skip(self, text))]
    pub fn add_at(&mut self, text: &str, now: DateTime<Utc>) -> Option<TaskId> {
        let Some(text) = normalize_text(text) else {
            debug!("ignoring add with blank text");
            return None;
        };

        let id = self.next_id();
        self.tasks.insert(0, Task::new(id, text, now));
        debug!(%id, count = self.tasks.len(), "task added");
        Some(id)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_completed(&mut self, id: TaskId) -> Change {
        self.update(id, |task| task.completed = !task.completed)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_important(&mut self, id: TaskId) -> Change {
        self.update(id, |task| task.important = !task.important)
    }

    #[tracing::instrument(skip(self, new_text), fields(id = %id))]
    pub fn edit(&mut self, id: TaskId, new_text: &str) -> Change {
        let Some(text) = normalize_text(new_text) else {
            debug!("discarding edit with blank text");
            return Change::Ignored;
        };
        self.update(id, move |task| task.text = text)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: TaskId) -> Change {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!("remove target not found");
            return Change::Ignored;
        }

        if self.editing.as_ref().is_some_and(|draft| draft.id == id) {
            self.editing = None;
        }
        debug!(count = self.tasks.len(), "task removed");
        Change::Applied
    }

    fn update<F>(&mut self, id: TaskId, apply: F) -> Change
    where
        F: FnOnce(&mut Task),
    {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                apply(task);
                debug!(
                    completed = task.completed,
                    important = task.important,
                    "task updated"
                );
                Change::Applied
            }
            None => {
                debug!("update target not found");
                Change::Ignored
            }
        }
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    /// Enters editing mode for `id`, seeding the draft with the current text.
    pub fn begin_edit(&mut self, id: TaskId) -> Change {
        let Some(task) = self.get(id) else {
            return Change::Ignored;
        };
        self.editing = Some(EditDraft {
            id,
            text: task.text.clone(),
        });
        Change::Applied
    }

    /// Applies the draft edit and leaves editing mode whether or not the
    /// text was accepted.
    pub fn commit_edit(&mut self, text: &str) -> Change {
        match self.editing.take() {
            Some(draft) => self.edit(draft.id, text),
            None => Change::Ignored,
        }
    }

    pub fn cancel_edit(&mut self) -> Change {
        match self.editing.take() {
            Some(_) => Change::Applied,
            None => Change::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(store: &TaskStore) -> Vec<&str> {
        store.tasks().iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn add_prepends_and_skips_blank_text() {
        let mut store = TaskStore::new();
        assert!(store.add("first").is_some());
        assert!(store.add("   ").is_none());
        assert!(store.add("").is_none());
        assert!(store.add(" second ").is_some());

        assert_eq!(texts(&store), vec!["second", "first"]);
        let newest = &store.tasks()[0];
        assert!(!newest.completed);
        assert!(!newest.important);
    }

    #[test]
    fn ids_are_not_reused_after_remove() {
        let mut store = TaskStore::new();
        let a = store.add("a").expect("added");
        let b = store.add("b").expect("added");
        assert_eq!(store.remove(b), Change::Applied);
        let c = store.add("c").expect("added");
        assert_ne!(c, b);
        assert_ne!(c, a);
    }

    #[test]
    fn toggles_are_self_inverse_and_ignore_unknown_ids() {
        let mut store = TaskStore::new();
        let id = store.add("task").expect("added");

        assert!(store.toggle_completed(id).applied());
        assert!(store.get(id).expect("present").completed);
        store.toggle_completed(id);
        assert!(!store.get(id).expect("present").completed);

        store.toggle_important(id);
        assert!(store.get(id).expect("present").important);

        assert_eq!(store.toggle_completed(TaskId(999)), Change::Ignored);
        assert_eq!(store.toggle_important(TaskId(999)), Change::Ignored);
    }

    #[test]
    fn edit_keeps_identity_and_rejects_blank() {
        let mut store = TaskStore::new();
        let id = store.add("old").expect("added");
        let created = store.get(id).expect("present").created_at;
        store.toggle_completed(id);
        store.toggle_important(id);

        assert_eq!(store.edit(id, "  "), Change::Ignored);
        assert_eq!(store.get(id).expect("present").text, "old");

        assert_eq!(store.edit(id, " new "), Change::Applied);
        let task = store.get(id).expect("present");
        assert_eq!(task.text, "new");
        assert_eq!(task.created_at, created);
        assert_eq!(task.id, id);
        assert!(task.completed);
        assert!(task.important);
    }

    #[test]
    fn toggle_important_twice_restores_flag() {
        let mut store = TaskStore::new();
        let id = store.add("flag me").expect("added");

        assert!(store.toggle_important(id).applied());
        assert!(store.get(id).expect("present").important);
        assert!(store.toggle_important(id).applied());
        let task = store.get(id).expect("present");
        assert!(!task.important);
        assert!(!task.completed);
    }

    #[test]
    fn edit_session_always_exits() {
        let mut store = TaskStore::new();
        let id = store.add("draft me").expect("added");

        assert!(store.begin_edit(id).applied());
        assert_eq!(store.editing().map(|d| d.text.as_str()), Some("draft me"));
        assert_eq!(store.commit_edit(" "), Change::Ignored);
        assert!(store.editing().is_none());
        assert_eq!(store.get(id).expect("present").text, "draft me");

        store.begin_edit(id);
        assert!(store.cancel_edit().applied());
        assert!(store.editing().is_none());

        assert_eq!(store.begin_edit(TaskId(77)), Change::Ignored);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = TaskStore::new();
        let id = store.add("gone").expect("added");
        assert!(store.remove(id).applied());
        assert_eq!(store.remove(id), Change::Ignored);
        assert_eq!(store.toggle_completed(id), Change::Ignored);
        assert_eq!(store.edit(id, "back"), Change::Ignored);
        assert!(store.get(id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn counts_track_completion() {
        let mut store = TaskStore::with_samples(Utc::now());
        assert_eq!(store.len(), 6);
        assert_eq!(store.completed_count(), 2);
        assert_eq!(store.active_count(), 4);

        let id = store.add("seventh").expect("added");
        assert_eq!(id, TaskId(7));
    }
}
