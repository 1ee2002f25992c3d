use chrono::{NaiveDate, TimeZone, Utc};
use tasklet_core::calendar::{self, CalendarState, DayStats, DayStatus, YearMonth};
use tasklet_core::filter::{SearchQuery, StatusFilter, view};
use tasklet_core::preferences::{FileKeyValueStore, Theme, ThemeStore};
use tasklet_core::store::{Change, TaskStore};
use tasklet_core::task::{Task, TaskId};
use tempfile::tempdir;

fn texts(tasks: &[&Task]) -> Vec<String> {
    tasks.iter().map(|t| t.text.clone()).collect()
}

#[test]
fn add_toggle_filter_search_delete_scenario() {
    let mut store = TaskStore::new();

    let milk = store.add("Buy milk").expect("added");
    assert_eq!(store.len(), 1);
    let task = &store.tasks()[0];
    assert_eq!(task.text, "Buy milk");
    assert!(!task.completed);
    assert!(!task.important);

    store.toggle_completed(milk);
    assert!(store.get(milk).expect("present").completed);

    store.add("Clean desk").expect("added");
    let everything = view(store.tasks(), StatusFilter::All, &SearchQuery::default());
    assert_eq!(texts(&everything), vec!["Clean desk", "Buy milk"]);

    let done = view(store.tasks(), StatusFilter::Completed, &SearchQuery::default());
    assert_eq!(texts(&done), vec!["Buy milk"]);

    let found = view(store.tasks(), StatusFilter::All, &SearchQuery::new("clean"));
    assert_eq!(texts(&found), vec!["Clean desk"]);

    assert_eq!(store.remove(milk), Change::Applied);
    let remaining: Vec<&Task> = store.tasks().iter().collect();
    assert_eq!(texts(&remaining), vec!["Clean desk"]);
}

#[test]
fn blank_adds_never_grow_the_store() {
    let mut store = TaskStore::new();
    let inputs = ["one", "", "  ", "two", "\t\n", "three"];
    for input in inputs {
        store.add(input);
    }
    let non_empty = inputs.iter().filter(|s| !s.trim().is_empty()).count();
    assert_eq!(store.len(), non_empty);
}

#[test]
fn removed_ids_stay_gone() {
    let mut store = TaskStore::new();
    let id = store.add("temporary").expect("added");
    store.remove(id);

    assert_eq!(store.toggle_completed(id), Change::Ignored);
    assert_eq!(store.toggle_important(id), Change::Ignored);
    assert_eq!(store.edit(id, "revived"), Change::Ignored);
    assert_eq!(store.begin_edit(id), Change::Ignored);
    assert!(store.tasks().iter().all(|t| t.id != id));
}

#[test]
fn completed_and_active_views_partition_the_store() {
    let mut store = TaskStore::new();
    for i in 0..7 {
        let id = store.add(&format!("task {i}")).expect("added");
        if i % 3 == 0 {
            store.toggle_completed(id);
        }
        if i % 2 == 0 {
            store.toggle_important(id);
        }
    }

    let q = SearchQuery::default();
    let done = view(store.tasks(), StatusFilter::Completed, &q);
    let active = view(store.tasks(), StatusFilter::Active, &q);

    assert_eq!(done.len() + active.len(), store.len());
    for task in store.tasks() {
        let in_done = done.iter().any(|t| t.id == task.id);
        let in_active = active.iter().any(|t| t.id == task.id);
        assert!(in_done ^ in_active, "task {} must be in exactly one view", task.id);
    }
}

#[test]
fn calendar_day_buckets_and_status() {
    let mut store = TaskStore::new();
    let day17 = Utc.with_ymd_and_hms(2025, 8, 17, 10, 0, 0).single().expect("valid time");
    let day18 = Utc.with_ymd_and_hms(2025, 8, 18, 23, 59, 0).single().expect("valid time");

    let done = store.add_at("Plan weekend activities", day17).expect("added");
    store.toggle_completed(done);
    store.add_at("Review project documentation", day18).expect("added");

    let d17 = NaiveDate::from_ymd_opt(2025, 8, 17).expect("valid date");
    let d18 = NaiveDate::from_ymd_opt(2025, 8, 18).expect("valid date");
    let d19 = NaiveDate::from_ymd_opt(2025, 8, 19).expect("valid date");

    assert_eq!(
        calendar::date_stats(store.tasks(), d17, &Utc),
        DayStats { completed: 1, total: 1 }
    );
    assert_eq!(calendar::status_for_date(store.tasks(), d17, &Utc), DayStatus::AllDone);
    assert_eq!(
        calendar::date_stats(store.tasks(), d18, &Utc),
        DayStats { completed: 0, total: 1 }
    );
    assert_eq!(calendar::status_for_date(store.tasks(), d18, &Utc), DayStatus::Pending);
    assert_eq!(calendar::status_for_date(store.tasks(), d19, &Utc), DayStatus::None);

    let mut state = CalendarState::new(d18);
    let picked = state.select(d17, store.tasks(), &Utc);
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].id, done);
}

#[test]
fn month_navigation_round_trips_through_year_boundary() {
    let mut ym = YearMonth::new(2025, 11).expect("valid month");
    ym = ym.next().next();
    assert_eq!(ym, YearMonth::new(2026, 1).expect("valid month"));
    ym = ym.previous().previous().previous();
    assert_eq!(ym, YearMonth::new(2025, 10).expect("valid month"));

    let grid = calendar::month_grid(ym);
    assert_eq!(grid.len(), calendar::GRID_CELLS);
}

#[test]
fn theme_preference_persists_across_sessions() {
    let temp = tempdir().expect("tempdir");

    let store = FileKeyValueStore::open(temp.path()).expect("open store");
    let mut themes = ThemeStore::load(store);
    assert_eq!(themes.get(), Theme::Light);
    themes.toggle();

    let reopened = FileKeyValueStore::open(temp.path()).expect("reopen store");
    assert_eq!(ThemeStore::load(reopened).get(), Theme::Dark);
}

#[test]
fn task_ids_are_unique_after_mixed_operations() {
    let mut store = TaskStore::with_samples(Utc::now());
    store.remove(TaskId(6));
    store.add("new one").expect("added");
    store.remove(TaskId(1));
    store.add("newer one").expect("added");

    let mut ids: Vec<u64> = store.tasks().iter().map(|t| t.id.0).collect();
    let before = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), before);
}
