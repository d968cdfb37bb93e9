use std::sync::Arc;

use tokio::{runtime::Handle, sync::watch};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    config::Config,
    models::{
        store::TaskStore,
        tags::parse_task_input,
        task::{Bucket, Schedule, Task, TaskSelector, parse_time},
    },
    services::{
        stopwatch::{Stopwatch, StopwatchState},
        views::TaskView,
    },
    storage::{Storage, StorageError},
};

/// Owns all tracker state: the task collection, the stopwatch, the current
/// view selection and the storage it mirrors to.
///
/// Each mutation that changes the collection publishes the new snapshot to
/// subscribers and writes the whole collection back to storage.
pub struct Tracker<S: Storage> {
    store: TaskStore,
    stopwatch: Stopwatch,
    schedule: Schedule,
    tag_filter: String,
    default_bucket: Bucket,
    storage: S,
    storage_key: String,
    changes: watch::Sender<Arc<[Task]>>,
}

impl<S: Storage> Tracker<S> {
    #[instrument(skip_all, fields(key = %config.storage_key))]
    pub fn open(storage: S, config: &Config) -> Result<Self, StorageError> {
        let document = storage.get_or_default(&config.storage_key)?;
        let store = TaskStore::from(document);
        let (changes, _) = watch::channel(store.list());

        info!(tasks = store.len(), "tracker ready");
        Ok(Self {
            store,
            stopwatch: Stopwatch::new(),
            schedule: Schedule::default(),
            tag_filter: String::new(),
            default_bucket: config.default_bucket,
            storage,
            storage_key: config.storage_key.clone(),
            changes,
        })
    }

    /// Ticks the stopwatch from a task on `handle` rather than through
    /// [`Tracker::tick`].
    pub fn with_ticker(mut self, handle: Handle, config: &Config) -> Self {
        self.stopwatch = Stopwatch::with_ticker(handle, config.tick_interval());
        self
    }

    pub fn tasks(&self) -> Arc<[Task]> {
        self.store.list()
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.store.get(id)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<[Task]>> {
        self.changes.subscribe()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Adds a task from raw input fields. The time field is parsed leniently.
    pub fn add_task(&mut self, raw_name: &str, raw_time: &str) -> Option<Uuid> {
        self.add_task_minutes(raw_name, parse_time(raw_time))
    }

    /// New tasks land in the selected bucket, or the default bucket while
    /// the "all tasks" view is selected.
    #[instrument(skip(self))]
    pub fn add_task_minutes(&mut self, raw_name: &str, minutes: u64) -> Option<Uuid> {
        let bucket = self.schedule.bucket().unwrap_or(self.default_bucket);
        let id = self.store.create(raw_name, minutes, bucket)?;
        info!(%id, bucket = bucket.label(), "task added");
        self.publish();
        Some(id)
    }

    #[instrument(skip(self, selector))]
    pub fn delete_task(&mut self, selector: impl Into<TaskSelector>) -> usize {
        let removed = self.store.delete(selector);
        if removed > 0 {
            info!(removed, "task deleted");
            self.publish();
        }
        removed
    }

    /// Completes the matching tasks with the stopwatch's current reading,
    /// then stops the stopwatch.
    #[instrument(skip(self, selector))]
    pub fn complete_task(&mut self, selector: impl Into<TaskSelector>) -> usize {
        let captured = self.stopwatch.elapsed();
        let completed = self.store.complete(selector, captured);
        self.stopwatch.stop();
        if completed > 0 {
            info!(completed, captured, "task completed");
            self.publish();
        }
        completed
    }

    #[instrument(skip(self, selector, new_tags))]
    pub fn update_task(
        &mut self,
        selector: impl Into<TaskSelector>,
        new_name: &str,
        new_tags: Vec<String>,
    ) -> usize {
        let updated = self.store.update(selector, new_name, new_tags);
        if updated > 0 {
            info!(updated, "task updated");
            self.publish();
        }
        updated
    }

    /// Re-parses raw input the same way task creation does and applies it as
    /// the new name and tags.
    pub fn edit_task(&mut self, selector: impl Into<TaskSelector>, raw_input: &str) -> usize {
        let parsed = parse_task_input(raw_input);
        if parsed.name.trim().is_empty() {
            return 0;
        }
        self.update_task(selector, &parsed.name, parsed.tags)
    }

    pub fn start_timer(&mut self, task_name: &str) {
        self.stopwatch.start(task_name);
    }

    pub fn stop_timer(&mut self) {
        self.stopwatch.stop();
    }

    pub fn tick(&self) -> u64 {
        self.stopwatch.tick()
    }

    pub fn stopwatch(&self) -> StopwatchState {
        self.stopwatch.state()
    }

    pub fn select_schedule(&mut self, schedule: impl Into<Schedule>) {
        self.schedule = schedule.into();
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// An empty tag clears the filter.
    pub fn set_tag_filter(&mut self, tag: &str) {
        self.tag_filter = tag.to_string();
    }

    pub fn tag_filter(&self) -> &str {
        &self.tag_filter
    }

    pub fn view(&self) -> TaskView {
        TaskView::build(&self.store.list(), self.schedule, &self.tag_filter)
    }

    /// Writes the collection to storage, reporting failures to the caller.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.storage
            .set(&self.storage_key, &self.store.to_document())
    }

    fn publish(&self) {
        self.changes.send_replace(self.store.list());
        if let Err(e) = self.flush() {
            error!(error = %e, key = %self.storage_key, "failed to persist tasks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::task::Status,
        storage::{DEFAULT_KEY, memory::MemoryStorage},
    };

    fn tracker() -> Tracker<MemoryStorage> {
        Tracker::open(MemoryStorage::new(), &Config::default()).unwrap()
    }

    #[test]
    fn test_add_uses_selected_bucket() {
        let mut tracker = tracker();
        tracker.select_schedule(Bucket::ThisMonth);

        let id = tracker.add_task("budget #money", "30").unwrap();

        let task = tracker.task(id).unwrap();
        assert_eq!(task.scheduling, Bucket::ThisMonth);
        assert_eq!(task.time, 30);
        assert_eq!(task.tags, vec!["#money"]);
    }

    #[test]
    fn test_add_under_all_uses_default_bucket() {
        let mut tracker = tracker();
        tracker.select_schedule(Schedule::All);

        let id = tracker.add_task("anything", "abc").unwrap();

        let task = tracker.task(id).unwrap();
        assert_eq!(task.scheduling, Bucket::Today);
        assert_eq!(task.time, 0);
    }

    #[test]
    fn test_complete_captures_stopwatch_and_stops_it() {
        let mut tracker = tracker();
        tracker.add_task("A", "10");
        tracker.start_timer("A");
        for _ in 0..42 {
            tracker.tick();
        }

        assert_eq!(tracker.complete_task("A"), 1);

        let tasks = tracker.tasks();
        assert_eq!(tasks[0].time, 42);
        assert_eq!(tasks[0].status, Status::Done);
        assert_eq!(tracker.stopwatch(), StopwatchState::Idle);
    }

    #[test]
    fn test_complete_unknown_task_still_stops_stopwatch() {
        let mut tracker = tracker();
        tracker.start_timer("ghost");
        tracker.tick();

        assert_eq!(tracker.complete_task("ghost"), 0);
        assert_eq!(tracker.stopwatch(), StopwatchState::Idle);
    }

    #[test]
    fn test_mutations_are_persisted() {
        let mut tracker = tracker();
        tracker.add_task("persist me #io", "5");
        tracker.complete_task("persist me ");

        let stored = tracker.storage().get_or_default(DEFAULT_KEY).unwrap();
        assert_eq!(stored.tasks, tracker.tasks().to_vec());
        assert_eq!(stored.tasks[0].status, Status::Done);
    }

    #[test]
    fn test_noop_mutations_do_not_publish() {
        let mut tracker = tracker();
        let mut changes = tracker.subscribe();

        tracker.delete_task("missing");
        tracker.update_task("missing", "x", vec![]);
        tracker.add_task("   ", "1");
        assert!(!changes.has_changed().unwrap());
        assert!(tracker.storage().raw(DEFAULT_KEY).is_none());

        tracker.add_task("real", "1");
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().len(), 1);
    }

    #[test]
    fn test_edit_reparses_tags() {
        let mut tracker = tracker();
        let id = tracker.add_task("draft #old", "0").unwrap();

        assert_eq!(tracker.edit_task(id, "final copy #new #review"), 1);

        let task = tracker.task(id).unwrap();
        assert_eq!(task.name, "final copy ");
        assert_eq!(task.tags, vec!["#new", "#review"]);
    }

    #[test]
    fn test_edit_with_blank_name_is_ignored() {
        let mut tracker = tracker();
        let id = tracker.add_task("keep", "0").unwrap();

        assert_eq!(tracker.edit_task(id, ""), 0);
        assert_eq!(tracker.task(id).unwrap().name, "keep");
    }

    #[test]
    fn test_view_follows_selection() {
        let mut tracker = tracker();
        tracker.add_task("standup #work", "15");
        tracker.add_task("groceries #home", "30");
        tracker.select_schedule(Bucket::ThisWeek);
        tracker.add_task("review PRs #work", "60");
        tracker.select_schedule(Bucket::Today);
        tracker.complete_task("standup ");

        let view = tracker.view();
        assert_eq!(view.pending.len(), 1);
        assert_eq!(view.done.len(), 1);
        assert_eq!(view.tags, vec!["#work", "#home"]);

        tracker.set_tag_filter("#work");
        tracker.select_schedule(Schedule::All);
        let view = tracker.view();
        let pending: Vec<_> = view.pending.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(pending, vec!["review PRs "]);
        assert_eq!(view.done.len(), 1);

        tracker.set_tag_filter("");
        assert_eq!(tracker.view().pending.len(), 2);
    }
}
