use std::collections::HashSet;

use crate::models::task::{Schedule, Status, Task};

/// What the presentation layer gets to draw for the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskView {
    pub pending: Vec<Task>,
    pub done: Vec<Task>,
    /// Distinct tags of the schedule-filtered tasks, first-seen order
    pub tags: Vec<String>,
}

impl TaskView {
    /// Schedule filter, then tag filter, then status partition. Tags are
    /// collected before the tag filter so every tag of the bucket stays
    /// selectable.
    pub fn build(tasks: &[Task], schedule: Schedule, tag: &str) -> Self {
        let scheduled = filter_by_schedule(tasks, schedule);
        let tags = tags_in_scope(scheduled.iter().copied());
        let tagged = filter_by_tag(scheduled, tag);
        let (pending, done) = partition_by_status(tagged);

        Self {
            pending: pending.into_iter().cloned().collect(),
            done: done.into_iter().cloned().collect(),
            tags,
        }
    }
}

pub fn filter_by_schedule(tasks: &[Task], schedule: Schedule) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| schedule.matches(t.scheduling))
        .collect()
}

/// An empty tag means no filtering.
pub fn filter_by_tag<'a>(tasks: Vec<&'a Task>, tag: &str) -> Vec<&'a Task> {
    if tag.is_empty() {
        return tasks;
    }
    tasks.into_iter().filter(|t| t.has_tag(tag)).collect()
}

pub fn partition_by_status<'a>(tasks: Vec<&'a Task>) -> (Vec<&'a Task>, Vec<&'a Task>) {
    tasks.into_iter().partition(|t| t.status == Status::Pending)
}

pub fn tags_in_scope<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<String> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .flat_map(|t| t.tags.iter())
        .filter(|&tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}
