use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    tags::parse_task_input,
    task::{Bucket, Status, Task, TaskSelector},
};

/// Current schema version
pub const CURRENT_VERSION: u32 = 1;

/// What gets persisted under a storage key: the whole task collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskDocument {
    #[serde(default = "current_version")]
    pub version: u32,
    pub tasks: Vec<Task>,
}

fn current_version() -> u32 {
    CURRENT_VERSION
}

impl Default for TaskDocument {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            tasks: vec![],
        }
    }
}

/// Ordered task collection. Every mutation swaps in a new collection, so a
/// snapshot handed out by [`TaskStore::list`] never changes underneath its
/// holder.
#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: Arc<[Task]>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self {
            tasks: Arc::from(Vec::<Task>::new()),
        }
    }
}

impl From<TaskDocument> for TaskStore {
    fn from(document: TaskDocument) -> Self {
        Self {
            tasks: Arc::from(document.tasks),
        }
    }
}

impl TaskStore {
    pub fn to_document(&self) -> TaskDocument {
        TaskDocument {
            version: CURRENT_VERSION,
            tasks: self.tasks.to_vec(),
        }
    }

    pub fn list(&self) -> Arc<[Task]> {
        Arc::clone(&self.tasks)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn contains_name(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name == name)
    }

    /// Appends a pending task built from the raw name input. Returns `None`
    /// without touching the collection when the cleaned name is blank.
    pub fn create(&mut self, name: &str, time: u64, scheduling: Bucket) -> Option<Uuid> {
        let parsed = parse_task_input(name);
        if parsed.name.trim().is_empty() {
            debug!(raw = name, "ignoring task with a blank name");
            return None;
        }

        if self.contains_name(&parsed.name) {
            warn!(name = %parsed.name, "a task with this name already exists");
        }

        let task = Task {
            id: Uuid::new_v4(),
            name: parsed.name,
            tags: parsed.tags,
            status: Status::Pending,
            time,
            scheduling,
        };
        let task_id = task.id;

        let mut tasks = self.tasks.to_vec();
        tasks.push(task);
        self.tasks = Arc::from(tasks);

        Some(task_id)
    }

    /// Removes every matching task. Returns how many were removed.
    pub fn delete(&mut self, selector: impl Into<TaskSelector>) -> usize {
        let selector = selector.into();
        let remaining: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| !selector.matches(t))
            .cloned()
            .collect();

        let removed = self.tasks.len() - remaining.len();
        if removed == 0 {
            debug!(%selector, "delete matched no task");
            return 0;
        }

        self.tasks = Arc::from(remaining);
        removed
    }

    /// Marks every matching task done, overwriting its time with the captured
    /// stopwatch value.
    pub fn complete(&mut self, selector: impl Into<TaskSelector>, captured_time: u64) -> usize {
        let selector = selector.into();
        self.replace_matching(&selector, |task| {
            task.status = Status::Done;
            task.time = captured_time;
        })
    }

    /// Replaces name and tags of every matching task. Status, time and
    /// scheduling are left alone.
    pub fn update(
        &mut self,
        selector: impl Into<TaskSelector>,
        new_name: &str,
        new_tags: Vec<String>,
    ) -> usize {
        let selector = selector.into();
        let collides = self
            .tasks
            .iter()
            .any(|t| t.name == new_name && !selector.matches(t));
        if collides {
            warn!(%selector, new_name, "rename collides with another task");
        }

        self.replace_matching(&selector, |task| {
            task.name = new_name.to_string();
            task.tags = new_tags.clone();
        })
    }

    fn replace_matching(&mut self, selector: &TaskSelector, apply: impl Fn(&mut Task)) -> usize {
        let mut matched = 0;
        let tasks: Vec<Task> = self
            .tasks
            .iter()
            .map(|task| {
                let mut task = task.clone();
                if selector.matches(&task) {
                    apply(&mut task);
                    matched += 1;
                }
                task
            })
            .collect();

        if matched == 0 {
            debug!(%selector, "no task matched");
            return 0;
        }

        self.tasks = Arc::from(tasks);
        matched
    }
}
