//! Core of a small task tracker: tasks with inline `#tags` scheduled into
//! time buckets, a single stopwatch for the task being worked on, and
//! filtered views over the collection. The collection is mirrored to a
//! key/value [`storage::Storage`] after every change.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use models::{
    store::{TaskDocument, TaskStore},
    tags::{ParsedTask, parse_task_input},
    task::{Bucket, Schedule, Status, Task, TaskSelector, parse_time},
};
pub use services::{
    stopwatch::{Stopwatch, StopwatchState},
    tracker::Tracker,
    views::TaskView,
};
pub use storage::{Storage, StorageError};
