use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// UUID to identify the task, independent of its name
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Display name of the task, tags stripped
    pub name: String,
    /// Tags of the task, each one keeps its leading `#`
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the task is still pending or already done
    pub status: Status,
    /// Estimated minutes while pending, tracked seconds once done
    #[serde(default)]
    pub time: u64,
    /// Bucket the task was scheduled into when it was created
    pub scheduling: Bucket,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    #[default]
    #[serde(rename = "TODO")]
    Pending,
    #[serde(rename = "DONE")]
    Done,
}

/// Time window a task is scheduled into.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    #[default]
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "this week")]
    ThisWeek,
    #[serde(rename = "this month")]
    ThisMonth,
    #[serde(rename = "this year")]
    ThisYear,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Today,
        Bucket::ThisWeek,
        Bucket::ThisMonth,
        Bucket::ThisYear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Today => "today",
            Bucket::ThisWeek => "this week",
            Bucket::ThisMonth => "this month",
            Bucket::ThisYear => "this year",
        }
    }
}

/// View selector over buckets. `All` only exists here, a task never carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    All,
    Bucket(Bucket),
}

const ALL_TASKS_LABEL: &str = "all tasks";

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Bucket(Bucket::Today)
    }
}

impl From<Bucket> for Schedule {
    fn from(bucket: Bucket) -> Self {
        Schedule::Bucket(bucket)
    }
}

impl Schedule {
    pub fn matches(self, bucket: Bucket) -> bool {
        match self {
            Schedule::All => true,
            Schedule::Bucket(selected) => selected == bucket,
        }
    }

    pub fn bucket(self) -> Option<Bucket> {
        match self {
            Schedule::All => None,
            Schedule::Bucket(bucket) => Some(bucket),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Schedule::All => ALL_TASKS_LABEL,
            Schedule::Bucket(bucket) => bucket.label(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown schedule '{0}'")]
pub struct UnknownSchedule(pub String);

impl FromStr for Schedule {
    type Err = UnknownSchedule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_TASKS_LABEL {
            return Ok(Schedule::All);
        }
        Bucket::ALL
            .into_iter()
            .find(|bucket| bucket.label() == s)
            .map(Schedule::Bucket)
            .ok_or_else(|| UnknownSchedule(s.to_string()))
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(D::Error::custom)
    }
}

/// How an operation picks the tasks it acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSelector {
    /// Every task with exactly this name
    Name(String),
    /// The single task with this id
    Id(Uuid),
}

impl TaskSelector {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskSelector::Name(name) => task.name == *name,
            TaskSelector::Id(id) => task.id == *id,
        }
    }
}

impl From<&str> for TaskSelector {
    fn from(name: &str) -> Self {
        TaskSelector::Name(name.to_string())
    }
}

impl From<String> for TaskSelector {
    fn from(name: String) -> Self {
        TaskSelector::Name(name)
    }
}

impl From<Uuid> for TaskSelector {
    fn from(id: Uuid) -> Self {
        TaskSelector::Id(id)
    }
}

impl std::fmt::Display for TaskSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskSelector::Name(name) => write!(f, "'{name}'"),
            TaskSelector::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Lenient parse of the time input field. Anything that is not a finite,
/// non-negative number becomes zero; fractions are truncated.
pub fn parse_time(input: &str) -> u64 {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value.trunc() as u64,
        _ => 0,
    }
}
