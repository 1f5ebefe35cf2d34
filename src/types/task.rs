//! Task wire types.
//!
//! Field names serialize in camelCase and enum values in
//! SCREAMING_SNAKE_CASE to match the REST contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Freshly created.
    New,
    /// Being worked on.
    InProgress,
    /// Work finished.
    Completed,
    /// Closed without further work.
    Closed,
}

impl TaskStatus {
    /// Every status, in workflow order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::New,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Closed,
    ];

    /// Wire representation (`IN_PROGRESS`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Closed => "CLOSED",
        }
    }

    /// Human-readable label (`In Progress`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Accepts the wire form as well as lowercase, dashed or spaced variants.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(format!(
                "unknown status '{}' (expected NEW, IN_PROGRESS, COMPLETED or CLOSED)",
                s
            )),
        }
    }
}

/// Urgency of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Normal.
    Medium,
    /// Should be handled soon.
    High,
    /// Needs immediate attention.
    Critical,
}

impl TaskPriority {
    /// Every priority, lowest first.
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Critical,
    ];

    /// Wire representation (`CRITICAL`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Human-readable label (`Critical`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!(
                "unknown priority '{}' (expected LOW, MEDIUM, HIGH or CRITICAL)",
                s
            )),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// A task as returned by the backend.
///
/// The client never constructs these itself outside tests; every instance
/// is a copy of backend state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Server-assigned identifier.
    pub id: i64,
    /// Short title.
    pub title: String,
    /// Free-form description. Older records may carry `null`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Urgency.
    pub priority: TaskPriority,
    /// Assignee id.
    #[serde(default)]
    pub assigned_to_id: Option<i64>,
    /// Assignee display name.
    #[serde(default)]
    pub assigned_to_name: Option<String>,
    /// Creator id.
    pub created_by_id: i64,
    /// Creator display name.
    pub created_by_name: String,
    /// Creation timestamp as sent by the backend.
    pub created_date: String,
    /// Last update timestamp as sent by the backend.
    pub updated_date: String,
    /// Optional due date (`YYYY-MM-DD`).
    #[serde(default)]
    pub due_date: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Mutable subset of a task sent on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Urgency.
    pub priority: TaskPriority,
    /// Assignee id, omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<i64>,
    /// Due date, omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl TaskRequest {
    /// New request with status `NEW` and priority `MEDIUM`, the defaults of
    /// the create form.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::New,
            priority: TaskPriority::Medium,
            assigned_to_id: None,
            due_date: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the assignee.
    pub fn with_assignee(mut self, user_id: i64) -> Self {
        self.assigned_to_id = Some(user_id);
        self
    }

    /// Set the due date.
    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Returns `true` when the mutable fields of `task` equal this request.
    pub fn matches(&self, task: &Task) -> bool {
        self.title == task.title
            && self.description == task.description
            && self.status == task.status
            && self.priority == task.priority
            && self.assigned_to_id == task.assigned_to_id
            && self.due_date == task.due_date
    }
}

impl From<&Task> for TaskRequest {
    /// Prefill an edit form from an existing task.
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            assigned_to_id: task.assigned_to_id,
            due_date: task.due_date.clone(),
        }
    }
}

/// Body of a `200` delete response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Confirmation text.
    pub message: String,
}
