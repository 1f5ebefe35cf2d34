//! Pure projections of cached task data for display.
//!
//! Nothing here touches the network or the cache; every function takes a
//! snapshot and returns a new value.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::cache::{CacheEntry, QueryStatus};
use crate::types::{Task, TaskPriority, TaskStatus};

/// Number of tasks on the dashboard's recent list.
pub const RECENT_TASKS: usize = 6;

/// Message shown when the task list cannot be loaded.
pub const LOAD_FAILED: &str = "Failed to load tasks. Is your backend running?";

/// Either every value or exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice<T> {
    /// Matches everything.
    All,
    /// Matches values equal to this one.
    Only(T),
}

impl<T> Default for Choice<T> {
    fn default() -> Self {
        Choice::All
    }
}

impl<T: PartialEq> Choice<T> {
    /// `true` when `value` passes this choice.
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(wanted) => wanted == value,
        }
    }
}

impl<T: FromStr> FromStr for Choice<T> {
    type Err = T::Err;

    /// `ALL` (any case) or anything `T` parses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Choice::All)
        } else {
            s.parse().map(Choice::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => f.write_str("ALL"),
            Choice::Only(value) => value.fmt(f),
        }
    }
}

/// Criteria of the task list view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilter {
    /// Case-insensitive substring of the title or description. Empty matches all.
    pub search: String,
    /// Status to keep.
    pub status: Choice<TaskStatus>,
    /// Priority to keep.
    pub priority: Choice<TaskPriority>,
}

impl TaskFilter {
    /// Filter that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search text.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Keep only `status`.
    pub fn with_status(mut self, status: Choice<TaskStatus>) -> Self {
        self.status = status;
        self
    }

    /// Keep only `priority`.
    pub fn with_priority(mut self, priority: Choice<TaskPriority>) -> Self {
        self.priority = priority;
        self
    }

    /// `true` when the filter keeps every task.
    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.status == Choice::All && self.priority == Choice::All
    }

    /// `true` when `task` passes every criterion.
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_search(task)
            && self.status.matches(&task.status)
            && self.priority.matches(&task.priority)
    }

    fn matches_search(&self, task: &Task) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    }
}

/// Tasks passing `filter`, in their original order.
///
/// ```
/// use taskflow::view::{filter_tasks, TaskFilter};
///
/// assert!(filter_tasks(&[], &TaskFilter::new().with_search("x")).is_empty());
/// ```
pub fn filter_tasks(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task))
        .cloned()
        .collect()
}

/// Counters shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    /// Every task.
    pub total: usize,
    /// Status `IN_PROGRESS`.
    pub in_progress: usize,
    /// Status `COMPLETED`.
    pub completed: usize,
    /// Priority `CRITICAL`.
    pub critical: usize,
}

impl TaskStats {
    /// Count `tasks`.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
                _ => {},
            }
            if task.priority == TaskPriority::Critical {
                stats.critical += 1;
            }
            stats
        })
    }
}

/// Parse a backend timestamp: RFC 3339, a zone-less date-time, or a date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// The `limit` most recently updated tasks, newest first.
///
/// Tasks with an unreadable `updatedDate` sort after all others; ties keep
/// their input order.
pub fn recent_tasks(tasks: &[Task], limit: usize) -> Vec<Task> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &Task)> = tasks
        .iter()
        .map(|task| (parse_timestamp(&task.updated_date), task))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    keyed
        .into_iter()
        .take(limit)
        .map(|(_, task)| task.clone())
        .collect()
}

/// What a view should render for a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<V> {
    /// A fetch is pending and there is nothing to show yet.
    Loading,
    /// The last fetch failed.
    Error(String),
    /// Nothing fetched and nothing pending (disabled query).
    Empty,
    /// Data to show, possibly while a refresh is pending.
    Ready(V),
}

impl<V: Clone> ViewState<V> {
    /// Project `entry`. An error wins over a retained value.
    pub fn from_entry(entry: &CacheEntry<V>) -> Self {
        match (entry.status, &entry.value, &entry.error) {
            (QueryStatus::Error, _, Some(error)) => ViewState::Error(error.to_string()),
            (QueryStatus::Error, _, None) => ViewState::Error(String::new()),
            (_, Some(value), _) => ViewState::Ready(value.clone()),
            (QueryStatus::Loading, None, _) => ViewState::Loading,
            _ => ViewState::Empty,
        }
    }
}

/// `"1 task found"`, `"3 tasks found"`.
pub fn count_label(count: usize) -> String {
    if count == 1 {
        "1 task found".to_string()
    } else {
        format!("{} tasks found", count)
    }
}

/// Due date as `Mar 5, 2024`; unparseable dates are shown as sent.
pub fn format_due_date(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|date| date.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Multi-line text card for one task.
pub fn render_task(task: &Task) -> String {
    let mut out = format!(
        "#{} [{}] [{}] {}\n",
        task.id,
        task.status.label(),
        task.priority.label(),
        task.title
    );
    if !task.description.is_empty() {
        out.push_str(&format!("    {}\n", task.description));
    }
    let assignee = task
        .assigned_to_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or("Unassigned");
    out.push_str(&format!("    Assignee: {}", assignee));
    if let Some(due) = task.due_date.as_deref() {
        out.push_str(&format!("    Due: {}", format_due_date(due)));
    }
    out
}

/// Dashboard counters as text.
pub fn render_stats(stats: &TaskStats) -> String {
    format!(
        "Total Tasks: {}  In Progress: {}  Completed: {}  Critical: {}",
        stats.total, stats.in_progress, stats.completed, stats.critical
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryKey;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn task(id: i64, title: &str, status: TaskStatus, priority: TaskPriority) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: format!("details of {}", title.to_lowercase()),
            status,
            priority,
            assigned_to_id: None,
            assigned_to_name: None,
            created_by_id: 1,
            created_by_name: "Alice".to_string(),
            created_date: "2024-01-01T00:00:00".to_string(),
            updated_date: format!("2024-01-{:02}T09:30:00", id),
            due_date: None,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task(1, "Fix login", TaskStatus::InProgress, TaskPriority::Critical),
            task(2, "Write docs", TaskStatus::New, TaskPriority::Low),
            task(3, "Release", TaskStatus::Completed, TaskPriority::Critical),
        ]
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let tasks = sample();
        let hits = filter_tasks(&tasks, &TaskFilter::new().with_search("LOGIN"));
        assert_eq!(hits.len(), 1);
        let hits = filter_tasks(&tasks, &TaskFilter::new().with_search("details of write"));
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn status_and_priority_combine() {
        let tasks = sample();
        let filter = TaskFilter::new()
            .with_priority(Choice::Only(TaskPriority::Critical))
            .with_status(Choice::Only(TaskStatus::Completed));
        let ids: Vec<i64> = filter_tasks(&tasks, &filter).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn choice_parses_all() {
        assert_eq!("all".parse::<Choice<TaskStatus>>().unwrap(), Choice::All);
        assert_eq!(
            "in_progress".parse::<Choice<TaskStatus>>().unwrap(),
            Choice::Only(TaskStatus::InProgress)
        );
        assert!("urgent".parse::<Choice<TaskPriority>>().is_err());
    }

    #[test]
    fn stats_count_each_bucket() {
        assert_eq!(
            TaskStats::from_tasks(&sample()),
            TaskStats {
                total: 3,
                in_progress: 1,
                completed: 1,
                critical: 2,
            }
        );
    }

    #[test]
    fn recent_tasks_newest_first() {
        let mut tasks = sample();
        tasks[1].updated_date = "garbage".to_string();
        let ids: Vec<i64> = recent_tasks(&tasks, 6).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(recent_tasks(&tasks, 1).len(), 1);
    }

    #[test]
    fn timestamps_in_every_backend_shape() {
        assert!(parse_timestamp("2024-03-05T10:00:00.123456").is_some());
        assert!(parse_timestamp("2024-03-05T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-03-05").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert_eq!(format_due_date("2024-03-05"), "Mar 5, 2024");
    }

    #[test]
    fn view_state_from_entry() {
        let mut entry: CacheEntry<Vec<Task>> = CacheEntry::idle(QueryKey::new("tasks"));
        assert_eq!(ViewState::from_entry(&entry), ViewState::Empty);

        entry.status = QueryStatus::Loading;
        assert_eq!(ViewState::from_entry(&entry), ViewState::Loading);

        entry.succeed(sample());
        entry.status = QueryStatus::Loading;
        assert!(matches!(ViewState::from_entry(&entry), ViewState::Ready(_)));

        entry.fail(Error::api(500, "HTTP 500"));
        assert_eq!(
            ViewState::from_entry(&entry),
            ViewState::Error("HTTP 500".to_string())
        );
    }

    #[test]
    fn labels() {
        assert_eq!(count_label(1), "1 task found");
        assert_eq!(count_label(0), "0 tasks found");
        let card = render_task(&sample()[0]);
        assert!(card.starts_with("#1 [In Progress] [Critical] Fix login"));
        assert!(card.contains("Assignee: Unassigned"));
    }
}
