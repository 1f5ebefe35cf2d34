//! Task commands: list, dashboard, show, create, update, delete.

use anyhow::{anyhow, bail, Result};
use clap::Args;
use colored::Colorize;

use taskflow::types::{Task, TaskPriority, TaskRequest, TaskStatus};
use taskflow::view::{
    count_label, filter_tasks, recent_tasks, render_stats, render_task, Choice, TaskFilter,
    TaskStats, ViewState, LOAD_FAILED, RECENT_TASKS,
};
use taskflow::Taskflow;

use super::finish_mutation;

/// Arguments of `taskflow list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive text to look for in titles and descriptions
    #[arg(long, short)]
    pub search: Option<String>,

    /// Status to keep (NEW, IN_PROGRESS, COMPLETED, CLOSED or ALL)
    #[arg(long, default_value = "ALL")]
    pub status: Choice<TaskStatus>,

    /// Priority to keep (LOW, MEDIUM, HIGH, CRITICAL or ALL)
    #[arg(long, default_value = "ALL")]
    pub priority: Choice<TaskPriority>,
}

/// Arguments of `taskflow create`.
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Short title
    pub title: String,

    /// Free-form description
    #[arg(long, short, default_value = "")]
    pub description: String,

    /// Initial status
    #[arg(long, default_value = "NEW")]
    pub status: TaskStatus,

    /// Priority
    #[arg(long, default_value = "MEDIUM")]
    pub priority: TaskPriority,

    /// Assignee user id
    #[arg(long)]
    pub assignee: Option<i64>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

/// Arguments of `taskflow update`. Omitted fields keep their current value.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(long, short)]
    pub description: Option<String>,

    /// New status
    #[arg(long)]
    pub status: Option<TaskStatus>,

    /// New priority
    #[arg(long)]
    pub priority: Option<TaskPriority>,

    /// New assignee user id
    #[arg(long)]
    pub assignee: Option<i64>,

    /// New due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

impl UpdateArgs {
    fn apply(self, mut request: TaskRequest) -> TaskRequest {
        if let Some(title) = self.title {
            request.title = title;
        }
        if let Some(description) = self.description {
            request.description = description;
        }
        if let Some(status) = self.status {
            request.status = status;
        }
        if let Some(priority) = self.priority {
            request.priority = priority;
        }
        if let Some(assignee) = self.assignee {
            request.assigned_to_id = Some(assignee);
        }
        if let Some(due) = self.due {
            request.due_date = Some(due);
        }
        request
    }
}

fn require_session(app: &Taskflow) -> Result<()> {
    if !app.is_authenticated() {
        bail!("Not signed in. Run: taskflow login <username>");
    }
    Ok(())
}

async fn load_tasks(app: &Taskflow) -> Result<Vec<Task>> {
    let entry = app.tasks().tasks_list().await;
    match ViewState::from_entry(&entry) {
        ViewState::Ready(tasks) => Ok(tasks),
        ViewState::Error(message) => Err(anyhow!("{}\n  {}", LOAD_FAILED, message)),
        ViewState::Loading | ViewState::Empty => Ok(Vec::new()),
    }
}

fn print_tasks(tasks: &[Task]) {
    for task in tasks {
        println!("{}\n", render_task(task));
    }
}

/// List tasks matching the filter.
pub async fn list(app: &Taskflow, args: ListArgs) -> Result<()> {
    require_session(app)?;
    let tasks = load_tasks(app).await?;
    let filter = TaskFilter::new()
        .with_search(args.search.unwrap_or_default())
        .with_status(args.status)
        .with_priority(args.priority);
    let shown = filter_tasks(&tasks, &filter);

    println!("{}", "Tasks".bright_white().bold());
    println!("{}\n", count_label(shown.len()).dimmed());
    if shown.is_empty() {
        println!("  No tasks found");
    } else {
        print_tasks(&shown);
    }
    Ok(())
}

/// Print counters and recent tasks.
pub async fn dashboard(app: &Taskflow) -> Result<()> {
    require_session(app)?;
    let tasks = load_tasks(app).await?;

    println!("{}", "Dashboard".bright_white().bold());
    println!("{}\n", render_stats(&TaskStats::from_tasks(&tasks)));
    println!("{}", "Recent Tasks".bright_white().bold());
    let recent = recent_tasks(&tasks, RECENT_TASKS);
    if recent.is_empty() {
        println!("  No tasks yet. Create one with: taskflow create <title>");
    } else {
        print_tasks(&recent);
    }
    Ok(())
}

/// Print one task.
pub async fn show(app: &Taskflow, id: i64) -> Result<()> {
    require_session(app)?;
    let task = fetch_task(app, id).await?;
    println!("{}", render_task(&task));
    println!("    Created by {} on {}", task.created_by_name, task.created_date);
    println!("    Updated {}", task.updated_date);
    Ok(())
}

async fn fetch_task(app: &Taskflow, id: i64) -> Result<Task> {
    let entry = app.tasks().task(id).await;
    match ViewState::from_entry(&entry) {
        ViewState::Ready(task) => Ok(task),
        ViewState::Error(message) => Err(anyhow!("Failed to load task #{}: {}", id, message)),
        ViewState::Loading | ViewState::Empty => Err(anyhow!("Task #{} not found", id)),
    }
}

/// Create a task.
pub async fn create(app: &Taskflow, args: CreateArgs) -> Result<()> {
    require_session(app)?;
    let mut request = TaskRequest::new(args.title)
        .with_description(args.description)
        .with_status(args.status)
        .with_priority(args.priority);
    if let Some(assignee) = args.assignee {
        request = request.with_assignee(assignee);
    }
    if let Some(due) = args.due {
        request = request.with_due_date(due);
    }

    let mut notes = app.tasks().notifications();
    let result = app.tasks().create_task(&request).await;
    let task = finish_mutation(result, &mut notes)?;
    println!("\n{}", render_task(&task));
    Ok(())
}

/// Update a task, keeping fields that were not given.
pub async fn update(app: &Taskflow, id: i64, fields: UpdateArgs) -> Result<()> {
    require_session(app)?;
    let current = fetch_task(app, id).await?;
    let request = fields.apply(TaskRequest::from(&current));

    let mut notes = app.tasks().notifications();
    let result = app.tasks().update_task(id, &request).await;
    let task = finish_mutation(result, &mut notes)?;
    println!("\n{}", render_task(&task));
    Ok(())
}

/// Delete a task.
pub async fn delete(app: &Taskflow, id: i64) -> Result<()> {
    require_session(app)?;
    let mut notes = app.tasks().notifications();
    let result = app.tasks().delete_task(id).await;
    finish_mutation(result, &mut notes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_unset_fields() {
        let base = TaskRequest::new("Old")
            .with_description("keep me")
            .with_priority(TaskPriority::High);
        let args = UpdateArgs {
            title: Some("New".to_string()),
            description: None,
            status: Some(TaskStatus::Completed),
            priority: None,
            assignee: None,
            due: None,
        };
        let updated = args.apply(base);
        assert_eq!(updated.title, "New");
        assert_eq!(updated.description, "keep me");
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.priority, TaskPriority::High);
    }
}
