use serde::Serialize;

use crate::board::coordinator::{Notification, NotificationLevel};
use crate::model::task::Task;
use crate::ops::board_ops::ColumnView;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ColumnJson<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub status: String,
    pub tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
pub struct MutationJson<'a> {
    pub ok: bool,
    pub message: &'a str,
    pub retryable: bool,
    pub tasks: Vec<&'a Task>,
}

pub fn columns_to_json<'a>(columns: &[ColumnView<'a>]) -> Vec<ColumnJson<'a>> {
    columns
        .iter()
        .map(|view| ColumnJson {
            id: &view.column.id,
            title: &view.column.title,
            status: view.column.status.to_string(),
            tasks: view.tasks.clone(),
        })
        .collect()
}

pub fn mutation_to_json<'a>(notification: &'a Notification, tasks: Vec<&'a Task>) -> MutationJson<'a> {
    MutationJson {
        ok: notification.level == NotificationLevel::Success,
        message: &notification.message,
        retryable: notification.retryable,
        tasks,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn completion_char(task: &Task) -> char {
    if task.is_completed { 'x' } else { ' ' }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let schedule = task
        .schedule
        .map(|w| {
            format!(
                "  {} .. {}",
                w.start.format("%Y-%m-%d %H:%M"),
                w.end.format("%Y-%m-%d %H:%M")
            )
        })
        .unwrap_or_default();
    format!(
        "[{}] #{} {} ({}){}",
        completion_char(task),
        task.id,
        task.title,
        task.priority,
        schedule
    )
}

/// Format detailed task view
pub fn format_task_detail(task: &Task) -> Vec<String> {
    let mut lines = vec![format!("#{} {}", task.id, task.title)];
    lines.push(format!("status: {}", task.status));
    lines.push(format!("priority: {}", task.priority));
    lines.push(format!("completed: {}", if task.is_completed { "yes" } else { "no" }));
    if let Some(project) = task.project_id {
        lines.push(format!("project: {}", project));
    }
    if let Some(w) = task.schedule {
        lines.push(format!("start: {}", w.start.to_rfc3339()));
        lines.push(format!("end: {}", w.end.to_rfc3339()));
    }
    lines.push(format!("updated: {}", task.updated_at.to_rfc3339()));
    if let Some(desc) = &task.description {
        lines.push(String::new());
        lines.extend(desc.lines().map(str::to_string));
    }
    lines
}

/// Format the board: one block per visible column, in column order
pub fn format_board(columns: &[ColumnView<'_>]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, view) in columns.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("{} ({})", view.column.title, view.tasks.len()));
        if view.tasks.is_empty() {
            lines.push("  -".to_string());
        }
        for task in &view.tasks {
            lines.push(format!("  {}", format_task_line(task)));
        }
    }
    lines
}
