use std::collections::HashSet;

use crate::model::intent::{BulkAction, IntentPayload, MutationIntent};
use crate::model::task::{ScheduleWindow, Task, TaskId, TaskPatch, TaskStatus};
use crate::ops::filter::TaskMatcher;

/// Error type for task operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("schedule must end after it starts")]
    InvalidSchedule,
    #[error("title must not be empty")]
    EmptyTitle,
}

/// What applying an intent to a collection did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentEffect {
    /// Targeted ids that were present in the collection
    pub touched: Vec<TaskId>,
    /// Ids that left the collection (deleted, or no longer match its filter)
    pub removed: Vec<TaskId>,
}

impl IntentEffect {
    pub fn is_noop(&self) -> bool {
        self.touched.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Single-task edits
// ---------------------------------------------------------------------------

/// Direct status set. Keeps `is_completed` in step: entering `done`
/// completes the task, leaving it reopens it.
pub fn set_status(task: &mut Task, status: TaskStatus) {
    if task.status == status {
        return;
    }
    let was_done = task.status == TaskStatus::Done;
    task.status = status;
    if status == TaskStatus::Done {
        task.is_completed = true;
    } else if was_done {
        task.is_completed = false;
    }
}

pub fn validate_schedule(window: &ScheduleWindow) -> Result<(), TaskError> {
    if window.end <= window.start {
        return Err(TaskError::InvalidSchedule);
    }
    Ok(())
}

/// Validate and apply a patch, as the authority does
pub fn apply_patch(task: &mut Task, patch: &TaskPatch) -> Result<(), TaskError> {
    if let Some(window) = &patch.schedule {
        validate_schedule(window)?;
    }
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(TaskError::EmptyTitle);
    }
    patch_fields(task, patch);
    Ok(())
}

/// Apply a patch without validation (optimistic path)
fn patch_fields(task: &mut Task, patch: &TaskPatch) {
    if let Some(status) = patch.status {
        set_status(task, status);
    }
    // An explicit completion flag wins over the status bookkeeping
    if let Some(done) = patch.is_completed {
        task.is_completed = done;
    }
    if let Some(window) = patch.schedule {
        task.schedule = Some(window);
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(title) = &patch.title {
        task.title = title.clone();
    }
    if let Some(project_id) = patch.project_id {
        task.project_id = Some(project_id);
    }
}

/// Apply a non-deleting bulk action to one task. Returns false for
/// `Delete`, which the caller has to handle by removing the task.
pub fn apply_bulk_action(task: &mut Task, action: &BulkAction) -> bool {
    match *action {
        BulkAction::Complete => {
            set_status(task, TaskStatus::Done);
            task.is_completed = true;
        }
        BulkAction::Delete => return false,
        BulkAction::Move(project_id) => task.project_id = Some(project_id),
        BulkAction::SetPriority(priority) => task.priority = priority,
        BulkAction::SetStatus(status) => set_status(task, status),
    }
    true
}

// ---------------------------------------------------------------------------
// Collection transforms
// ---------------------------------------------------------------------------

/// Apply an intent to every targeted task in a cached collection.
///
/// Ids absent from the collection are ignored. Tasks that are deleted, or
/// that stop matching the collection's filter, are removed; the relative
/// order of the remaining tasks is preserved.
pub fn apply_intent(tasks: &mut Vec<Task>, intent: &MutationIntent, matcher: &TaskMatcher) -> IntentEffect {
    let targets: HashSet<TaskId> = intent.task_ids.iter().copied().collect();
    let mut effect = IntentEffect::default();
    let mut doomed: HashSet<TaskId> = HashSet::new();

    for task in tasks.iter_mut().filter(|t| targets.contains(&t.id)) {
        effect.touched.push(task.id);
        let keep = match &intent.payload {
            IntentPayload::Container(status) => {
                set_status(task, *status);
                true
            }
            IntentPayload::Schedule(window) => {
                task.schedule = Some(*window);
                true
            }
            IntentPayload::Bulk(action) => apply_bulk_action(task, action),
            IntentPayload::Fields(patch) => {
                patch_fields(task, patch);
                true
            }
        };
        if !keep || !matcher.matches(task) {
            doomed.insert(task.id);
        }
    }

    if !doomed.is_empty() {
        tasks.retain(|t| {
            if doomed.contains(&t.id) {
                effect.removed.push(t.id);
                false
            } else {
                true
            }
        });
    }
    effect
}

pub fn find_task(tasks: &[Task], task_id: TaskId) -> Option<&Task> {
    tasks.iter().find(|t| t.id == task_id)
}

pub fn find_task_mut(tasks: &mut [Task], task_id: TaskId) -> Option<&mut Task> {
    tasks.iter_mut().find(|t| t.id == task_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::query::ListFilter;
    use crate::model::task::Priority;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample_tasks() -> Vec<Task> {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        vec![
            Task::new(1, "Write brief", TaskStatus::Backlog, now),
            Task::new(2, "Review brief", TaskStatus::Backlog, now),
            Task::new(3, "Ship", TaskStatus::Review, now),
        ]
    }

    fn all() -> TaskMatcher {
        TaskMatcher::new(&ListFilter::default())
    }

    #[test]
    fn test_set_status_done_completes() {
        let mut t = sample_tasks().remove(0);
        set_status(&mut t, TaskStatus::Done);
        assert!(t.is_completed);
        set_status(&mut t, TaskStatus::Review);
        assert!(!t.is_completed);
    }

    #[test]
    fn test_set_status_noop_same_status() {
        let mut t = sample_tasks().remove(0);
        t.is_completed = true;
        set_status(&mut t, TaskStatus::Backlog);
        assert!(t.is_completed);
    }

    #[test]
    fn test_apply_patch_rejects_inverted_schedule() {
        let mut t = sample_tasks().remove(0);
        let start = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        let patch = TaskPatch::schedule(ScheduleWindow::new(start, start - Duration::hours(1)));
        assert_eq!(apply_patch(&mut t, &patch), Err(TaskError::InvalidSchedule));
        assert!(t.schedule.is_none());
    }

    #[test]
    fn test_apply_patch_rejects_blank_title() {
        let mut t = sample_tasks().remove(0);
        let patch = TaskPatch {
            title: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(apply_patch(&mut t, &patch), Err(TaskError::EmptyTitle));
        assert_eq!(t.title, "Write brief");
    }

    #[test]
    fn test_apply_patch_explicit_completion_wins() {
        let mut t = sample_tasks().remove(0);
        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            is_completed: Some(false),
            ..Default::default()
        };
        apply_patch(&mut t, &patch).unwrap();
        assert_eq!(t.status, TaskStatus::Done);
        assert!(!t.is_completed);
    }

    #[test]
    fn test_apply_intent_move_container() {
        let mut tasks = sample_tasks();
        let intent = MutationIntent::move_container(vec![1], TaskStatus::Review);
        let effect = apply_intent(&mut tasks, &intent, &all());
        assert_eq!(effect.touched, vec![1]);
        assert!(effect.removed.is_empty());
        assert_eq!(tasks[0].status, TaskStatus::Review);
        assert_eq!(tasks[1].status, TaskStatus::Backlog);
    }

    #[test]
    fn test_apply_intent_ignores_unknown_ids() {
        let mut tasks = sample_tasks();
        let before = tasks.clone();
        let intent = MutationIntent::move_container(vec![42], TaskStatus::Done);
        let effect = apply_intent(&mut tasks, &intent, &all());
        assert!(effect.is_noop());
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_apply_intent_bulk_delete_removes() {
        let mut tasks = sample_tasks();
        let intent = MutationIntent::bulk(vec![1, 3], BulkAction::Delete);
        let effect = apply_intent(&mut tasks, &intent, &all());
        assert_eq!(effect.removed, vec![1, 3]);
        assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_apply_intent_drops_tasks_leaving_filter() {
        let mut tasks = sample_tasks();
        let matcher = TaskMatcher::new(&ListFilter {
            status: Some(TaskStatus::Backlog),
            ..Default::default()
        });
        let intent = MutationIntent::move_container(vec![2], TaskStatus::Done);
        let effect = apply_intent(&mut tasks, &intent, &matcher);
        assert_eq!(effect.removed, vec![2]);
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_apply_intent_bulk_priority_and_complete() {
        let mut tasks = sample_tasks();
        apply_intent(
            &mut tasks,
            &MutationIntent::bulk(vec![1, 2], BulkAction::SetPriority(Priority::High)),
            &all(),
        );
        assert!(tasks[..2].iter().all(|t| t.priority == Priority::High));
        apply_intent(&mut tasks, &MutationIntent::bulk(vec![3], BulkAction::Complete), &all());
        assert_eq!(tasks[2].status, TaskStatus::Done);
        assert!(tasks[2].is_completed);
    }

    #[test]
    fn test_find_task() {
        let mut tasks = sample_tasks();
        assert_eq!(find_task(&tasks, 2).map(|t| t.title.as_str()), Some("Review brief"));
        assert!(find_task(&tasks, 9).is_none());
        find_task_mut(&mut tasks, 3).unwrap().title = "Ship it".into();
        assert_eq!(tasks[2].title, "Ship it");
    }
}
