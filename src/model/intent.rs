use std::fmt;

use serde::{Deserialize, Serialize};

use super::task::{Priority, ScheduleWindow, TaskId, TaskPatch, TaskStatus};

/// Discriminant of a [`MutationIntent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentKind {
    MoveContainer,
    Reschedule,
    BulkPatch,
    /// Single-task field edit
    Patch,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentKind::MoveContainer => write!(f, "moveContainer"),
            IntentKind::Reschedule => write!(f, "reschedule"),
            IntentKind::BulkPatch => write!(f, "bulkPatch"),
            IntentKind::Patch => write!(f, "patch"),
        }
    }
}

/// Actions accepted by the authority's bulk endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum BulkAction {
    /// Mark done and completed
    Complete,
    Delete,
    /// Reassign to another project
    Move(u64),
    SetPriority(Priority),
    SetStatus(TaskStatus),
}

impl BulkAction {
    pub fn name(&self) -> &'static str {
        match self {
            BulkAction::Complete => "complete",
            BulkAction::Delete => "delete",
            BulkAction::Move(_) => "move",
            BulkAction::SetPriority(_) => "set_priority",
            BulkAction::SetStatus(_) => "set_status",
        }
    }

    /// Build an action from its wire name and optional value, the shape the
    /// bulk endpoint receives (`{ids, action, value}`).
    pub fn parse_action(action: &str, value: Option<&str>) -> Option<BulkAction> {
        match (action, value) {
            ("complete", _) => Some(BulkAction::Complete),
            ("delete", _) => Some(BulkAction::Delete),
            ("move", Some(v)) => v.parse().ok().map(BulkAction::Move),
            ("set_priority", Some(v)) => Priority::parse_priority(v).map(BulkAction::SetPriority),
            ("set_status", Some(v)) => TaskStatus::parse_status(v).map(BulkAction::SetStatus),
            _ => None,
        }
    }
}

/// What a mutation does to each targeted task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentPayload {
    Container(TaskStatus),
    Schedule(ScheduleWindow),
    Bulk(BulkAction),
    Fields(TaskPatch),
}

/// A committed, well-formed description of a desired mutation.
///
/// Built once per gesture or bulk action and consumed by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationIntent {
    pub task_ids: Vec<TaskId>,
    pub payload: IntentPayload,
}

impl IntentPayload {
    /// Schedule and field edits go through `patch`, one task per intent
    pub fn is_single_task(&self) -> bool {
        matches!(self, IntentPayload::Schedule(_) | IntentPayload::Fields(_))
    }
}

impl MutationIntent {
    pub fn move_container(task_ids: Vec<TaskId>, status: TaskStatus) -> Self {
        MutationIntent {
            task_ids,
            payload: IntentPayload::Container(status),
        }
    }

    pub fn reschedule(task_id: TaskId, window: ScheduleWindow) -> Self {
        MutationIntent {
            task_ids: vec![task_id],
            payload: IntentPayload::Schedule(window),
        }
    }

    pub fn bulk(task_ids: Vec<TaskId>, action: BulkAction) -> Self {
        MutationIntent {
            task_ids,
            payload: IntentPayload::Bulk(action),
        }
    }

    pub fn patch(task_id: TaskId, patch: TaskPatch) -> Self {
        MutationIntent {
            task_ids: vec![task_id],
            payload: IntentPayload::Fields(patch),
        }
    }

    pub fn kind(&self) -> IntentKind {
        match self.payload {
            IntentPayload::Container(_) => IntentKind::MoveContainer,
            IntentPayload::Schedule(_) => IntentKind::Reschedule,
            IntentPayload::Bulk(_) => IntentKind::BulkPatch,
            IntentPayload::Fields(_) => IntentKind::Patch,
        }
    }
}
