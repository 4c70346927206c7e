use crate::model::intent::BulkAction;
use crate::model::query::{ListFilter, Page};
use crate::model::task::{Task, TaskId, TaskPatch};

/// Failure reported by the remote authority
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never got a usable answer
    #[error("network error: {0}")]
    Network(String),
    /// The authority refused the write (validation, permission)
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("task not found: {0}")]
    NotFound(TaskId),
}

impl RemoteError {
    /// Whether the same request could succeed if the user tries again
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Network(_))
    }
}

/// The remote task authority, seen through its request/response shape only.
///
/// Every call is a single request. Implementations must not retry on their
/// own; the coordinator relies on each write being submitted once.
pub trait TaskService {
    fn list(&self, filter: &ListFilter) -> Result<Page<Task>, RemoteError>;

    fn get(&self, id: TaskId) -> Result<Task, RemoteError>;

    fn patch(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Task, RemoteError>;

    fn bulk_patch(&mut self, ids: &[TaskId], action: &BulkAction) -> Result<(), RemoteError>;

    fn delete(&mut self, id: TaskId) -> Result<(), RemoteError>;
}
