use std::cell::Cell;
use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::io::service::{RemoteError, TaskService};
use crate::model::config::RemoteConfig;
use crate::model::intent::BulkAction;
use crate::model::query::{ListFilter, Page};
use crate::model::task::{Task, TaskId, TaskPatch, TaskStatus};
use crate::ops::filter::TaskMatcher;
use crate::ops::task_ops::{self, TaskError};

/// A write request as received by the authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    Patch(TaskId, TaskPatch),
    Bulk(Vec<TaskId>, BulkAction),
    Delete(TaskId),
}

/// In-process task authority with the same validation rules as the real
/// backend: bulk calls carry 1..=`bulk_limit` known ids, schedules must end
/// after they start, titles must not be blank.
///
/// Writes stamp `updated_at` from an internal clock that advances one
/// second per accepted write, so a client cannot predict it.
#[derive(Debug)]
pub struct InMemoryService {
    tasks: Vec<Task>,
    config: RemoteConfig,
    clock: DateTime<Utc>,
    next_id: TaskId,
    /// Errors returned by the next writes, oldest first
    failures: VecDeque<RemoteError>,
    offline: Cell<bool>,
    writes: Vec<WriteCall>,
}

impl InMemoryService {
    pub fn new(tasks: Vec<Task>, config: RemoteConfig) -> Self {
        let clock = tasks
            .iter()
            .map(|t| t.updated_at)
            .max()
            .unwrap_or_else(Utc::now);
        let next_id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        InMemoryService {
            tasks,
            config,
            clock,
            next_id,
            failures: VecDeque::new(),
            offline: Cell::new(false),
            writes: Vec::new(),
        }
    }

    /// Create a task the way the authority would, assigning the next id
    pub fn create(&mut self, title: impl Into<String>, status: TaskStatus) -> Task {
        let now = self.tick();
        let task = Task::new(self.next_id, title, status, now);
        self.next_id += 1;
        self.tasks.push(task.clone());
        task
    }

    /// Make the next write fail with `err`. Queued failures are consumed in order.
    pub fn fail_next_write(&mut self, err: RemoteError) {
        self.failures.push_back(err);
    }

    /// While offline every call fails with a network error
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Every write request received, including failed ones
    pub fn writes(&self) -> &[WriteCall] {
        &self.writes
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::seconds(1);
        self.clock
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.get() {
            return Err(RemoteError::Network("authority unreachable".to_string()));
        }
        Ok(())
    }

    fn receive(&mut self, call: WriteCall) -> Result<(), RemoteError> {
        self.writes.push(call);
        self.check_online()?;
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn position(&self, id: TaskId) -> Result<usize, RemoteError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(RemoteError::NotFound(id))
    }
}

impl From<TaskError> for RemoteError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound(id) => RemoteError::NotFound(id),
            other => RemoteError::Rejected(other.to_string()),
        }
    }
}

impl TaskService for InMemoryService {
    fn list(&self, filter: &ListFilter) -> Result<Page<Task>, RemoteError> {
        self.check_online()?;
        let offset = match filter.page_token.as_deref() {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| RemoteError::Rejected(format!("invalid page token: {}", token)))?,
            None => 0,
        };
        let page_size = filter.page_size.unwrap_or(self.config.page_size).max(1);
        let matcher = TaskMatcher::new(filter);
        let matching: Vec<&Task> = self.tasks.iter().filter(|t| matcher.matches(t)).collect();

        let items: Vec<Task> = matching
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|t| (*t).clone())
            .collect();
        let end = offset + items.len();
        let next_page_token = (end < matching.len()).then(|| end.to_string());
        Ok(Page {
            items,
            next_page_token,
        })
    }

    fn get(&self, id: TaskId) -> Result<Task, RemoteError> {
        self.check_online()?;
        let idx = self.position(id)?;
        Ok(self.tasks[idx].clone())
    }

    fn patch(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        self.receive(WriteCall::Patch(id, patch.clone()))?;
        let idx = self.position(id)?;
        let mut updated = self.tasks[idx].clone();
        task_ops::apply_patch(&mut updated, patch)?;
        updated.updated_at = self.tick();
        self.tasks[idx] = updated.clone();
        Ok(updated)
    }

    fn bulk_patch(&mut self, ids: &[TaskId], action: &BulkAction) -> Result<(), RemoteError> {
        self.receive(WriteCall::Bulk(ids.to_vec(), *action))?;
        if ids.is_empty() || ids.len() > self.config.bulk_limit {
            return Err(RemoteError::Rejected(format!(
                "bulk action accepts between 1 and {} ids",
                self.config.bulk_limit
            )));
        }
        for &id in ids {
            self.position(id)?;
        }

        let targets: HashSet<TaskId> = ids.iter().copied().collect();
        if *action == BulkAction::Delete {
            self.tasks.retain(|t| !targets.contains(&t.id));
            return Ok(());
        }
        let now = self.tick();
        for task in self.tasks.iter_mut().filter(|t| targets.contains(&t.id)) {
            task_ops::apply_bulk_action(task, action);
            task.updated_at = now;
        }
        Ok(())
    }

    fn delete(&mut self, id: TaskId) -> Result<(), RemoteError> {
        self.receive(WriteCall::Delete(id))?;
        let idx = self.position(id)?;
        self.tasks.remove(idx);
        Ok(())
    }
}
