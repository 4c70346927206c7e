//! Optimistic mutation coordinator.
//!
//! Every mutating interaction goes through [`Coordinator::apply`], or through
//! its three phases when the caller owns the event loop:
//!
//! 1. [`Coordinator::begin`] invalidates outstanding refetch tickets for the
//!    key, snapshots the cached collection, and applies the intent locally.
//! 2. [`Coordinator::submit`] sends the equivalent request, once.
//! 3. [`Coordinator::settle`] commits or restores the snapshot, notifies, and
//!    marks the key for refetch.
//!
//! Rollback restores the snapshot taken immediately before that mutation
//! began, and only if no newer mutation has begun on the same key since. A
//! superseded failure is dropped; the refetch after the last settle brings
//! the cache back to authority state.

use crate::board::cache::{CacheEntry, CacheEventKind, MutationId, QueryCache};
use crate::board::listeners::{ListenerId, Listeners};
use crate::io::service::{RemoteError, TaskService};
use crate::model::intent::{BulkAction, IntentKind, IntentPayload, MutationIntent};
use crate::model::query::{ListFilter, QueryKey};
use crate::model::task::{Task, TaskId, TaskPatch};
use crate::ops::filter::TaskMatcher;
use crate::ops::task_ops;

/// A mutation that has been applied locally and awaits its remote outcome.
///
/// Owns the snapshot it will restore on failure; hand it back to
/// [`Coordinator::settle`] exactly once.
#[derive(Debug)]
#[must_use = "a pending mutation must be settled"]
pub struct PendingMutation {
    id: MutationId,
    key: QueryKey,
    intent: MutationIntent,
    snapshot: Vec<Task>,
}

impl PendingMutation {
    pub fn id(&self) -> MutationId {
        self.id
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// The intent as submitted: only ids that were present in the cache
    pub fn intent(&self) -> &MutationIntent {
        &self.intent
    }
}

/// How a mutation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The authority accepted the write
    Committed,
    /// The write failed and the snapshot was restored
    RolledBack(RemoteError),
    /// The write failed after a newer mutation began on the same key; the
    /// cache was left to the newer mutation
    Superseded(RemoteError),
    /// Nothing in the cache matched the intent; nothing was sent
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient, dismissible message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub key: QueryKey,
    pub kind: IntentKind,
    pub level: NotificationLevel,
    pub message: String,
    /// Offer a retry affordance (network failures only)
    pub retryable: bool,
}

/// Fetched pages, concatenated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub tasks: Vec<Task>,
    pub next_page_token: Option<String>,
    pub pages: usize,
}

/// Permission to install a refetch result, valid until the next optimistic
/// begin on the same key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefetchTicket {
    key: QueryKey,
    generation: u64,
    filter: ListFilter,
    pages: usize,
}

impl RefetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    pub fn pages(&self) -> usize {
        self.pages
    }
}

/// Owns the query cache and is its only writer
#[derive(Debug, Default)]
pub struct Coordinator {
    cache: QueryCache,
    next_mutation: MutationId,
    notifications: Listeners<Notification>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn tasks(&self, key: &QueryKey) -> &[Task] {
        self.cache.tasks(key)
    }

    pub fn subscribe(
        &mut self,
        key: &QueryKey,
        listener: impl FnMut(&crate::board::cache::CacheEvent) + 'static,
    ) -> ListenerId {
        self.cache.subscribe(key, listener)
    }

    pub fn on_notification(&mut self, listener: impl FnMut(&Notification) + 'static) -> ListenerId {
        self.notifications.add(listener)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Fetch the first page for `key` and install it, replacing any cached
    /// collection and invalidating outstanding refetch tickets.
    pub fn load(
        &mut self,
        service: &dyn TaskService,
        key: &QueryKey,
        filter: ListFilter,
    ) -> Result<(), RemoteError> {
        let fetched = fetch_pages(service, &filter, 1)?;
        let (generation, in_flight, latest) = match self.cache.get(key) {
            Some(e) => (e.generation + 1, e.in_flight.clone(), e.latest_mutation),
            None => (0, Vec::new(), None),
        };
        let mut entry = CacheEntry::new(filter);
        entry.generation = generation;
        entry.in_flight = in_flight;
        entry.latest_mutation = latest;
        entry.tasks = fetched.tasks;
        entry.next_page_token = fetched.next_page_token;
        entry.pages_loaded = fetched.pages;
        tracing::debug!(key = %key, count = entry.tasks.len(), "query loaded");
        self.cache.insert(key.clone(), entry);
        self.cache.notify(key, CacheEventKind::Loaded, Vec::new());
        Ok(())
    }

    /// Append the next page. Returns false when there is nothing left to load.
    pub fn load_more(&mut self, service: &dyn TaskService, key: &QueryKey) -> Result<bool, RemoteError> {
        let Some(entry) = self.cache.get(key) else {
            return Ok(false);
        };
        let Some(token) = entry.next_page_token.clone() else {
            return Ok(false);
        };
        let page = service.list(&entry.filter.at_page(Some(token)))?;

        let Some(entry) = self.cache.entry_mut(key) else {
            return Ok(false);
        };
        for task in page.items {
            if !entry.tasks.iter().any(|t| t.id == task.id) {
                entry.tasks.push(task);
            }
        }
        entry.next_page_token = page.next_page_token;
        entry.pages_loaded += 1;
        self.cache.notify(key, CacheEventKind::Extended, Vec::new());
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Mutation phases
    // -----------------------------------------------------------------------

    /// Run a mutation start to finish against `service`.
    ///
    /// Failures are converted to a rollback plus notification; they never
    /// escape as errors. The key is refetched after settle.
    pub fn apply(&mut self, service: &mut dyn TaskService, key: &QueryKey, intent: MutationIntent) -> Settlement {
        let Some(pending) = self.begin(key, intent) else {
            return Settlement::Skipped;
        };
        let outcome = Self::submit(service, &pending);
        let settlement = self.settle(pending, outcome);
        if self.refetch_due(key) {
            self.refetch(service, key);
        }
        settlement
    }

    /// Snapshot and apply `intent` locally. Returns None, leaving the cache
    /// untouched, if the key is not loaded, none of the intent's ids are
    /// cached, or a schedule or field edit names more than one task.
    pub fn begin(&mut self, key: &QueryKey, intent: MutationIntent) -> Option<PendingMutation> {
        if intent.payload.is_single_task() && intent.task_ids.len() != 1 {
            tracing::warn!(key = %key, kind = %intent.kind(), ids = ?intent.task_ids, "edit must target exactly one task; ignored");
            return None;
        }
        let Some(entry) = self.cache.entry_mut(key) else {
            tracing::warn!(key = %key, kind = %intent.kind(), "mutation for unloaded query ignored");
            return None;
        };

        let snapshot = entry.tasks.clone();
        let matcher = TaskMatcher::new(&entry.filter);
        let mut working = entry.tasks.clone();
        let effect = task_ops::apply_intent(&mut working, &intent, &matcher);
        if effect.is_noop() {
            tracing::debug!(key = %key, ids = ?intent.task_ids, "mutation targets no cached task; ignored");
            return None;
        }

        let id = self.next_mutation;
        self.next_mutation += 1;
        entry.generation += 1;
        entry.in_flight.push(id);
        entry.latest_mutation = Some(id);
        entry.tasks = working;

        tracing::debug!(
            key = %key,
            mutation = id,
            kind = %intent.kind(),
            touched = effect.touched.len(),
            removed = effect.removed.len(),
            "optimistic apply"
        );
        self.cache.notify(key, CacheEventKind::Optimistic, effect.removed);

        Some(PendingMutation {
            id,
            key: key.clone(),
            intent: MutationIntent {
                task_ids: effect.touched,
                payload: intent.payload,
            },
            snapshot,
        })
    }

    /// Send the request equivalent to a pending mutation. Single-task edits
    /// use `patch`; multi-task moves and bulk actions use one `bulk_patch`.
    pub fn submit(service: &mut dyn TaskService, pending: &PendingMutation) -> Result<(), RemoteError> {
        let ids = &pending.intent.task_ids;
        match &pending.intent.payload {
            IntentPayload::Container(status) => match ids.as_slice() {
                [id] => service.patch(*id, &TaskPatch::status(*status)).map(|_| ()),
                _ => service.bulk_patch(ids, &BulkAction::SetStatus(*status)),
            },
            IntentPayload::Schedule(window) => patch_one(service, ids, &TaskPatch::schedule(*window)),
            IntentPayload::Bulk(action) => service.bulk_patch(ids, action),
            IntentPayload::Fields(patch) => patch_one(service, ids, patch),
        }
    }

    /// Resolve a pending mutation with its remote outcome
    pub fn settle(&mut self, pending: PendingMutation, outcome: Result<(), RemoteError>) -> Settlement {
        let PendingMutation {
            id,
            key,
            intent,
            snapshot,
        } = pending;
        let Some(entry) = self.cache.entry_mut(&key) else {
            tracing::warn!(key = %key, mutation = id, "settle for evicted query dropped");
            return Settlement::Skipped;
        };
        entry.in_flight.retain(|m| *m != id);
        entry.stale = true;
        let owns_cache = entry.latest_mutation == Some(id);

        match outcome {
            Ok(()) => {
                tracing::debug!(key = %key, mutation = id, "mutation committed");
                self.notify(success_notification(&key, &intent));
                Settlement::Committed
            }
            Err(err) if owns_cache => {
                let removed = entry.replace_tasks(snapshot);
                tracing::warn!(key = %key, mutation = id, error = %err, "mutation failed; snapshot restored");
                self.cache.notify(&key, CacheEventKind::RolledBack, removed);
                self.notify(failure_notification(&key, &intent, &err));
                Settlement::RolledBack(err)
            }
            Err(err) => {
                tracing::debug!(key = %key, mutation = id, error = %err, "superseded mutation failed; result discarded");
                Settlement::Superseded(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Refetch
    // -----------------------------------------------------------------------

    /// Whether `key` was written to and has no mutation in flight
    pub fn refetch_due(&self, key: &QueryKey) -> bool {
        self.cache
            .get(key)
            .is_some_and(|e| e.stale && e.in_flight.is_empty())
    }

    /// Issue a refetch ticket. None while mutations on the key are in
    /// flight; the last settle leaves the key due instead.
    pub fn begin_refetch(&self, key: &QueryKey) -> Option<RefetchTicket> {
        let entry = self.cache.get(key)?;
        if !entry.in_flight.is_empty() {
            return None;
        }
        Some(RefetchTicket {
            key: key.clone(),
            generation: entry.generation,
            filter: entry.filter.clone(),
            pages: entry.pages_loaded.max(1),
        })
    }

    /// Install a refetch result. Returns false if it was discarded because
    /// an optimistic mutation began after the ticket was issued, or because
    /// the fetch failed.
    pub fn complete_refetch(&mut self, ticket: RefetchTicket, result: Result<Fetched, RemoteError>) -> bool {
        let RefetchTicket { key, generation, .. } = ticket;
        let Some(entry) = self.cache.entry_mut(&key) else {
            return false;
        };
        if entry.generation != generation || !entry.in_flight.is_empty() {
            tracing::debug!(key = %key, "stale refetch result discarded");
            return false;
        }
        let fetched = match result {
            Ok(f) => f,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "refetch failed; cache kept");
                return false;
            }
        };
        let removed = entry.replace_tasks(fetched.tasks);
        entry.next_page_token = fetched.next_page_token;
        entry.pages_loaded = fetched.pages;
        entry.stale = false;
        tracing::debug!(key = %key, count = entry.tasks.len(), "refetched");
        self.cache.notify(&key, CacheEventKind::Refetched, removed);
        true
    }

    /// Synchronous refetch: ticket, fetch, install
    pub fn refetch(&mut self, service: &dyn TaskService, key: &QueryKey) -> bool {
        let Some(ticket) = self.begin_refetch(key) else {
            return false;
        };
        let result = fetch_pages(service, ticket.filter(), ticket.pages());
        self.complete_refetch(ticket, result)
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.emit(&notification);
    }
}

/// Fetch up to `pages` pages starting from the beginning of `filter`
pub fn fetch_pages(service: &dyn TaskService, filter: &ListFilter, pages: usize) -> Result<Fetched, RemoteError> {
    let mut tasks = Vec::new();
    let mut token = None;
    let mut fetched = 0;
    loop {
        let page = service.list(&filter.at_page(token))?;
        tasks.extend(page.items);
        fetched += 1;
        token = page.next_page_token;
        if token.is_none() || fetched >= pages {
            break;
        }
    }
    Ok(Fetched {
        tasks,
        next_page_token: token,
        pages: fetched,
    })
}

fn patch_one(service: &mut dyn TaskService, ids: &[TaskId], patch: &TaskPatch) -> Result<(), RemoteError> {
    let [id] = ids else {
        return Err(RemoteError::Rejected(format!("patch takes one task, got {}", ids.len())));
    };
    service.patch(*id, patch).map(|_| ())
}

fn success_notification(key: &QueryKey, intent: &MutationIntent) -> Notification {
    let n = intent.task_ids.len();
    let message = match &intent.payload {
        IntentPayload::Container(status) if n == 1 => format!("Task moved to {}", status),
        IntentPayload::Container(status) => format!("{} tasks moved to {}", n, status),
        IntentPayload::Schedule(_) => "Task rescheduled".to_string(),
        IntentPayload::Bulk(action) => {
            let label = match action {
                BulkAction::Complete => "marked as complete",
                BulkAction::Delete => "deleted",
                BulkAction::SetStatus(_) => "status updated",
                BulkAction::SetPriority(_) | BulkAction::Move(_) => "updated",
            };
            format!("{} tasks {}", n, label)
        }
        IntentPayload::Fields(_) => "Task updated".to_string(),
    };
    Notification {
        key: key.clone(),
        kind: intent.kind(),
        level: NotificationLevel::Success,
        message,
        retryable: false,
    }
}

fn failure_notification(key: &QueryKey, intent: &MutationIntent, err: &RemoteError) -> Notification {
    let what = match intent.kind() {
        IntentKind::MoveContainer => "Failed to update task status",
        IntentKind::Reschedule => "Failed to reschedule task",
        IntentKind::BulkPatch => "Failed to perform bulk action",
        IntentKind::Patch => "Failed to update task",
    };
    let why = match err {
        RemoteError::Network(_) => "network error, try again".to_string(),
        RemoteError::Rejected(reason) => format!("rejected: {}", reason),
        RemoteError::NotFound(id) => format!("task {} no longer exists", id),
    };
    Notification {
        key: key.clone(),
        kind: intent.kind(),
        level: NotificationLevel::Error,
        message: format!("{}: {}", what, why),
        retryable: err.is_retryable(),
    }
}
