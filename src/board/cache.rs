use std::collections::HashSet;

use indexmap::IndexMap;

use crate::board::listeners::{ListenerId, Listeners};
use crate::model::query::{ListFilter, QueryKey};
use crate::model::task::{Task, TaskId};

/// Identifies one optimistic mutation for the lifetime of a coordinator
pub type MutationId = u64;

/// Why a cached collection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// First fetch or an explicit reload
    Loaded,
    /// Next page appended
    Extended,
    /// Optimistic transform applied
    Optimistic,
    /// Snapshot restored after a failed write
    RolledBack,
    /// Replaced by authoritative data
    Refetched,
}

/// Delivered to subscribers of a query key after every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: QueryKey,
    pub kind: CacheEventKind,
    /// Ids that were in the collection before the change and are not after
    pub removed: Vec<TaskId>,
}

/// Cached state of one query key
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Filter the collection was fetched with
    pub filter: ListFilter,
    /// Current visible state, in authority order
    pub tasks: Vec<Task>,
    /// Cursor for the next unfetched page
    pub next_page_token: Option<String>,
    /// Number of pages fetched so far (refetch reloads this many)
    pub pages_loaded: usize,
    /// Bumped by every optimistic begin; refetch tickets from an older
    /// generation are discarded
    pub(crate) generation: u64,
    /// Set on settle; cleared by a successful refetch
    pub(crate) stale: bool,
    /// Mutations begun and not yet settled, oldest first
    pub(crate) in_flight: Vec<MutationId>,
    /// Most recently begun mutation; only it may roll back
    pub(crate) latest_mutation: Option<MutationId>,
}

impl CacheEntry {
    pub fn new(filter: ListFilter) -> Self {
        CacheEntry {
            filter,
            tasks: Vec::new(),
            next_page_token: None,
            pages_loaded: 0,
            generation: 0,
            stale: false,
            in_flight: Vec::new(),
            latest_mutation: None,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    /// Replace the visible tasks, returning the ids that disappeared
    pub(crate) fn replace_tasks(&mut self, tasks: Vec<Task>) -> Vec<TaskId> {
        let after: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
        let removed = self
            .tasks
            .iter()
            .map(|t| t.id)
            .filter(|id| !after.contains(id))
            .collect();
        self.tasks = tasks;
        removed
    }
}

/// Per-key store of cached collections with change subscriptions
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: IndexMap<QueryKey, CacheEntry>,
    subscribers: IndexMap<QueryKey, Listeners<CacheEvent>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Cached tasks for a key, empty if the key was never loaded
    pub fn tasks(&self, key: &QueryKey) -> &[Task] {
        self.entries.get(key).map(|e| e.tasks.as_slice()).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.keys()
    }

    pub fn subscribe(&mut self, key: &QueryKey, listener: impl FnMut(&CacheEvent) + 'static) -> ListenerId {
        self.subscribers.entry(key.clone()).or_default().add(listener)
    }

    pub fn unsubscribe(&mut self, key: &QueryKey, id: ListenerId) -> bool {
        self.subscribers.get_mut(key).is_some_and(|l| l.remove(id))
    }

    pub(crate) fn entry_mut(&mut self, key: &QueryKey) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    pub(crate) fn insert(&mut self, key: QueryKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    pub(crate) fn notify(&mut self, key: &QueryKey, kind: CacheEventKind, removed: Vec<TaskId>) {
        if let Some(listeners) = self.subscribers.get_mut(key) {
            listeners.emit(&CacheEvent {
                key: key.clone(),
                kind,
                removed,
            });
        }
    }
}
