use std::fmt;

use serde::{Deserialize, Serialize};

use super::task::{Priority, TaskStatus};

/// Names one cached collection. Snapshot, rollback and refetch are all
/// scoped to a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(name: impl Into<String>) -> Self {
        QueryKey(name.into())
    }

    /// Key for the task list of a project (`tasks/<id>`), or of all tasks
    pub fn tasks(project_id: Option<u64>) -> Self {
        match project_id {
            Some(id) => QueryKey(format!("tasks/{}", id)),
            None => QueryKey("tasks".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filter passed to `list`. All criteria are conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    /// Case-insensitive substring of title or description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Page size override (authority default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Continuation cursor from a previous page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ListFilter {
    pub fn for_project(project_id: u64) -> Self {
        ListFilter {
            project_id: Some(project_id),
            ..Default::default()
        }
    }

    /// Same filter, positioned at the given cursor
    pub fn at_page(&self, token: Option<String>) -> Self {
        ListFilter {
            page_token: token,
            ..self.clone()
        }
    }
}

/// One page of a cursor-paginated `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Page {
            items,
            next_page_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_keys_are_scoped_by_project() {
        assert_eq!(QueryKey::tasks(None).as_str(), "tasks");
        assert_eq!(QueryKey::tasks(Some(7)).to_string(), "tasks/7");
        assert_ne!(QueryKey::tasks(Some(7)), QueryKey::tasks(Some(8)));
    }

    #[test]
    fn at_page_keeps_criteria() {
        let filter = ListFilter {
            status: Some(TaskStatus::Review),
            page_size: Some(5),
            ..Default::default()
        };
        let next = filter.at_page(Some("5".into()));
        assert_eq!(next.status, Some(TaskStatus::Review));
        assert_eq!(next.page_size, Some(5));
        assert_eq!(next.page_token.as_deref(), Some("5"));
    }

    #[test]
    fn filter_serde_defaults_on_empty_object() {
        let filter: ListFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, ListFilter::default());
    }
}
