use regex::{Regex, RegexBuilder};

use crate::model::query::ListFilter;
use crate::model::task::Task;

/// A [`ListFilter`] compiled for repeated matching.
///
/// Search text is matched literally (regex metacharacters escaped) and
/// case-insensitively against title and description.
#[derive(Debug, Clone)]
pub struct TaskMatcher {
    filter: ListFilter,
    search: Option<Regex>,
}

impl TaskMatcher {
    pub fn new(filter: &ListFilter) -> Self {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| {
                RegexBuilder::new(&regex::escape(s))
                    .case_insensitive(true)
                    .build()
                    .ok()
            });
        TaskMatcher {
            filter: filter.clone(),
            search,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        let f = &self.filter;
        if f.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if f.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if f.project_id.is_some() && f.project_id != task.project_id {
            return false;
        }
        if f.is_completed.is_some_and(|c| c != task.is_completed) {
            return false;
        }
        if let Some(re) = &self.search {
            let in_title = re.is_match(&task.title);
            let in_description = task.description.as_deref().is_some_and(|d| re.is_match(d));
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Priority, TaskStatus};
    use chrono::{TimeZone, Utc};

    fn task(id: u64, title: &str, status: TaskStatus) -> Task {
        Task::new(id, title, status, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn empty_filter_matches_everything() {
        let m = TaskMatcher::new(&ListFilter::default());
        assert!(m.matches(&task(1, "anything", TaskStatus::Todo)));
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let m = TaskMatcher::new(&ListFilter {
            search: Some("FIX (urgent)".into()),
            ..Default::default()
        });
        assert!(m.matches(&task(1, "please fix (urgent) now", TaskStatus::Todo)));
        assert!(!m.matches(&task(2, "fix urgent", TaskStatus::Todo)));
    }

    #[test]
    fn search_checks_description() {
        let m = TaskMatcher::new(&ListFilter {
            search: Some("invoice".into()),
            ..Default::default()
        });
        let mut t = task(1, "Billing", TaskStatus::Todo);
        assert!(!m.matches(&t));
        t.description = Some("Send the Invoice".into());
        assert!(m.matches(&t));
    }

    #[test]
    fn blank_search_is_ignored() {
        let m = TaskMatcher::new(&ListFilter {
            search: Some("   ".into()),
            ..Default::default()
        });
        assert!(m.matches(&task(1, "x", TaskStatus::Done)));
    }

    #[test]
    fn criteria_are_conjunctive() {
        let m = TaskMatcher::new(&ListFilter {
            status: Some(TaskStatus::Review),
            priority: Some(Priority::High),
            project_id: Some(3),
            ..Default::default()
        });
        let t = task(1, "x", TaskStatus::Review)
            .with_priority(Priority::High)
            .with_project(3);
        assert!(m.matches(&t));
        assert!(!m.matches(&t.clone().with_project(4)));
        assert!(!m.matches(&t.clone().with_priority(Priority::Low)));
        let mut moved = t;
        moved.status = TaskStatus::Done;
        assert!(!m.matches(&moved));
    }
}
