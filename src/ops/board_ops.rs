use crate::model::config::{BoardConfig, ColumnConfig};
use crate::model::task::{Task, TaskId};

/// One visible board column and the tasks displayed in it, top to bottom
#[derive(Debug)]
pub struct ColumnView<'a> {
    pub column: &'a ColumnConfig,
    pub tasks: Vec<&'a Task>,
}

/// Group tasks into the visible columns of a board.
///
/// Tasks whose status belongs to a hidden column are not displayed. Tasks
/// whose status has no column at all land in the first visible column.
pub fn group_by_column<'a>(tasks: &'a [Task], board: &'a BoardConfig) -> Vec<ColumnView<'a>> {
    let mut views: Vec<ColumnView<'a>> = board
        .visible_columns()
        .map(|column| ColumnView {
            column,
            tasks: Vec::new(),
        })
        .collect();
    if views.is_empty() {
        return views;
    }

    for task in tasks {
        if let Some(view) = views.iter_mut().find(|v| v.column.status == task.status) {
            view.tasks.push(task);
        } else if !board.columns.iter().any(|c| c.status == task.status) {
            views[0].tasks.push(task);
        }
    }
    views
}

/// Ids in on-screen order: columns left to right, each top to bottom.
pub fn board_order(tasks: &[Task], board: &BoardConfig) -> Vec<TaskId> {
    group_by_column(tasks, board)
        .iter()
        .flat_map(|v| v.tasks.iter().map(|t| t.id))
        .collect()
}
