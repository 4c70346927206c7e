use serde::{Deserialize, Serialize};

use super::task::TaskStatus;

/// Configuration from taskboard.toml. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub drag: DragConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragConfig {
    /// Pointer travel (px) before a press becomes a drag
    #[serde(default = "default_activation_distance")]
    pub activation_distance: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        DragConfig {
            activation_distance: default_activation_distance(),
        }
    }
}

fn default_activation_distance() -> f64 {
    8.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Horizontal pixels per day
    #[serde(default = "default_day_width")]
    pub day_width: f64,
    /// Number of days rendered from the timeline origin
    #[serde(default = "default_timeline_days")]
    pub days: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            day_width: default_day_width(),
            days: default_timeline_days(),
        }
    }
}

fn default_day_width() -> f64 {
    100.0
}

fn default_timeline_days() -> u32 {
    28
}

/// A board column bound to one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default = "default_true")]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_columns")]
    pub columns: Vec<ColumnConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            columns: default_columns(),
        }
    }
}

impl BoardConfig {
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnConfig> {
        self.columns.iter().filter(|c| c.visible)
    }
}

fn default_columns() -> Vec<ColumnConfig> {
    let column = |id: &str, title: &str, status, visible| ColumnConfig {
        id: id.to_string(),
        title: title.to_string(),
        status,
        visible,
    };
    vec![
        column("backlog", "Backlog", TaskStatus::Backlog, false),
        column("todo", "To Do", TaskStatus::Todo, true),
        column("in_progress", "In Progress", TaskStatus::InProgress, true),
        column("review", "Review", TaskStatus::Review, true),
        column("done", "Done", TaskStatus::Done, true),
    ]
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Items per `list` page when the filter does not say
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Maximum ids accepted by one bulk call
    #[serde(default = "default_bulk_limit")]
    pub bulk_limit: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            page_size: default_page_size(),
            bulk_limit: default_bulk_limit(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

fn default_bulk_limit() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Row height in pixels
    #[serde(default = "default_row_height")]
    pub row_height: f64,
    /// Extra rows rendered above and below the visible band
    #[serde(default = "default_overscan")]
    pub overscan: usize,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        ViewportConfig {
            row_height: default_row_height(),
            overscan: default_overscan(),
        }
    }
}

fn default_row_height() -> f64 {
    56.0
}

fn default_overscan() -> usize {
    3
}
