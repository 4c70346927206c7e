use std::collections::HashSet;
use std::ops::Range;

use chrono::{DateTime, Utc};

use crate::board::coordinator::{Coordinator, Settlement};
use crate::board::drag::{DragController, DragOutcome, DragPreview, HitRegions, Point};
use crate::board::selection::{SelectModifier, Selection};
use crate::board::window;
use crate::io::service::{RemoteError, TaskService};
use crate::model::config::EngineConfig;
use crate::model::intent::{BulkAction, MutationIntent};
use crate::model::query::{ListFilter, QueryKey};
use crate::model::task::{Task, TaskId};
use crate::ops::board_ops::{self, ColumnView};
use crate::ops::schedule::{BarGeometry, TimelineScale};
use crate::ops::task_ops;

/// How a pointer release was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Treated as a selection click on the task
    Clicked(TaskId),
    Applied(Settlement),
    Cancelled,
}

/// One view over one query key: the cache, the selection and the pointer
/// state for that view, wired to a task service.
///
/// Every mutation goes through the coordinator; the selection is pruned
/// after each one so it never names a task the view no longer shows.
#[derive(Debug)]
pub struct BoardSession<S> {
    service: S,
    key: QueryKey,
    config: EngineConfig,
    coordinator: Coordinator,
    selection: Selection,
    drag: DragController,
    scale: TimelineScale,
}

impl<S: TaskService> BoardSession<S> {
    /// Load the first page of `filter` and start an empty selection
    pub fn open(
        service: S,
        key: QueryKey,
        filter: ListFilter,
        config: EngineConfig,
        timeline_origin: DateTime<Utc>,
    ) -> Result<Self, RemoteError> {
        let mut coordinator = Coordinator::new();
        coordinator.load(&service, &key, filter)?;
        let drag = DragController::new(config.drag.clone());
        let scale = TimelineScale::new(timeline_origin, config.timeline.day_width);
        Ok(BoardSession {
            service,
            key,
            config,
            coordinator,
            selection: Selection::new(),
            drag,
            scale,
        })
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// For registering cache and notification listeners
    pub fn coordinator_mut(&mut self) -> &mut Coordinator {
        &mut self.coordinator
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// For registering selection listeners
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn drag_mut(&mut self) -> &mut DragController {
        &mut self.drag
    }

    pub fn scale(&self) -> &TimelineScale {
        &self.scale
    }

    pub fn tasks(&self) -> &[Task] {
        self.coordinator.tasks(&self.key)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        task_ops::find_task(self.tasks(), id)
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    pub fn columns(&self) -> Vec<ColumnView<'_>> {
        board_ops::group_by_column(self.tasks(), &self.config.board)
    }

    /// Ids in on-screen board order; range selection runs over this
    pub fn display_order(&self) -> Vec<TaskId> {
        board_ops::board_order(self.tasks(), &self.config.board)
    }

    /// Bars of scheduled tasks, in cache order
    pub fn timeline_bars(&self) -> Vec<(TaskId, BarGeometry)> {
        self.tasks()
            .iter()
            .filter_map(|t| t.schedule.map(|w| (t.id, self.scale.bar(&w))))
            .collect()
    }

    /// Rows of a column of `rows` cards to render at the given scroll offset
    pub fn visible_rows(&self, rows: usize, viewport_height: f64, scroll_offset: f64) -> Range<usize> {
        let vp = &self.config.viewport;
        window::visible_range(rows, vp.row_height, viewport_height, scroll_offset, vp.overscan)
    }

    /// Scroll offset in pixels that keeps row `cursor` fully on screen
    pub fn reveal_row(&self, cursor: usize, viewport_height: f64, scroll_offset: f64) -> f64 {
        let row_height = self.config.viewport.row_height;
        let first = (scroll_offset.max(0.0) / row_height).floor() as usize;
        let fits = (viewport_height / row_height).floor().max(0.0) as usize;
        window::scroll_to_reveal(cursor, first, fits) as f64 * row_height
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn click(&mut self, id: TaskId, modifier: SelectModifier) {
        let order = self.display_order();
        self.selection.toggle_with_modifiers(id, modifier, &order);
    }

    pub fn select_all(&mut self) {
        let order = self.display_order();
        self.selection.select_all(&order);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    /// Press on a board card. Returns false if the task is not displayed.
    pub fn board_pointer_down(&mut self, id: TaskId, at: Point) -> bool {
        let Some(status) = self.task(id).map(|t| t.status) else {
            return false;
        };
        self.drag.pointer_down_container(id, status, at, &self.selection);
        true
    }

    /// Press on a timeline bar. Returns false for unknown or unscheduled tasks.
    pub fn timeline_pointer_down(&mut self, id: TaskId, at: Point) -> bool {
        let Some(window) = self.task(id).and_then(|t| t.schedule) else {
            return false;
        };
        self.drag.pointer_down_schedule(id, window, self.scale, at);
        true
    }

    pub fn pointer_move(&mut self, at: Point, regions: &HitRegions) -> Option<DragPreview> {
        self.drag.pointer_move(at, regions)
    }

    /// Release. A click updates the selection with `modifier`; a committed
    /// drag is applied through the coordinator.
    pub fn pointer_up(&mut self, at: Point, modifier: SelectModifier) -> Release {
        match self.drag.pointer_up(at) {
            DragOutcome::Click(id) => {
                self.click(id, modifier);
                Release::Clicked(id)
            }
            DragOutcome::Committed(intent) => Release::Applied(self.apply(intent)),
            DragOutcome::Cancelled => Release::Cancelled,
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    pub fn blur(&mut self) {
        self.drag.blur();
    }

    pub fn focus(&mut self) {
        self.drag.focus();
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Apply an intent and prune the selection against the settled cache
    pub fn apply(&mut self, intent: MutationIntent) -> Settlement {
        let settlement = self.coordinator.apply(&mut self.service, &self.key, intent);
        self.prune_selection();
        settlement
    }

    /// Run a bulk action over the selection, in display order. The
    /// selection is cleared when the action commits.
    pub fn bulk(&mut self, action: BulkAction) -> Settlement {
        let ids = self.selection.selected_in_order(&self.display_order());
        if ids.is_empty() {
            return Settlement::Skipped;
        }
        if ids.len() > self.config.remote.bulk_limit {
            tracing::warn!(
                count = ids.len(),
                limit = self.config.remote.bulk_limit,
                "bulk selection exceeds the authority limit"
            );
        }
        let settlement = self.apply(MutationIntent::bulk(ids, action));
        if settlement == Settlement::Committed {
            self.selection.clear();
        }
        settlement
    }

    pub fn load_more(&mut self) -> Result<bool, RemoteError> {
        self.coordinator.load_more(&self.service, &self.key)
    }

    /// Refetch if a settled mutation left the key stale
    pub fn refresh(&mut self) -> bool {
        let refreshed = self.coordinator.refetch_due(&self.key) && self.coordinator.refetch(&self.service, &self.key);
        if refreshed {
            self.prune_selection();
        }
        refreshed
    }

    fn prune_selection(&mut self) {
        let present: HashSet<TaskId> = self.tasks().iter().map(|t| t.id).collect();
        let pruned = self.selection.prune(&present);
        if !pruned.is_empty() {
            tracing::debug!(pruned = ?pruned, "selection pruned");
        }
    }
}
