//! Pointer gesture interpretation.
//!
//! A press on a task arms a session; travel past the activation distance
//! turns it into a drag; the release either commits one [`MutationIntent`]
//! or leaves nothing behind. The controller never touches the cache or the
//! remote service. Committed intents are returned from [`DragController::pointer_up`]
//! and also delivered to `on_intent_committed` listeners.

use crate::board::listeners::{ListenerId, Listeners};
use crate::board::selection::Selection;
use crate::model::config::DragConfig;
use crate::model::intent::MutationIntent;
use crate::model::task::{ScheduleWindow, TaskId, TaskStatus};
use crate::ops::schedule::{self, BarGeometry, TimelineScale};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned box, half-open on the right and bottom edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// What lies under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// A task card, and the column it currently sits in
    Item(TaskId, TaskStatus),
    Column(TaskStatus),
}

impl HitTarget {
    pub fn status(self) -> TaskStatus {
        match self {
            HitTarget::Item(_, status) | HitTarget::Column(status) => status,
        }
    }
}

/// Drop targets of the current layout, as laid out by the renderer
#[derive(Debug, Clone, Default)]
pub struct HitRegions {
    columns: Vec<(TaskStatus, Rect)>,
    items: Vec<(TaskId, TaskStatus, Rect)>,
}

impl HitRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, status: TaskStatus, rect: Rect) -> Self {
        self.columns.push((status, rect));
        self
    }

    pub fn with_item(mut self, id: TaskId, status: TaskStatus, rect: Rect) -> Self {
        self.items.push((id, status, rect));
        self
    }

    /// Items take priority over the column they sit in
    pub fn hit_test(&self, p: Point) -> Option<HitTarget> {
        if let Some((id, status, _)) = self.items.iter().find(|(_, _, r)| r.contains(p)) {
            return Some(HitTarget::Item(*id, *status));
        }
        self.columns
            .iter()
            .find(|(_, r)| r.contains(p))
            .map(|(status, _)| HitTarget::Column(*status))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    /// Pressed, not yet past the activation distance
    Armed,
    Dragging,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragMode {
    /// Board drag between status columns
    Container {
        original: TaskStatus,
        candidate: TaskStatus,
    },
    /// Timeline drag along the time axis
    Schedule {
        original: ScheduleWindow,
        scale: TimelineScale,
    },
}

/// One gesture in progress
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub active: TaskId,
    pub origin: Point,
    pub current: Point,
    /// Tasks that move together: the whole selection when the active task
    /// is part of a multi-selection
    pub group: Vec<TaskId>,
    pub mode: DragMode,
    activated: bool,
}

impl DragSession {
    pub fn delta_x(&self) -> f64 {
        self.current.x - self.origin.x
    }
}

/// What the renderer should show while dragging
#[derive(Debug, Clone, PartialEq)]
pub enum DragPreview {
    /// Still below the activation distance
    Pending,
    Container {
        candidate: TaskStatus,
        group: Vec<TaskId>,
    },
    /// Ghost bar follows the pointer unsnapped
    Schedule { ghost: BarGeometry, delta_days: f64 },
}

/// How a gesture ended
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Released before activation: a selection click on the task
    Click(TaskId),
    Committed(MutationIntent),
    Cancelled,
}

#[derive(Debug, Default)]
pub struct DragController {
    config: DragConfig,
    session: Option<DragSession>,
    /// Focus was lost mid-gesture; the pointer-up may never arrive
    pointer_lost: bool,
    listeners: Listeners<MutationIntent>,
}

impl DragController {
    pub fn new(config: DragConfig) -> Self {
        DragController {
            config,
            ..Default::default()
        }
    }

    pub fn on_intent_committed(&mut self, listener: impl FnMut(&MutationIntent) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn phase(&self) -> DragPhase {
        match &self.session {
            None => DragPhase::Idle,
            Some(s) if s.activated => DragPhase::Dragging,
            Some(_) => DragPhase::Armed,
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Press on a board card
    pub fn pointer_down_container(&mut self, id: TaskId, status: TaskStatus, at: Point, selection: &Selection) {
        self.resolve_lost_pointer();
        let group = if selection.is_selected(id) && selection.count() > 1 {
            selection.members()
        } else {
            vec![id]
        };
        self.arm(DragSession {
            active: id,
            origin: at,
            current: at,
            group,
            mode: DragMode::Container {
                original: status,
                candidate: status,
            },
            activated: false,
        });
    }

    /// Press on a timeline bar
    pub fn pointer_down_schedule(&mut self, id: TaskId, window: ScheduleWindow, scale: TimelineScale, at: Point) {
        self.resolve_lost_pointer();
        self.arm(DragSession {
            active: id,
            origin: at,
            current: at,
            group: vec![id],
            mode: DragMode::Schedule {
                original: window,
                scale,
            },
            activated: false,
        });
    }

    /// Track the pointer. Returns None when no gesture is in progress.
    pub fn pointer_move(&mut self, at: Point, regions: &HitRegions) -> Option<DragPreview> {
        if self.pointer_lost {
            return None;
        }
        let threshold = self.config.activation_distance;
        let session = self.session.as_mut()?;
        session.current = at;

        if !session.activated {
            if session.origin.distance(at) <= threshold {
                return Some(DragPreview::Pending);
            }
            session.activated = true;
            tracing::debug!(task = session.active, group = session.group.len(), "drag activated");
        }

        match &mut session.mode {
            DragMode::Container { candidate, .. } => {
                if let Some(target) = regions.hit_test(at) {
                    if *candidate != target.status() {
                        tracing::trace!(task = session.active, candidate = %target.status(), "drop candidate changed");
                    }
                    *candidate = target.status();
                }
                Some(DragPreview::Container {
                    candidate: *candidate,
                    group: session.group.clone(),
                })
            }
            DragMode::Schedule { original, scale } => {
                let delta_px = at.x - session.origin.x;
                let bar = scale.bar(original);
                Some(DragPreview::Schedule {
                    ghost: BarGeometry {
                        left: bar.left + delta_px,
                        width: bar.width,
                    },
                    delta_days: scale.pixels_to_days(delta_px),
                })
            }
        }
    }

    /// Release. The session ends whatever the outcome.
    pub fn pointer_up(&mut self, at: Point) -> DragOutcome {
        let Some(mut session) = self.session.take() else {
            return DragOutcome::Cancelled;
        };
        if std::mem::take(&mut self.pointer_lost) {
            tracing::debug!(task = session.active, "release after focus loss; cancelled");
            return DragOutcome::Cancelled;
        }
        session.current = at;
        if !session.activated {
            return DragOutcome::Click(session.active);
        }

        let intent = match session.mode {
            DragMode::Container { original, candidate } if candidate != original => {
                Some(MutationIntent::move_container(session.group, candidate))
            }
            DragMode::Container { .. } => None,
            DragMode::Schedule { original, scale } => {
                let snapped = schedule::snap_half_days(scale.pixels_to_days(at.x - session.origin.x));
                (snapped != 0.0)
                    .then(|| MutationIntent::reschedule(session.active, schedule::reschedule(&original, snapped)))
            }
        };

        match intent {
            Some(intent) => {
                tracing::debug!(kind = %intent.kind(), ids = ?intent.task_ids, "drag committed");
                self.listeners.emit(&intent);
                DragOutcome::Committed(intent)
            }
            None => {
                tracing::debug!(task = session.active, "drag released without change");
                DragOutcome::Cancelled
            }
        }
    }

    /// Escape, or pointer capture lost
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(task = session.active, "drag cancelled");
        }
        self.pointer_lost = false;
    }

    /// Window lost focus. An in-progress gesture is cancelled on the next
    /// focus or pointer-down unless its release arrives first.
    pub fn blur(&mut self) {
        if self.session.is_some() {
            self.pointer_lost = true;
        }
    }

    pub fn focus(&mut self) {
        self.resolve_lost_pointer();
    }

    fn resolve_lost_pointer(&mut self) {
        if std::mem::take(&mut self.pointer_lost) {
            if let Some(session) = self.session.take() {
                tracing::debug!(task = session.active, "pointer-up lost; drag cancelled");
            }
        }
    }

    fn arm(&mut self, session: DragSession) {
        if let Some(stale) = self.session.replace(session) {
            tracing::debug!(task = stale.active, "unreleased drag discarded");
        }
    }
}
