//! Timeline geometry and reschedule snapping.
//!
//! Positions on the timeline are linear in time: `day_width` pixels per day
//! measured from the timeline origin. Drags snap to half-day steps, and a
//! moved task keeps its duration (never less than half a day).

use chrono::{DateTime, Duration, Utc};

use crate::model::task::ScheduleWindow;

/// Snap granularity, in days
pub const SNAP_DAYS: f64 = 0.5;

/// Shortest duration a scheduled bar can have, in days
pub const MIN_DURATION_DAYS: f64 = 0.5;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Horizontal placement of a task bar, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub left: f64,
    pub width: f64,
}

/// Maps between timeline pixels and wall-clock time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineScale {
    pub origin: DateTime<Utc>,
    pub day_width: f64,
}

impl TimelineScale {
    pub fn new(origin: DateTime<Utc>, day_width: f64) -> Self {
        TimelineScale { origin, day_width }
    }

    pub fn pixels_to_days(&self, px: f64) -> f64 {
        px / self.day_width
    }

    pub fn days_to_pixels(&self, days: f64) -> f64 {
        days * self.day_width
    }

    /// Bar placement for a window; short windows render at the minimum width
    pub fn bar(&self, window: &ScheduleWindow) -> BarGeometry {
        let start_days = duration_to_days(window.start - self.origin);
        let length_days = duration_to_days(window.duration()).max(MIN_DURATION_DAYS);
        BarGeometry {
            left: self.days_to_pixels(start_days),
            width: self.days_to_pixels(length_days),
        }
    }
}

/// Round a day offset to the nearest half day. Halfway cases round up,
/// toward later times, in both directions.
pub fn snap_half_days(days: f64) -> f64 {
    (days / SNAP_DAYS + 0.5).floor() * SNAP_DAYS
}

pub fn days_to_duration(days: f64) -> Duration {
    Duration::milliseconds((days * MILLIS_PER_DAY).round() as i64)
}

pub fn duration_to_days(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Shift a window by an already-snapped number of days, preserving its
/// duration (clamped up to the minimum).
pub fn reschedule(window: &ScheduleWindow, snapped_days: f64) -> ScheduleWindow {
    let duration = window.duration().max(days_to_duration(MIN_DURATION_DAYS));
    let start = window.start + days_to_duration(snapped_days);
    ScheduleWindow::new(start, start + duration)
}
