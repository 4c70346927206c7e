pub mod cache;
pub mod coordinator;
pub mod drag;
pub mod listeners;
pub mod selection;
pub mod session;
pub mod window;

pub use cache::{CacheEvent, CacheEventKind, QueryCache};
pub use coordinator::{Coordinator, Notification, NotificationLevel, PendingMutation, Settlement};
pub use drag::{DragController, DragOutcome, DragPhase, HitRegions, Point, Rect};
pub use selection::{SelectModifier, Selection, SelectionChange};
pub use session::{BoardSession, Release};
