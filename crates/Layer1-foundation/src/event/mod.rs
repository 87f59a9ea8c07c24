//! Event System - notification model shared by every layer
//!
//! ```text
//! bus ──▶ Notification ──▶ admission ──▶ queue ──▶ dispatch ──▶ script
//!                           (EventKind rules)
//! ```

pub mod kind;
pub mod types;

pub use kind::{DocumentEvent, EventKind, Property, WindowEvent};
pub use types::{
    AnyData, BrailleEvent, InputEvent, KeyboardEvent, Notification, NotificationId, QueuedEvent,
};
