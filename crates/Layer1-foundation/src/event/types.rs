//! Event Types - notifications and input events flowing through the pipeline

use crate::accessible::{AxObject, ObjectId};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// NotificationId
// ============================================================================

static NEXT_NOTIFICATION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of a notification. Not part of duplicate equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    fn next() -> Self {
        Self(NEXT_NOTIFICATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// ============================================================================
// AnyData
// ============================================================================

/// Type-dependent payload of a notification
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnyData {
    #[default]
    None,
    Text(String),
    Bool(bool),
    Object(AxObject),
}

impl AnyData {
    pub fn as_object(&self) -> Option<&AxObject> {
        match self {
            AnyData::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AnyData::None)
    }
}

// ============================================================================
// Notification
// ============================================================================

/// One accessibility-bus event record
#[derive(Clone)]
pub struct Notification {
    pub id: NotificationId,

    /// Hierarchical type, e.g. `object:state-changed:focused`
    pub event_type: String,

    /// Object that emitted the event. May already be dead.
    pub source: Option<AxObject>,

    pub detail1: i32,

    pub detail2: i32,

    pub any_data: AnyData,

    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(event_type: impl Into<String>, source: Option<AxObject>) -> Self {
        Self {
            id: NotificationId::next(),
            event_type: event_type.into(),
            source,
            detail1: 0,
            detail2: 0,
            any_data: AnyData::None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, detail1: i32, detail2: i32) -> Self {
        self.detail1 = detail1;
        self.detail2 = detail2;
        self
    }

    pub fn with_any_data(mut self, any_data: AnyData) -> Self {
        self.any_data = any_data;
        self
    }

    /// Prefix match on the type string
    pub fn is(&self, prefix: &str) -> bool {
        self.event_type.starts_with(prefix)
    }

    pub fn is_any(&self, prefixes: &[impl AsRef<str>]) -> bool {
        prefixes.iter().any(|p| self.is(p.as_ref()))
    }

    /// Type, source, both details and payload all equal
    pub fn is_duplicate_of(&self, other: &Notification) -> bool {
        self.event_type == other.event_type
            && self.source == other.source
            && self.detail1 == other.detail1
            && self.detail2 == other.detail2
            && self.any_data == other.any_data
    }

    pub fn source_is(&self, obj: Option<&AxObject>) -> bool {
        match (&self.source, obj) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn source_id(&self) -> Option<ObjectId> {
        self.source.as_ref().map(AxObject::id)
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}({}, {}) source={:?}",
            self.id, self.event_type, self.detail1, self.detail2, self.source
        )?;
        if !self.any_data.is_none() {
            write!(f, " any_data={:?}", self.any_data)?;
        }
        Ok(())
    }
}

// ============================================================================
// Input events
// ============================================================================

/// Keyboard press or release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub pressed: bool,
    pub keyval: u32,
    pub keycode: u32,
    pub modifiers: u32,
    pub event_string: String,
}

/// Command from a braille display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrailleEvent {
    pub command: u32,
    pub args: Vec<i32>,
}

/// Events from input devices, routed straight to the input path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Keyboard(KeyboardEvent),
    Braille(BrailleEvent),
}

/// Anything that can sit in the event queue
#[derive(Debug, Clone)]
pub enum QueuedEvent {
    Object(Notification),
    Input(InputEvent),
}

impl QueuedEvent {
    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            QueuedEvent::Object(n) => Some(n),
            QueuedEvent::Input(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_ignores_id_and_timestamp() {
        let src = Some(AxObject::dangling(ObjectId(4)));
        let a = Notification::new("object:state-changed:focused", src.clone()).with_details(1, 0);
        let b = Notification::new("object:state-changed:focused", src).with_details(1, 0);

        assert_ne!(a.id, b.id);
        assert!(a.is_duplicate_of(&b));
    }

    #[test]
    fn test_duplicate_compares_payload() {
        let a = Notification::new("object:text-changed:insert", None)
            .with_any_data(AnyData::Text("a".into()));
        let b = Notification::new("object:text-changed:insert", None)
            .with_any_data(AnyData::Text("b".into()));

        assert!(!a.is_duplicate_of(&b));
    }

    #[test]
    fn test_prefix_matching() {
        let n = Notification::new("object:children-changed:add:system", None);
        assert!(n.is("object:children-changed"));
        assert!(n.is_any(&["window:", "object:children-changed:add"]));
        assert!(!n.is("object:children-changed:remove"));
    }
}
