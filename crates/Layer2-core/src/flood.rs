//! Flood Controller - load shedding by queue depth
//!
//! Two thresholds on queue depth:
//! - above the deluge mark, bursty event types are admitted only from the
//!   locus of focus
//! - above the flood mark, a prioritizable event prunes the queue down to
//!   what concerns the focus, and dispatch skips everything else

use crate::focus::FocusState;
use crate::queue::{EventQueue, QueueEntry};
use beacon_foundation::{AxObject, Notification, PipelineConfig, Role};
use tracing::info;

/// Inherently bursty, low-value event types (exact match)
pub const FLOODABLE_EVENT_TYPES: &[&str] = &[
    "object:text-changed:delete",
    "object:text-changed:insert",
    "object:text-changed:delete:system",
    "object:text-changed:insert:system",
    "object:text-attributes-changed",
    "object:text-caret-moved",
    "object:children-changed:add",
    "object:children-changed:add:system",
    "object:children-changed:remove",
    "object:children-changed:remove:system",
    "object:property-change:accessible-name",
    "object:property-change:accessible-description",
    "object:selection-changed",
    "object:state-changed:showing",
    "object:state-changed:sensitive",
];

#[derive(Debug, Clone, Copy)]
pub struct FloodController {
    deluge_threshold: usize,
    flood_threshold: usize,
}

impl FloodController {
    pub fn new(deluge_threshold: usize, flood_threshold: usize) -> Self {
        Self {
            deluge_threshold,
            flood_threshold,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.deluge_threshold, config.flood_threshold)
    }

    pub fn in_deluge(&self, depth: usize) -> bool {
        depth > self.deluge_threshold
    }

    pub fn in_flood(&self, depth: usize) -> bool {
        depth > self.flood_threshold
    }

    pub fn is_floodable(event: &Notification) -> bool {
        FLOODABLE_EVENT_TYPES.contains(&event.event_type.as_str())
    }

    /// Drop at admission while in deluge?
    pub fn ignore_during_deluge(event: &Notification, focus: Option<&AxObject>) -> bool {
        Self::is_floodable(event) && !source_is(event, focus)
    }

    /// Keep-predicate shared by pruning and flood-time dispatch
    pub fn keep_during_flood(event: &Notification, focus: Option<&AxObject>) -> bool {
        if event.source.as_ref().is_some_and(|s| !s.is_live()) {
            return false;
        }
        !Self::is_floodable(event) || source_is(event, focus)
    }

    /// Should `event` trigger an immediate prune while in flood?
    pub fn prioritize_during_flood(event: &Notification) -> bool {
        if event.is_any(&["object:state-changed:focused", "object:state-changed:selected"]) {
            return event.detail1 != 0;
        }
        if event.is_any(&[
            "object:text-selection-changed",
            "window:activate",
            "window:deactivate",
            "document:load-complete",
            "object:state-changed:busy",
        ]) {
            return true;
        }
        if event.is("object:state-changed:active") {
            return event
                .source
                .as_ref()
                .is_some_and(|s| s.role_is(Role::Frame) || s.role_is(Role::Window));
        }
        false
    }

    /// Rebuild `queue` keeping focus-relevant entries in order.
    /// Returns the removed entries, in order.
    pub fn prune(&self, queue: &mut EventQueue, focus: &FocusState) -> Vec<QueueEntry> {
        let old_size = queue.len();
        let locus = focus.locus_of_focus();

        let removed = queue.retain(|entry| match entry.notification() {
            Some(event) => Self::keep_during_flood(event, locus.as_ref()),
            None => true,
        });

        info!(
            pruned = removed.len(),
            old_size,
            new_size = queue.len(),
            "Pruned event queue during flood"
        );
        removed
    }
}

impl Default for FloodController {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

fn source_is(event: &Notification, focus: Option<&AxObject>) -> bool {
    event.source_is(focus)
}
