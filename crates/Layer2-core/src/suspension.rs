//! Suspension Coordinator - withdraws noisy listeners during transitions
//!
//! Window activation and busy documents are reliably followed by bursts of
//! children/name/showing/sensitive/text-delete events the scripts re-derive
//! anyway. While such a trigger is in flight those types are unsubscribed.
//! The bus sees one unsubscribe batch when the first trigger arrives and
//! one resubscribe batch when the last trigger finishes.

use crate::registry::ListenerRegistry;
use beacon_foundation::{EventKind, Notification, NotificationId, Role, StateSet, WindowEvent};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct SuspensionCoordinator {
    suspendable: Vec<String>,
    triggers: HashSet<NotificationId>,
    suspended: bool,
}

impl SuspensionCoordinator {
    pub fn new(suspendable: Vec<String>) -> Self {
        Self {
            suspendable,
            triggers: HashSet::new(),
            suspended: false,
        }
    }

    /// Window or frame becoming active, or a document turning busy
    pub fn should_suspend_for(event: &Notification) -> bool {
        match EventKind::classify(&event.event_type) {
            EventKind::Window(WindowEvent::Activate) => true,
            EventKind::StateChanged { state, .. } if state == StateSet::ACTIVE => {
                event.detail1 != 0
                    && event
                        .source
                        .as_ref()
                        .is_some_and(|s| s.role_is(Role::Frame) || s.role_is(Role::Window))
            }
            EventKind::StateChanged { state, .. } if state == StateSet::BUSY => event.detail1 != 0,
            _ => false,
        }
    }

    /// Record `trigger`; withdraws the suspendable types on the first one.
    /// Returns whether the trigger was newly recorded.
    pub fn suspend(&mut self, trigger: &Notification, registry: &mut ListenerRegistry) -> bool {
        if !self.triggers.insert(trigger.id) {
            return false;
        }

        debug!(trigger = %trigger.id, event_type = %trigger.event_type, "Suspension trigger recorded");
        if !self.suspended {
            let calls = registry.suspend(&self.suspendable);
            self.suspended = true;
            info!(unsubscribed = calls, "Suspended noisy listeners");
        }
        true
    }

    /// Release `trigger`; restores the suspendable types after the last one.
    /// Returns whether listeners were restored.
    pub fn unsuspend(&mut self, trigger: NotificationId, registry: &mut ListenerRegistry) -> bool {
        if !self.triggers.remove(&trigger) {
            return false;
        }

        debug!(trigger = %trigger, remaining = self.triggers.len(), "Suspension trigger released");
        if self.triggers.is_empty() && self.suspended {
            let calls = registry.resume(&self.suspendable);
            self.suspended = false;
            info!(resubscribed = calls, "Restored noisy listeners");
            return true;
        }
        false
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Forget all triggers without touching the bus
    pub fn clear(&mut self) {
        self.triggers.clear();
        self.suspended = false;
    }
}
