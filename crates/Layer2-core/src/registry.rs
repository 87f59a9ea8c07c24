//! Listener Registry - reference-counted bus subscriptions
//!
//! Maps an event type prefix to the number of parties that want it.
//! The bus-level subscription exists exactly while the count is above zero,
//! except for types the suspension coordinator has temporarily withdrawn.

use crate::traits::BusListener;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ListenerRegistry {
    bus: Arc<dyn BusListener>,
    counts: HashMap<String, usize>,

    /// Types withdrawn from the bus while keeping their counts
    suspended: HashSet<String>,
}

impl ListenerRegistry {
    pub fn new(bus: Arc<dyn BusListener>) -> Self {
        Self {
            bus,
            counts: HashMap::new(),
            suspended: HashSet::new(),
        }
    }

    /// Add one subscriber; subscribes on the bus on 0 -> 1
    pub fn register(&mut self, event_type: &str) {
        let count = self.counts.entry(event_type.to_string()).or_insert(0);
        *count += 1;
        debug!(event_type, count = *count, "Registered listener");

        if *count == 1 && !self.suspended.contains(event_type) {
            self.subscribe(event_type);
        }
    }

    /// Remove one subscriber; unsubscribes and drops the entry on 1 -> 0.
    /// Unknown types are ignored.
    pub fn deregister(&mut self, event_type: &str) {
        let Some(count) = self.counts.get_mut(event_type) else {
            debug!(event_type, "Deregister of unknown listener ignored");
            return;
        };

        *count -= 1;
        debug!(event_type, count = *count, "Deregistered listener");
        if *count > 0 {
            return;
        }

        self.counts.remove(event_type);
        if !self.suspended.contains(event_type) {
            self.unsubscribe(event_type);
        }
    }

    /// Withdraw `event_types` from the bus, keeping their counts.
    /// Returns how many bus unsubscribe calls were made.
    pub fn suspend(&mut self, event_types: &[String]) -> usize {
        let mut calls = 0;
        for event_type in event_types {
            if !self.suspended.insert(event_type.clone()) {
                continue;
            }
            if self.count(event_type) > 0 {
                self.unsubscribe(event_type);
                calls += 1;
            }
        }
        calls
    }

    /// Restore types withdrawn by [`suspend`](Self::suspend).
    /// Returns how many bus subscribe calls were made.
    pub fn resume(&mut self, event_types: &[String]) -> usize {
        let mut calls = 0;
        for event_type in event_types {
            if !self.suspended.remove(event_type) {
                continue;
            }
            if self.count(event_type) > 0 {
                self.subscribe(event_type);
                calls += 1;
            }
        }
        calls
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.counts.get(event_type).copied().unwrap_or(0)
    }

    pub fn is_registered(&self, event_type: &str) -> bool {
        self.counts.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Forget every count without touching the bus
    pub fn reset(&mut self) {
        self.counts.clear();
        self.suspended.clear();
    }

    fn subscribe(&self, event_type: &str) {
        if let Err(e) = self.bus.register(event_type) {
            warn!(event_type, error = %e, "Bus subscribe failed");
        }
    }

    fn unsubscribe(&self, event_type: &str) {
        if let Err(e) = self.bus.deregister(event_type) {
            warn!(event_type, error = %e, "Bus unsubscribe failed");
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("counts", &self.counts)
            .field("suspended", &self.suspended)
            .finish()
    }
}
