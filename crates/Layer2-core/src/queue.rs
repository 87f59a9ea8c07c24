//! Event Queue - ordered buffer of pending events
//!
//! FIFO, unbounded. Besides push/pop it supports an order-preserving
//! `retain` used by flood pruning and the obsolescence check run at dequeue.

use beacon_foundation::{Notification, QueuedEvent};
use std::collections::VecDeque;

/// Event types where only the most recent notification per source matters
const LATEST_WINS_PREFIXES: &[&str] = &[
    "document:page-changed",
    "object:active-descendant-changed",
    "object:children-changed",
    "object:property-change",
    "object:state-changed",
    "object:selection-changed",
    "object:text-caret-moved",
    "object:text-selection-changed",
    "window",
];

/// A queued event plus whether it triggered a listener suspension
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub event: QueuedEvent,
    pub holds_suspension: bool,
}

impl QueueEntry {
    pub fn new(event: QueuedEvent) -> Self {
        Self {
            event,
            holds_suspension: false,
        }
    }

    pub fn holding_suspension(mut self) -> Self {
        self.holds_suspension = true;
        self
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.event.as_notification()
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    entries: VecDeque<QueueEntry>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Is an identical notification already waiting?
    pub fn contains_duplicate(&self, event: &Notification) -> bool {
        self.notifications().any(|queued| queued.is_duplicate_of(event))
    }

    pub fn notifications(&self) -> impl DoubleEndedIterator<Item = &Notification> {
        self.entries.iter().filter_map(QueueEntry::notification)
    }

    /// Clone of the queued notifications
    pub fn snapshot(&self) -> Vec<Notification> {
        self.notifications().cloned().collect()
    }

    /// Keep the entries matching `keep`, in order; returns the rest in order
    pub fn retain(&mut self, mut keep: impl FnMut(&QueueEntry) -> bool) -> Vec<QueueEntry> {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if keep(&entry) {
                kept.push_back(entry);
            } else {
                removed.push(entry);
            }
        }
        self.entries = kept;
        removed
    }

    /// Empty the queue, returning everything that was in it
    pub fn take_all(&mut self) -> Vec<QueueEntry> {
        self.entries.drain(..).collect()
    }
}

// ============================================================================
// Obsolescence
// ============================================================================

/// The newest notification in `later` that makes `event` not worth processing
pub fn is_obsoleted_by<'a, I>(event: &Notification, later: I) -> Option<Notification>
where
    I: IntoIterator<Item = &'a Notification>,
    I::IntoIter: DoubleEndedIterator,
{
    later
        .into_iter()
        .rev()
        .find(|newer| obsoletes(newer, event))
        .cloned()
}

fn obsoletes(newer: &Notification, event: &Notification) -> bool {
    if newer.is_duplicate_of(event) {
        return true;
    }

    let same_source = newer.source.is_some() && newer.source == event.source;

    if same_source
        && newer.event_type == event.event_type
        && LATEST_WINS_PREFIXES.iter().any(|p| event.is(p))
    {
        return true;
    }

    // Focus moved on to a sibling
    if event.is("object:state-changed:focused")
        && newer.event_type == event.event_type
        && newer.detail1 == event.detail1
        && newer.detail2 == event.detail2
        && newer.any_data == event.any_data
        && !same_source
        && siblings(newer, event)
    {
        return true;
    }

    if same_source
        && event.is_any(&["window:activate", "window:deactivate"])
        && newer.is_any(&["window:activate", "window:deactivate"])
    {
        return true;
    }

    false
}

fn siblings(a: &Notification, b: &Notification) -> bool {
    let parent = |n: &Notification| n.source.as_ref().and_then(|s| s.parent().ok().flatten());
    match (parent(a), parent(b)) {
        (Some(pa), Some(pb)) => pa == pb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTree;
    use beacon_foundation::{AnyData, Role, StateSet};

    fn entry(n: Notification) -> QueueEntry {
        QueueEntry::new(QueuedEvent::Object(n))
    }

    #[test]
    fn test_fifo_and_duplicates() {
        let tree = MockTree::new();
        let a = tree.add(1, Role::Entry, StateSet::SHOWING);
        let mut queue = EventQueue::new();

        let first = Notification::new("object:text-changed:insert", Some(a.clone()))
            .with_details(0, 3)
            .with_any_data(AnyData::Text("abc".into()));
        queue.push(entry(first.clone()));
        queue.push(entry(Notification::new("object:text-caret-moved", Some(a))));

        assert!(queue.contains_duplicate(&first));
        let popped = queue.pop().unwrap();
        assert_eq!(popped.notification().unwrap().id, first.id);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_retain_preserves_order() {
        let mut queue = EventQueue::new();
        let events: Vec<_> = (0..6)
            .map(|i| Notification::new(format!("object:test:{}", i), None))
            .collect();
        for n in &events {
            queue.push(entry(n.clone()));
        }

        let removed = queue.retain(|e| {
            let t = &e.notification().unwrap().event_type;
            t.ends_with('0') || t.ends_with('3') || t.ends_with('4')
        });

        let kept: Vec<_> = queue.notifications().map(|n| n.id).collect();
        assert_eq!(kept, vec![events[0].id, events[3].id, events[4].id]);
        assert_eq!(removed.len(), 3);
        assert_eq!(removed[0].notification().unwrap().id, events[1].id);
    }

    #[test]
    fn test_latest_wins_obsolescence() {
        let tree = MockTree::new();
        let a = tree.add(1, Role::CheckBox, StateSet::SHOWING);
        let b = tree.add(2, Role::CheckBox, StateSet::SHOWING);

        let old = Notification::new("object:state-changed:checked", Some(a.clone())).with_details(1, 0);
        let newer = Notification::new("object:state-changed:checked", Some(a)).with_details(0, 0);
        let other = Notification::new("object:state-changed:checked", Some(b)).with_details(0, 0);

        assert!(is_obsoleted_by(&old, &[newer]).is_some());
        assert!(is_obsoleted_by(&old, &[other]).is_none());
    }

    #[test]
    fn test_sibling_focus_obsolescence() {
        let tree = MockTree::new();
        let list = tree.add(10, Role::List, StateSet::SHOWING);
        let first = tree.add_child(11, Role::ListItem, StateSet::SHOWING, &list);
        let second = tree.add_child(12, Role::ListItem, StateSet::SHOWING, &list);
        let elsewhere = tree.add(13, Role::PushButton, StateSet::SHOWING);

        let old = Notification::new("object:state-changed:focused", Some(first)).with_details(1, 0);
        let sibling = Notification::new("object:state-changed:focused", Some(second)).with_details(1, 0);
        let unrelated =
            Notification::new("object:state-changed:focused", Some(elsewhere)).with_details(1, 0);

        assert!(is_obsoleted_by(&old, &[sibling]).is_some());
        assert!(is_obsoleted_by(&old, &[unrelated]).is_none());
    }

    #[test]
    fn test_window_toggle_obsolescence() {
        let tree = MockTree::new();
        let frame = tree.add(1, Role::Frame, StateSet::SHOWING);

        let activate = Notification::new("window:activate", Some(frame.clone()));
        let deactivate = Notification::new("window:deactivate", Some(frame));
        assert!(is_obsoleted_by(&activate, &[deactivate]).is_some());
    }

    #[test]
    fn test_obsolescence_scans_queue_newest_first() {
        let tree = MockTree::new();
        let a = tree.add(1, Role::CheckBox, StateSet::SHOWING);

        let old = Notification::new("object:state-changed:checked", Some(a.clone())).with_details(1, 0);
        let mut queue = EventQueue::new();
        let first = Notification::new("object:state-changed:checked", Some(a.clone())).with_details(0, 0);
        let last = Notification::new("object:state-changed:checked", Some(a)).with_details(1, 0);
        queue.push(entry(first));
        queue.push(entry(last.clone()));

        let newer = is_obsoleted_by(&old, queue.notifications()).unwrap();
        assert_eq!(newer.id, last.id);
        assert_eq!(queue.len(), 2);
    }
}
