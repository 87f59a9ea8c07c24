//! Admission Filter - decides whether a notification enters the queue
//!
//! Checks run in a fixed precedence order and the first decisive one wins:
//!
//! 1. pipeline inactive or paused
//! 2. globally ignored type prefix
//! 3. per-application noise table
//! 4. never-ignored prefix (admits, skipping the rest)
//! 5. duplicate of a queued notification
//! 6. deluge: bursty types only from the focus
//! 7. source missing, dead, stateless, defunct, or known to have defunct
//!    descendants
//! 8. focus-relative shortcuts, then the role rules in [`rules`]
//!
//! The only side effect is the defunct-descendant memo. Any error while
//! classifying means "drop".

pub mod rules;

use crate::flood::FloodController;
use crate::focus::FocusState;
use beacon_foundation::{
    AxObject, EventKind, Notification, ObjectId, PipelineConfig, Result, Role, StateSet,
};
use rules::RuleInput;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Outcome of admission, with the reason for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Admit(&'static str),
    Drop(&'static str),
}

impl Verdict {
    pub fn is_drop(&self) -> bool {
        matches!(self, Verdict::Drop(_))
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Verdict::Admit(reason) | Verdict::Drop(reason) => reason,
        }
    }
}

/// Pipeline state the filter reads but does not own
pub struct AdmissionContext<'a> {
    /// Active and not paused
    pub accepting: bool,
    pub in_deluge: bool,
    pub focus: &'a FocusState,
    pub is_queued_duplicate: &'a dyn Fn(&Notification) -> bool,
}

#[derive(Debug)]
pub struct AdmissionFilter {
    config: PipelineConfig,

    /// Parents seen with a defunct child in children-changed or
    /// active-descendant-changed notifications
    defunct_parents: HashSet<ObjectId>,
}

impl AdmissionFilter {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            defunct_parents: HashSet::new(),
        }
    }

    /// `true` if `event` must not be queued
    pub fn should_drop(&mut self, event: &Notification, ctx: &AdmissionContext<'_>) -> bool {
        match self.evaluate(event, ctx) {
            Ok(verdict) => {
                debug!(event = ?event, verdict = ?verdict, "Admission");
                verdict.is_drop()
            }
            Err(e) if e.is_benign() => {
                debug!(event_type = %event.event_type, error = %e, "Dropping: object vanished during admission");
                true
            }
            Err(e) => {
                warn!(event_type = %event.event_type, error = %e, "Dropping: admission failed");
                true
            }
        }
    }

    pub fn evaluate(&mut self, event: &Notification, ctx: &AdmissionContext<'_>) -> Result<Verdict> {
        if !ctx.accepting {
            return Ok(Verdict::Drop("not accepting events"));
        }

        if event.is_any(&self.config.ignored_event_prefixes) {
            return Ok(Verdict::Drop("globally ignored type"));
        }

        if self.is_app_noise(event) {
            return Ok(Verdict::Drop("known noise for application"));
        }

        if event.is_any(&self.config.never_ignored_prefixes) {
            return Ok(Verdict::Admit("never ignored type"));
        }

        if (ctx.is_queued_duplicate)(event) {
            return Ok(Verdict::Drop("duplicate of queued event"));
        }

        let locus = ctx.focus.locus_of_focus();
        if ctx.in_deluge && FloodController::ignore_during_deluge(event, locus.as_ref()) {
            return Ok(Verdict::Drop("deluge and source is not focus"));
        }

        let Some(source) = event.source.as_ref() else {
            return Ok(Verdict::Drop("no source"));
        };
        let Ok(states) = source.states() else {
            return Ok(Verdict::Drop("dead source"));
        };
        if states.is_empty() {
            return Ok(Verdict::Drop("source has empty state set"));
        }
        if states.contains(StateSet::DEFUNCT) {
            return Ok(Verdict::Drop("defunct source"));
        }

        let kind = EventKind::classify(&event.event_type);
        let carries_child = matches!(
            kind,
            EventKind::ChildrenChanged { .. } | EventKind::ActiveDescendantChanged
        );
        let is_focus = ctx.focus.is_focus(Some(source));

        if !carries_child && !is_focus && self.defunct_parents.contains(&source.id()) {
            return Ok(Verdict::Drop("source has defunct descendants"));
        }

        if carries_child {
            self.observe_child(source, event);
        }

        let role = source.role()?;
        if role == Role::Window && kind.is_state(StateSet::FOCUSED) {
            return Ok(Verdict::Drop("focused change on window"));
        }

        if is_focus || states.contains(StateSet::FOCUSED) {
            return Ok(Verdict::Admit("source is focus"));
        }
        if locus.is_some() && event.any_data.as_object() == locus.as_ref() {
            return Ok(Verdict::Admit("any_data is focus"));
        }

        let input = RuleInput {
            event,
            kind,
            source,
            role,
            states,
            focus: ctx.focus,
            config: &self.config,
        };
        Ok(rules::evaluate(&input)?.unwrap_or(Verdict::Admit("no rule applies")))
    }

    pub fn has_defunct_descendants(&self, obj: &AxObject) -> bool {
        self.defunct_parents.contains(&obj.id())
    }

    /// Forget the defunct-descendant memo
    pub fn reset(&mut self) {
        self.defunct_parents.clear();
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn is_app_noise(&self, event: &Notification) -> bool {
        if self.config.app_noise.is_empty() {
            return false;
        }
        let Some(app) = event.source.as_ref().and_then(|s| s.application().ok()) else {
            return false;
        };
        let app_name = app
            .and_then(|a| a.name().ok())
            .unwrap_or_default()
            .to_lowercase();

        self.config
            .app_noise
            .iter()
            .any(|rule| rule.matches(&app_name, &event.event_type))
    }

    fn observe_child(&mut self, parent: &AxObject, event: &Notification) {
        let Some(child) = event.any_data.as_object() else {
            return;
        };
        if child.is_usable() {
            if self.defunct_parents.remove(&parent.id()) {
                debug!(parent = ?parent, "Parent no longer has defunct descendants");
            }
        } else if self.defunct_parents.insert(parent.id()) {
            debug!(parent = ?parent, "Parent has defunct descendants");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockScript, MockTree};
    use beacon_foundation::AnyData;
    use std::sync::Arc;

    struct Harness {
        tree: MockTree,
        focus: FocusState,
        filter: AdmissionFilter,
        queued: Vec<Notification>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                tree: MockTree::new(),
                focus: FocusState::new(),
                filter: AdmissionFilter::new(PipelineConfig::default()),
                queued: Vec::new(),
            }
        }

        fn verdict(&mut self, event: &Notification, in_deluge: bool) -> Verdict {
            let queued = self.queued.clone();
            let is_dup = move |n: &Notification| queued.iter().any(|q| q.is_duplicate_of(n));
            let ctx = AdmissionContext {
                accepting: true,
                in_deluge,
                focus: &self.focus,
                is_queued_duplicate: &is_dup,
            };
            self.filter.evaluate(event, &ctx).unwrap()
        }
    }

    #[test]
    fn test_inactive_drops_everything() {
        let mut h = Harness::new();
        let event = Notification::new("window:activate", None);
        let ctx = AdmissionContext {
            accepting: false,
            in_deluge: false,
            focus: &h.focus,
            is_queued_duplicate: &|_| false,
        };
        assert!(h.filter.should_drop(&event, &ctx));
    }

    #[test]
    fn test_window_events_never_ignored() {
        let mut h = Harness::new();
        let frame = h.tree.add(1, Role::Frame, StateSet::ACTIVE);
        let event = Notification::new("window:activate", Some(frame));
        h.queued.push(event.clone());

        // Even an identical queued event does not block it
        assert_eq!(h.verdict(&event, true), Verdict::Admit("never ignored type"));
    }

    #[test]
    fn test_duplicate_dropped() {
        let mut h = Harness::new();
        let button = h.tree.add(1, Role::PushButton, StateSet::FOCUSED | StateSet::SHOWING);
        let event = Notification::new("object:state-changed:focused", Some(button)).with_details(1, 0);

        assert!(!h.verdict(&event, false).is_drop());
        h.queued.push(event.clone());
        assert_eq!(h.verdict(&event, false), Verdict::Drop("duplicate of queued event"));
    }

    #[test]
    fn test_deluge_focus_narrowing() {
        let mut h = Harness::new();
        let text = h.tree.add(1, Role::Text, StateSet::FOCUSED | StateSet::SHOWING);
        let other = h.tree.add(2, Role::Text, StateSet::SHOWING);
        h.focus.set_locus_of_focus(Some(text.clone()));

        let from_other = Notification::new("object:text-changed:insert", Some(other)).with_details(0, 1);
        let from_focus = Notification::new("object:text-changed:insert", Some(text)).with_details(0, 1);

        assert_eq!(h.verdict(&from_other, true), Verdict::Drop("deluge and source is not focus"));
        assert!(!h.verdict(&from_focus, true).is_drop());
        assert!(!h.verdict(&from_other, false).is_drop());
    }

    #[test]
    fn test_dead_and_defunct_sources() {
        let mut h = Harness::new();
        let dead = h.tree.add(1, Role::PushButton, StateSet::SHOWING);
        let defunct = h.tree.add(2, Role::PushButton, StateSet::DEFUNCT);
        let stateless = h.tree.add(3, Role::PushButton, StateSet::empty());
        h.tree.kill(1);

        let event = |src: AxObject| Notification::new("object:state-changed:checked", Some(src));
        assert_eq!(h.verdict(&event(dead), false), Verdict::Drop("dead source"));
        assert_eq!(h.verdict(&event(defunct), false), Verdict::Drop("defunct source"));
        assert_eq!(h.verdict(&event(stateless), false), Verdict::Drop("source has empty state set"));
    }

    #[test]
    fn test_defunct_descendant_memo() {
        let mut h = Harness::new();
        let app = h.tree.add_app(100, "gedit");
        let list = h.tree.add_in_app(1, Role::List, StateSet::SHOWING, &app);
        let gone = h.tree.add_in_app(2, Role::ListItem, StateSet::SHOWING, &app);
        let alive = h.tree.add_in_app(3, Role::ListItem, StateSet::SHOWING, &app);
        h.tree.kill(2);
        h.focus
            .set_active_script(Some(Arc::new(MockScript::new("gedit", Some(app)))), "test");

        let removed = Notification::new("object:children-changed:remove", Some(list.clone()))
            .with_any_data(AnyData::Object(gone));
        assert!(h.verdict(&removed, false).is_drop());
        assert!(h.filter.has_defunct_descendants(&list));

        let checked = Notification::new("object:state-changed:checked", Some(list.clone()));
        assert_eq!(h.verdict(&checked, false), Verdict::Drop("source has defunct descendants"));

        let added = Notification::new("object:children-changed:add", Some(list.clone()))
            .with_any_data(AnyData::Object(alive));
        assert!(!h.verdict(&added, false).is_drop());
        assert!(!h.filter.has_defunct_descendants(&list));
        assert!(!h.verdict(&checked, false).is_drop());
    }

    #[test]
    fn test_focus_skips_role_rules() {
        let mut h = Harness::new();
        let item = h.tree.add(1, Role::ListItem, StateSet::SHOWING);
        let event = Notification::new("object:property-change:accessible-name", Some(item.clone()));

        assert!(h.verdict(&event, false).is_drop());
        h.focus.set_locus_of_focus(Some(item));
        assert_eq!(h.verdict(&event, false), Verdict::Admit("source is focus"));
    }

    #[test]
    fn test_focused_change_on_window_dropped() {
        let mut h = Harness::new();
        let window = h.tree.add(1, Role::Window, StateSet::SHOWING | StateSet::FOCUSED);
        let event = Notification::new("object:state-changed:focused", Some(window)).with_details(1, 0);
        assert_eq!(h.verdict(&event, false), Verdict::Drop("focused change on window"));
    }

    #[test]
    fn test_app_noise() {
        let mut h = Harness::new();
        let shell = h.tree.add_app(100, "GNOME-Shell");
        let panel = h.tree.add_in_app(1, Role::Panel, StateSet::SHOWING, &shell);
        let event = Notification::new("object:children-changed:remove", Some(panel));
        assert_eq!(h.verdict(&event, false), Verdict::Drop("known noise for application"));
    }

    #[test]
    fn test_sourceless_object_event_dropped() {
        let mut h = Harness::new();
        let event = Notification::new("object:state-changed:busy", None);
        assert_eq!(h.verdict(&event, false), Verdict::Drop("no source"));
    }
}
