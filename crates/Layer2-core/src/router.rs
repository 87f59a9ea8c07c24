//! Script Router - picks the script for a notification and decides
//! whether that script should become the active one

use crate::focus::FocusState;
use crate::traits::{PointerRouter, ScriptRef, ScriptRegistry};
use beacon_foundation::{EventKind, Notification, Role, StateSet, WindowEvent};
use std::sync::Arc;
use tracing::{debug, warn};

/// Categories that skip the application sanity check while routing
pub const HIGH_CHURN_EVENT_TYPES: &[&str] = &[
    "object:children-changed",
    "object:property-change",
    "object:state-changed",
    "object:text-changed",
    "object:column-reordered",
    "object:row-reordered",
];

/// State changes that still get the sanity check
const CHECKED_STATE_CHANGES: &[&str] = &["object:state-changed:active", "object:state-changed:focused"];

/// Whether to activate, and why
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationDecision {
    pub activate: bool,
    pub reason: &'static str,
}

impl ActivationDecision {
    fn yes(reason: &'static str) -> Self {
        Self {
            activate: true,
            reason,
        }
    }

    fn no(reason: &'static str) -> Self {
        Self {
            activate: false,
            reason,
        }
    }
}

pub struct ScriptRouter {
    scripts: Arc<dyn ScriptRegistry>,
    pointer: Arc<dyn PointerRouter>,
}

impl ScriptRouter {
    pub fn new(scripts: Arc<dyn ScriptRegistry>, pointer: Arc<dyn PointerRouter>) -> Self {
        Self { scripts, pointer }
    }

    pub fn scripts(&self) -> &Arc<dyn ScriptRegistry> {
        &self.scripts
    }

    /// Script responsible for `event`, if any
    pub fn route(&self, event: &Notification, focus: &FocusState) -> Option<ScriptRef> {
        if focus.is_focus(event.source.as_ref()) {
            let script = focus.active_script();
            debug!(script = script.as_ref().map(|s| s.name().to_string()), "Event from locus of focus");
            return script;
        }

        if event.is("mouse:") {
            return self.pointer.script_for_pointer(event, focus);
        }

        let source = event.source.as_ref()?;
        let app = match source.application() {
            Ok(Some(app)) => app,
            Ok(None) => {
                debug!(source = ?source, "Source has no application");
                return None;
            }
            Err(e) => {
                debug!(source = ?source, error = %e, "Cannot read application of source");
                return None;
            }
        };
        if !app.is_usable() {
            warn!(app = ?app, "Application is defunct, cannot get script");
            return None;
        }

        if !Self::is_high_churn(event) && !self.scripts.is_known_application(&app) {
            warn!(app = ?app, event_type = %event.event_type, "Application is not on the desktop");
        }

        self.scripts.get_script(&app, Some(source))
    }

    pub fn is_high_churn(event: &Notification) -> bool {
        event.is_any(HIGH_CHURN_EVENT_TYPES) && !event.is_any(CHECKED_STATE_CHANGES)
    }

    /// Should processing `event` make `script` the active script?
    pub fn is_activatable(
        &self,
        event: &Notification,
        script: &ScriptRef,
        focus: &FocusState,
    ) -> ActivationDecision {
        let Some(source) = event.source.as_ref() else {
            return ActivationDecision::no("event has no source");
        };

        if focus.is_active_script(script) {
            return ActivationDecision::no("script is already active");
        }

        if let Ok(Some(app)) = source.application() {
            if !self.scripts.is_known_application(&app) {
                return ActivationDecision::no("application is unknown to the desktop");
            }
        }

        if !script.is_activatable_event(event) {
            return ActivationDecision::no("script declines activation for this event");
        }

        if script.force_activation(event) {
            return ActivationDecision::yes("script insists on activation");
        }

        let kind = EventKind::classify(&event.event_type);
        let window_activation = kind == EventKind::Window(WindowEvent::Activate)
            || (kind.is_state(StateSet::ACTIVE) && event.detail1 != 0 && source.role_is(Role::Frame));
        if window_activation {
            if focus.is_active_window(Some(source)) {
                return ActivationDecision::no("window is already active");
            }
            return ActivationDecision::yes("window activation");
        }

        if event.is("focus:") || (kind.is_state(StateSet::FOCUSED) && event.detail1 != 0) {
            return ActivationDecision::yes("source claimed focus");
        }

        let states = source.states().unwrap_or_default();

        if kind.is_state(StateSet::SELECTED)
            && event.detail1 != 0
            && source.role_is(Role::Menu)
            && states.contains(StateSet::FOCUSABLE)
        {
            return ActivationDecision::yes("selection change in focusable menu");
        }

        if kind.is_state(StateSet::SHOWING)
            && event.detail1 != 0
            && source.role_is(Role::Panel)
            && states.contains(StateSet::MODAL)
        {
            return ActivationDecision::yes("modal panel is showing");
        }

        ActivationDecision::no("no reason to activate")
    }
}
