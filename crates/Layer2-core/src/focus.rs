//! Focus State - the injected "where is the user" context
//!
//! Holds the locus of focus, the active window and the active script.
//! Admission, flood control and activation read it; only activation and
//! the scripts themselves write it.

use crate::traits::{same_script, ScriptRef};
use beacon_foundation::AxObject;
use parking_lot::RwLock;
use tracing::{debug, info};

#[derive(Default)]
struct FocusInner {
    locus_of_focus: Option<AxObject>,
    active_window: Option<AxObject>,
    active_script: Option<ScriptRef>,
}

/// Shared focus context
#[derive(Default)]
pub struct FocusState {
    inner: RwLock<FocusInner>,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Locus of focus
    // ========================================================================

    pub fn locus_of_focus(&self) -> Option<AxObject> {
        self.inner.read().locus_of_focus.clone()
    }

    pub fn set_locus_of_focus(&self, obj: Option<AxObject>) {
        debug!(focus = ?obj, "Setting locus of focus");
        self.inner.write().locus_of_focus = obj;
    }

    /// Is `obj` the current locus of focus?
    pub fn is_focus(&self, obj: Option<&AxObject>) -> bool {
        match (obj, self.inner.read().locus_of_focus.as_ref()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn focus_is_dead(&self) -> bool {
        self.inner
            .read()
            .locus_of_focus
            .as_ref()
            .is_some_and(|f| !f.is_live())
    }

    // ========================================================================
    // Active window
    // ========================================================================

    pub fn active_window(&self) -> Option<AxObject> {
        self.inner.read().active_window.clone()
    }

    pub fn set_active_window(&self, window: Option<AxObject>) {
        debug!(window = ?window, "Setting active window");
        self.inner.write().active_window = window;
    }

    pub fn is_active_window(&self, obj: Option<&AxObject>) -> bool {
        match (obj, self.inner.read().active_window.as_ref()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn focus_and_window_are_unknown(&self) -> bool {
        let inner = self.inner.read();
        inner.locus_of_focus.is_none() && inner.active_window.is_none()
    }

    // ========================================================================
    // Active script
    // ========================================================================

    pub fn active_script(&self) -> Option<ScriptRef> {
        self.inner.read().active_script.clone()
    }

    pub fn set_active_script(&self, script: Option<ScriptRef>, reason: &str) {
        let mut inner = self.inner.write();
        let unchanged = match (&inner.active_script, &script) {
            (Some(old), Some(new)) => same_script(old, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        info!(
            old = inner.active_script.as_ref().map(|s| s.name().to_string()),
            new = script.as_ref().map(|s| s.name().to_string()),
            reason,
            "Setting active script"
        );
        inner.active_script = script;
    }

    pub fn is_active_script(&self, script: &ScriptRef) -> bool {
        self.inner
            .read()
            .active_script
            .as_ref()
            .is_some_and(|active| same_script(active, script))
    }

    /// Forget focus and window, e.g. when the active window died
    pub fn clear_state(&self, reason: &str) {
        info!(reason, "Clearing focus state");
        let mut inner = self.inner.write();
        inner.locus_of_focus = None;
        inner.active_window = None;
    }
}

impl std::fmt::Debug for FocusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("FocusState")
            .field("locus_of_focus", &inner.locus_of_focus)
            .field("active_window", &inner.active_window)
            .field(
                "active_script",
                &inner.active_script.as_ref().map(|s| s.name().to_string()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockScript, MockTree};
    use beacon_foundation::{Role, StateSet};
    use std::sync::Arc;

    #[test]
    fn test_focus_tracking() {
        let tree = MockTree::new();
        let button = tree.add(1, Role::PushButton, StateSet::FOCUSED);
        let focus = FocusState::new();

        assert!(focus.focus_and_window_are_unknown());
        focus.set_locus_of_focus(Some(button.clone()));

        assert!(focus.is_focus(Some(&button)));
        assert!(!focus.focus_is_dead());

        tree.kill(1);
        assert!(focus.focus_is_dead());

        focus.clear_state("test");
        assert!(focus.locus_of_focus().is_none());
    }

    #[test]
    fn test_active_script_identity() {
        let focus = FocusState::new();
        let a: ScriptRef = Arc::new(MockScript::new("a", None));
        let b: ScriptRef = Arc::new(MockScript::new("b", None));

        focus.set_active_script(Some(a.clone()), "test");
        assert!(focus.is_active_script(&a));
        assert!(!focus.is_active_script(&b));

        focus.set_active_script(None, "test");
        assert!(focus.active_script().is_none());
    }
}
