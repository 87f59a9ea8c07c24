//! Collaborator Traits - the pipeline's boundaries
//!
//! Everything on the far side of these traits (the bus binding, the
//! per-application scripts, input devices, the host event loop) is owned
//! elsewhere. The pipeline only calls through them.

use crate::focus::FocusState;
use beacon_foundation::{AxObject, InputEvent, Notification, Result};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Bus
// ============================================================================

/// Subscription side of the accessibility bus
pub trait BusListener: Send + Sync {
    /// Start delivering notifications whose type starts with `event_type`
    fn register(&self, event_type: &str) -> Result<()>;

    /// Stop delivering them
    fn deregister(&self, event_type: &str) -> Result<()>;
}

// ============================================================================
// Scripts
// ============================================================================

/// Per-application event handler
pub trait Script: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Application this script serves. `None` for the default script.
    fn app(&self) -> Option<AxObject>;

    /// Event type prefixes this script wants
    fn listeners(&self) -> Vec<String>;

    /// Process events even while another script is active
    fn present_if_inactive(&self) -> bool {
        false
    }

    /// May this notification make the script active?
    fn is_activatable_event(&self, _event: &Notification) -> bool {
        true
    }

    /// Activate for this notification no matter what
    fn force_activation(&self, _event: &Notification) -> bool {
        false
    }

    fn process(&self, event: &Notification) -> Result<()>;

    /// Returns whether the input event was consumed
    fn process_input(&self, _event: &InputEvent) -> Result<bool> {
        Ok(false)
    }

    /// Called when the script becomes active because nothing has focus
    fn on_idle(&self) {}
}

/// Shared script handle
pub type ScriptRef = Arc<dyn Script>;

/// Identity comparison for script handles
pub fn same_script(a: &ScriptRef, b: &ScriptRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Owns scripts and hands them out per (application, object)
pub trait ScriptRegistry: Send + Sync {
    /// Script for `app`, created on first use
    fn get_script(&self, app: &AxObject, source: Option<&AxObject>) -> Option<ScriptRef>;

    /// Fallback when nothing else applies
    fn default_script(&self) -> ScriptRef;

    /// Is `app` still registered on the desktop?
    fn is_known_application(&self, _app: &AxObject) -> bool {
        true
    }

    /// Drop scripts whose applications have gone away
    fn reclaim_scripts(&self) {}
}

/// Resolves the script for pointer events, which carry no useful source
pub trait PointerRouter: Send + Sync {
    fn script_for_pointer(&self, event: &Notification, focus: &FocusState) -> Option<ScriptRef>;
}

/// Sends pointer events to the script of the active window's application
pub struct ActiveWindowPointerRouter {
    scripts: Arc<dyn ScriptRegistry>,
}

impl ActiveWindowPointerRouter {
    pub fn new(scripts: Arc<dyn ScriptRegistry>) -> Self {
        Self { scripts }
    }
}

impl PointerRouter for ActiveWindowPointerRouter {
    fn script_for_pointer(&self, _event: &Notification, focus: &FocusState) -> Option<ScriptRef> {
        let window = focus.active_window()?;
        let app = window.application().ok().flatten()?;
        self.scripts.get_script(&app, Some(&window))
    }
}

// ============================================================================
// Input devices
// ============================================================================

/// Input listener kinds, registered separately from bus event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    KeyPressed,
    KeyReleased,
    Braille,
}

/// Keyboard and braille device watcher
pub trait InputWatcher: Send + Sync {
    fn start_key_watcher(&self);

    fn stop_key_watcher(&self);

    fn register_input_listener(&self, mask: u32, kind: InputKind) -> Result<()>;

    fn deregister_input_listener(&self, mask: u32, kind: InputKind) -> Result<()>;
}

/// Watcher for hosts without input devices
#[derive(Debug, Default)]
pub struct NullInputWatcher;

impl InputWatcher for NullInputWatcher {
    fn start_key_watcher(&self) {}

    fn stop_key_watcher(&self) {}

    fn register_input_listener(&self, _mask: u32, _kind: InputKind) -> Result<()> {
        Ok(())
    }

    fn deregister_input_listener(&self, _mask: u32, _kind: InputKind) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Scheduling
// ============================================================================

/// Host event loop hooks.
///
/// The host answers `schedule_drain` by calling
/// [`EventManager::drain_step`](crate::EventManager::drain_step) until it
/// reports idle, and `schedule_recovery` by calling
/// [`EventManager::on_no_focus`](crate::EventManager::on_no_focus) once the
/// delay has elapsed.
pub trait Scheduler: Send + Sync {
    fn schedule_drain(&self);

    fn schedule_recovery(&self, delay: Duration);
}
