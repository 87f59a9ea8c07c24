//! Event Manager - ingestion, queueing and dispatch of bus events
//!
//! ```text
//! bus ──▶ enqueue_object_event
//!           │ AdmissionFilter ── drop
//!           │ flood prune (prioritized events)
//!           │ suspension (window/busy transitions)
//!           ▼
//!         EventQueue ──▶ drain_step ──▶ ScriptRouter ──▶ Script::process
//!                        (scheduled or inline)
//! ```
//!
//! Everything runs on the host's single event loop, but delivery re-enters
//! while a script is processing: immediate-mode events drain inline, and a
//! drain requested from inside another drain is folded into the outer loop.
//! Locks only guard bookkeeping and are never held across script calls.
//! When two are needed, the filter lock is taken before the queue lock and
//! the suspension lock before the listener lock.

use crate::filter::{AdmissionContext, AdmissionFilter};
use crate::flood::FloodController;
use crate::focus::FocusState;
use crate::queue::{is_obsoleted_by, EventQueue, QueueEntry};
use crate::registry::ListenerRegistry;
use crate::router::ScriptRouter;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::suspension::SuspensionCoordinator;
use crate::traits::{
    BusListener, InputKind, InputWatcher, PointerRouter, Script, ScriptRef, ScriptRegistry,
    Scheduler,
};
use beacon_foundation::{
    AxObject, EventKind, InputEvent, Notification, NotificationId, PipelineConfig, QueuedEvent,
    Result, Role, StateSet,
};
use parking_lot::Mutex;
use regex::Regex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What the host should do after a drain step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// More events are waiting; call `drain_step` again soon
    Rearm,
    /// Queue is empty; the drain is disarmed
    Idle,
}

/// External collaborators of the pipeline
pub struct Collaborators {
    pub bus: Arc<dyn BusListener>,
    pub scripts: Arc<dyn ScriptRegistry>,
    pub pointer: Arc<dyn PointerRouter>,
    pub input: Arc<dyn InputWatcher>,
    pub scheduler: Arc<dyn Scheduler>,
}

#[derive(Default)]
struct QueueState {
    queue: EventQueue,
    drain_armed: bool,
}

/// Clears the draining flag when the outermost drain returns
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct EventManager {
    config: PipelineConfig,
    flood: FloodController,
    router: ScriptRouter,
    input: Arc<dyn InputWatcher>,
    scheduler: Arc<dyn Scheduler>,
    focus: Arc<FocusState>,

    state: Mutex<QueueState>,
    listeners: Mutex<ListenerRegistry>,
    suspension: Mutex<SuspensionCoordinator>,
    filter: Mutex<AdmissionFilter>,

    active: AtomicBool,
    paused: AtomicBool,
    draining: AtomicBool,
    inline_requests: AtomicUsize,

    debug_filter: Option<Regex>,
    stats: PipelineStats,
}

impl EventManager {
    pub fn new(
        config: PipelineConfig,
        collaborators: Collaborators,
        focus: Arc<FocusState>,
    ) -> Result<Self> {
        config.validate()?;
        let debug_filter = config.debug_filter()?;

        Ok(Self {
            flood: FloodController::from_config(&config),
            router: ScriptRouter::new(collaborators.scripts, collaborators.pointer),
            input: collaborators.input,
            scheduler: collaborators.scheduler,
            focus,
            state: Mutex::new(QueueState::default()),
            listeners: Mutex::new(ListenerRegistry::new(collaborators.bus)),
            suspension: Mutex::new(SuspensionCoordinator::new(
                config.suspendable_event_types.clone(),
            )),
            filter: Mutex::new(AdmissionFilter::new(config.clone())),
            active: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            inline_requests: AtomicUsize::new(0),
            debug_filter,
            stats: PipelineStats::default(),
            config,
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn activate(&self) {
        info!("Activating event manager");
        self.input.start_key_watcher();
        self.active.store(true, Ordering::SeqCst);
    }

    /// Drop the queue and all bookkeeping. Pending drains become no-ops.
    pub fn deactivate(&self) {
        info!("Deactivating event manager");
        self.input.stop_key_watcher();
        self.active.store(false, Ordering::SeqCst);

        let dropped = {
            let mut state = self.state.lock();
            let dropped = state.queue.len();
            *state = QueueState::default();
            dropped
        };
        self.suspension.lock().clear();
        self.listeners.lock().reset();
        self.filter.lock().reset();
        info!(dropped, "Event manager deactivated");
    }

    pub fn pause_queuing(&self, pause: bool, clear_queue: bool, reason: &str) {
        info!(pause, clear_queue, reason, "Pause queuing");
        self.paused.store(pause, Ordering::SeqCst);

        if clear_queue {
            let cleared = self.state.lock().queue.take_all();
            self.release_held(&cleared);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn is_accepting(&self) -> bool {
        self.is_active() && !self.is_paused()
    }

    // ========================================================================
    // Listener registration
    // ========================================================================

    pub fn register_listener(&self, event_type: &str) {
        self.listeners.lock().register(event_type);
    }

    pub fn deregister_listener(&self, event_type: &str) {
        self.listeners.lock().deregister(event_type);
    }

    pub fn register_script_listeners(&self, script: &dyn Script) {
        info!(script = script.name(), "Registering listeners for script");
        let event_types = script.listeners();
        let mut listeners = self.listeners.lock();
        for event_type in &event_types {
            listeners.register(event_type);
        }
    }

    pub fn deregister_script_listeners(&self, script: &dyn Script) {
        info!(script = script.name(), "Deregistering listeners for script");
        let event_types = script.listeners();
        let mut listeners = self.listeners.lock();
        for event_type in &event_types {
            listeners.deregister(event_type);
        }
    }

    pub fn register_input_listener(&self, mask: u32, kind: InputKind) -> Result<()> {
        debug!(mask, ?kind, "Registering input listener");
        self.input.register_input_listener(mask, kind)
    }

    pub fn deregister_input_listener(&self, mask: u32, kind: InputKind) -> Result<()> {
        debug!(mask, ?kind, "Deregistering input listener");
        self.input.deregister_input_listener(mask, kind)
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.lock().count(event_type)
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Bus delivery callback. Returns whether the event was queued.
    pub fn enqueue_object_event(&self, event: Notification) -> bool {
        let depth = self.queue_len();
        let dropped = {
            let mut filter = self.filter.lock();
            let is_queued_duplicate =
                |n: &Notification| self.state.lock().queue.contains_duplicate(n);
            let ctx = AdmissionContext {
                accepting: self.is_accepting(),
                in_deluge: self.flood.in_deluge(depth),
                focus: &self.focus,
                is_queued_duplicate: &is_queued_duplicate,
            };
            filter.should_drop(&event, &ctx)
        };
        if dropped {
            self.stats.add_dropped(1);
            return false;
        }
        self.stats.add_admitted(1);

        let depth = self.queue_len();
        if self.flood.in_flood(depth) && FloodController::prioritize_during_flood(&event) {
            info!(queue_size = depth, event_type = %event.event_type, "Flood: pruning before enqueue");
            self.prune_queue();
        }

        let mut entry = QueueEntry::new(QueuedEvent::Object(event.clone()));
        if SuspensionCoordinator::should_suspend_for(&event) && self.suspend_for(&event) {
            entry = entry.holding_suspension();
        }

        let immediate = self.should_process_immediately(&event);
        debug!(event = ?event, immediate, "Queueing");
        self.push(entry, immediate);

        if immediate {
            self.drain_inline();
        }
        true
    }

    /// Keyboard and braille events; routed to the active script at dispatch
    pub fn enqueue_input_event(&self, event: InputEvent) -> bool {
        if !self.is_accepting() {
            debug!(event = ?event, "Ignoring input event: not accepting events");
            return false;
        }
        debug!(event = ?event, "Queueing input event");
        self.push(QueueEntry::new(QueuedEvent::Input(event)), false);
        true
    }

    fn push(&self, entry: QueueEntry, immediate: bool) {
        let schedule = {
            let mut state = self.state.lock();
            state.queue.push(entry);
            if immediate || state.drain_armed {
                false
            } else {
                state.drain_armed = true;
                true
            }
        };
        if schedule {
            self.scheduler.schedule_drain();
        }
    }

    fn should_process_immediately(&self, event: &Notification) -> bool {
        if event.is("mouse:button") {
            return true;
        }
        let Some(source) = event.source.as_ref() else {
            return false;
        };

        let synchronous_toolkit = source
            .toolkit_name()
            .ok()
            .flatten()
            .is_some_and(|toolkit| {
                self.config
                    .synchronous_toolkits
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(&toolkit))
            });
        if synchronous_toolkit {
            return true;
        }

        let Ok(role) = source.role() else {
            return false;
        };
        if matches!(
            EventKind::classify(&event.event_type),
            EventKind::ChildrenChanged { .. }
        ) {
            return !role.is_table_like();
        }
        matches!(role, Role::Notification | Role::PopupMenu)
    }

    // ========================================================================
    // Suspension
    // ========================================================================

    fn suspend_for(&self, trigger: &Notification) -> bool {
        let mut suspension = self.suspension.lock();
        let mut listeners = self.listeners.lock();
        suspension.suspend(trigger, &mut listeners)
    }

    fn release_suspension(&self, trigger: NotificationId) {
        let mut suspension = self.suspension.lock();
        let mut listeners = self.listeners.lock();
        suspension.unsuspend(trigger, &mut listeners);
    }

    /// Release suspensions held by entries that will never be processed
    fn release_held(&self, entries: &[QueueEntry]) {
        for entry in entries.iter().filter(|e| e.holds_suspension) {
            if let Some(event) = entry.notification() {
                self.release_suspension(event.id);
            }
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.lock().is_suspended()
    }

    // ========================================================================
    // Flood
    // ========================================================================

    fn prune_queue(&self) {
        let removed = {
            let mut state = self.state.lock();
            self.flood.prune(&mut state.queue, &self.focus)
        };
        self.stats.add_pruned(removed.len() as u64);
        self.release_held(&removed);
    }

    // ========================================================================
    // Draining
    // ========================================================================

    /// Process one queued event. Hosts call this after `schedule_drain`
    /// until it returns [`DrainStatus::Idle`].
    pub fn drain_step(&self) -> DrainStatus {
        if self.draining.swap(true, Ordering::SeqCst) {
            self.inline_requests.fetch_add(1, Ordering::SeqCst);
            return DrainStatus::Idle;
        }
        let _guard = DrainGuard(&self.draining);

        let mut status = self.step();
        while self.inline_requests.swap(0, Ordering::SeqCst) > 0 {
            status = self.run_until_idle();
        }
        status
    }

    /// Immediate mode: drain before returning to the caller
    fn drain_inline(&self) {
        if self.draining.swap(true, Ordering::SeqCst) {
            debug!("Drain already running, folding inline request into it");
            self.inline_requests.fetch_add(1, Ordering::SeqCst);
            return;
        }
        let _guard = DrainGuard(&self.draining);

        loop {
            self.run_until_idle();
            if self.inline_requests.swap(0, Ordering::SeqCst) == 0 {
                break;
            }
        }
    }

    fn run_until_idle(&self) -> DrainStatus {
        while self.step() == DrainStatus::Rearm {}
        DrainStatus::Idle
    }

    fn step(&self) -> DrainStatus {
        let entry = {
            let mut state = self.state.lock();
            match state.queue.pop() {
                Some(entry) => entry,
                None => {
                    state.drain_armed = false;
                    debug!("Attempted dequeue, but the event queue is empty");
                    return DrainStatus::Idle;
                }
            }
        };

        match &entry.event {
            QueuedEvent::Input(event) => self.process_input_event(event),
            QueuedEvent::Object(event) => self.process_timed(event),
        }
        self.release_held(std::slice::from_ref(&entry));

        let (status, schedule) = {
            let mut state = self.state.lock();
            if state.queue.is_empty() {
                state.drain_armed = false;
                (DrainStatus::Idle, false)
            } else if state.drain_armed {
                (DrainStatus::Rearm, false)
            } else {
                state.drain_armed = true;
                (DrainStatus::Rearm, true)
            }
        };

        if status == DrainStatus::Idle {
            self.scheduler.schedule_recovery(self.config.recovery_delay());
        }
        if schedule {
            self.scheduler.schedule_drain();
        }
        status
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn process_input_event(&self, event: &InputEvent) {
        let script = self
            .focus
            .active_script()
            .unwrap_or_else(|| self.router.scripts().default_script());

        match script.process_input(event) {
            Ok(consumed) => {
                debug!(script = script.name(), consumed, "Processed input event");
                self.stats.add_input_processed(1);
            }
            Err(e) => {
                warn!(script = script.name(), error = %e, "Script failed processing input event");
                self.stats.add_handler_failures(1);
            }
        }
    }

    fn process_timed(&self, event: &Notification) {
        let debugging = self
            .debug_filter
            .as_ref()
            .map_or(true, |re| re.is_match(&event.event_type));
        if !debugging {
            self.process_object_event(event);
            return;
        }

        let start = Instant::now();
        debug!(event_type = %event.event_type, queue_size = self.queue_len(), "Processing object event");
        self.process_object_event(event);
        debug!(
            event_type = %event.event_type,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Finished object event"
        );
    }

    fn process_object_event(&self, event: &Notification) {
        let obsoleted_by = {
            let state = self.state.lock();
            is_obsoleted_by(event, state.queue.notifications())
        };
        if let Some(newer) = obsoleted_by {
            debug!(event = ?event, newer = ?newer, "Obsoleted by newer event");
            self.stats.add_obsoleted(1);
            return;
        }

        let scripts = self.router.scripts();
        if event.is("object:children-changed:remove")
            && event.source.as_ref().is_some_and(|s| s.role_is(Role::DesktopFrame))
        {
            scripts.reclaim_scripts();
            return;
        }

        if let Some(source) = event.source.as_ref() {
            if !source.is_usable() {
                debug!(source = ?source, "Ignoring dead or defunct source");
                if event.is("window:de") && self.focus.is_active_window(Some(source)) {
                    self.focus.clear_state("Active window is dead or defunct");
                    self.focus
                        .set_active_script(None, "Active window is dead or defunct");
                }
                return;
            }
        }

        let kind = EventKind::classify(&event.event_type);
        if (event.is("window:") && !event.event_type.ends_with("create"))
            || (kind.is_state(StateSet::ACTIVE)
                && event.source.as_ref().is_some_and(|s| s.role_is(Role::Frame)))
        {
            scripts.reclaim_scripts();
        }

        if event
            .source
            .as_ref()
            .and_then(|s| s.has_state(StateSet::ICONIFIED).ok())
            .unwrap_or(false)
        {
            debug!(event = ?event, "Ignoring iconified source");
            return;
        }

        if self.flood.in_flood(self.queue_len()) {
            let locus = self.focus.locus_of_focus();
            if !FloodController::keep_during_flood(event, locus.as_ref()) {
                debug!(event_type = %event.event_type, "Not processing due to flood");
                self.stats.add_flood_discarded(1);
                return;
            }
            if FloodController::prioritize_during_flood(event) {
                info!(event_type = %event.event_type, "Flood: pruning at dispatch");
                self.prune_queue();
            }
        }

        let Some(script) = self.router.route(event, &self.focus) else {
            debug!(event = ?event, "Could not get script for event");
            self.stats.add_unrouted(1);
            return;
        };

        if !self.focus.is_active_script(&script) {
            let decision = self.router.is_activatable(event, &script, &self.focus);
            debug!(
                script = script.name(),
                activate = decision.activate,
                reason = decision.reason,
                "Activation decision"
            );
            if decision.activate {
                self.focus
                    .set_active_script(Some(script.clone()), decision.reason);
            }
        }

        if !self.should_process(event, &script) {
            return;
        }

        if !script.listeners().iter().any(|prefix| event.is(prefix)) {
            debug!(script = script.name(), event_type = %event.event_type, "Script has no listener for event");
            return;
        }

        match script.process(event) {
            Ok(()) => self.stats.add_processed(1),
            Err(e) => {
                warn!(
                    script = script.name(),
                    event_type = %event.event_type,
                    error = %e,
                    "Script failed processing event"
                );
                self.stats.add_handler_failures(1);
            }
        }
    }

    fn should_process(&self, event: &Notification, script: &ScriptRef) -> bool {
        if self.focus.is_active_script(script) {
            return true;
        }
        if script.present_if_inactive() {
            debug!(script = script.name(), "Processing: script handles events when inactive");
            return true;
        }
        if self.config.present_all_progress_bars
            && event
                .source
                .as_ref()
                .is_some_and(|s| s.role_is(Role::ProgressBar))
        {
            debug!("Processing: all progress bars are presented");
            return true;
        }
        debug!(script = script.name(), event_type = %event.event_type, "Not processing: script is inactive");
        false
    }

    // ========================================================================
    // Recovery
    // ========================================================================

    /// Delayed check after the queue drains: with nothing focused, no active
    /// window and no active script, fall back to the default script.
    pub fn on_no_focus(&self) {
        if !self.is_active() {
            return;
        }
        if !self.focus.focus_and_window_are_unknown() || self.focus.active_script().is_some() {
            return;
        }

        let script = self.router.scripts().default_script();
        self.focus.set_active_script(Some(script.clone()), "No focus");
        script.on_idle();
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_drain_armed(&self) -> bool {
        self.state.lock().drain_armed
    }

    /// Notifications currently waiting, oldest first
    pub fn queued_notifications(&self) -> Vec<Notification> {
        self.state.lock().queue.snapshot()
    }

    pub fn has_defunct_descendants(&self, obj: &AxObject) -> bool {
        self.filter.lock().has_defunct_descendants(obj)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn focus(&self) -> &Arc<FocusState> {
        &self.focus
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("active", &self.is_active())
            .field("paused", &self.is_paused())
            .field("queue_len", &self.queue_len())
            .field("focus", &self.focus)
            .finish()
    }
}
