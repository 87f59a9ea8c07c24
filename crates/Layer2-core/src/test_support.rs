//! Mock collaborators shared by the unit tests

use crate::traits::{BusListener, InputKind, InputWatcher, Script, ScriptRef, ScriptRegistry};
use beacon_foundation::{
    AccessibleNode, AxObject, Error, InputEvent, Notification, ObjectId, Result, Role, StateSet,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Accessible tree
// ============================================================================

struct MockNode {
    role: Role,
    states: StateSet,
    name: String,
    app: Option<AxObject>,
    parent: Option<AxObject>,
    toolkit: Option<String>,
}

impl AccessibleNode for MockNode {
    fn role(&self) -> Role {
        self.role
    }

    fn states(&self) -> StateSet {
        self.states
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn application(&self) -> Option<AxObject> {
        self.app.clone()
    }

    fn parent(&self) -> Option<AxObject> {
        self.parent.clone()
    }

    fn toolkit_name(&self) -> Option<String> {
        self.toolkit.clone()
    }
}

/// Owns the nodes; handles die when their node is killed
#[derive(Default)]
pub struct MockTree {
    nodes: Mutex<HashMap<u64, Arc<dyn AccessibleNode>>>,
}

impl MockTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, id: u64, node: MockNode) -> AxObject {
        let node: Arc<dyn AccessibleNode> = Arc::new(node);
        let handle = AxObject::new(ObjectId(id), &node);
        self.nodes.lock().insert(id, node);
        handle
    }

    pub fn add(&self, id: u64, role: Role, states: StateSet) -> AxObject {
        self.insert(
            id,
            MockNode {
                role,
                states,
                name: String::new(),
                app: None,
                parent: None,
                toolkit: None,
            },
        )
    }

    pub fn add_app(&self, id: u64, name: &str) -> AxObject {
        self.insert(
            id,
            MockNode {
                role: Role::Application,
                states: StateSet::SHOWING | StateSet::ENABLED,
                name: name.to_string(),
                app: None,
                parent: None,
                toolkit: None,
            },
        )
    }

    pub fn add_in_app(&self, id: u64, role: Role, states: StateSet, app: &AxObject) -> AxObject {
        self.insert(
            id,
            MockNode {
                role,
                states,
                name: String::new(),
                app: Some(app.clone()),
                parent: None,
                toolkit: None,
            },
        )
    }

    pub fn add_child(&self, id: u64, role: Role, states: StateSet, parent: &AxObject) -> AxObject {
        self.insert(
            id,
            MockNode {
                role,
                states,
                name: String::new(),
                app: parent.application().ok().flatten(),
                parent: Some(parent.clone()),
                toolkit: None,
            },
        )
    }

    pub fn add_with_toolkit(&self, id: u64, role: Role, states: StateSet, toolkit: &str) -> AxObject {
        self.insert(
            id,
            MockNode {
                role,
                states,
                name: String::new(),
                app: None,
                parent: None,
                toolkit: Some(toolkit.to_string()),
            },
        )
    }

    /// Destroy the node behind `id`
    pub fn kill(&self, id: u64) {
        self.nodes.lock().remove(&id);
    }
}

// ============================================================================
// Bus
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    Register(String),
    Deregister(String),
}

#[derive(Default)]
pub struct RecordingBus {
    calls: Mutex<Vec<BusCall>>,
    failing: AtomicBool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BusCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&BusCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Make every later call fail after being recorded
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn outcome(&self, event_type: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::bus(event_type, "connection closed"));
        }
        Ok(())
    }
}

impl BusListener for RecordingBus {
    fn register(&self, event_type: &str) -> Result<()> {
        self.calls.lock().push(BusCall::Register(event_type.to_string()));
        self.outcome(event_type)
    }

    fn deregister(&self, event_type: &str) -> Result<()> {
        self.calls.lock().push(BusCall::Deregister(event_type.to_string()));
        self.outcome(event_type)
    }
}

// ============================================================================
// Scripts
// ============================================================================

pub struct MockScript {
    name: String,
    app: Option<AxObject>,
    listeners: Vec<String>,
    present_if_inactive: bool,
    force_activation: bool,
    declines_activation: bool,
    fails: bool,
    processed: Mutex<Vec<String>>,
    inputs: AtomicUsize,
    idles: AtomicUsize,
}

impl MockScript {
    pub fn new(name: &str, app: Option<AxObject>) -> Self {
        Self {
            name: name.to_string(),
            app,
            listeners: Vec::new(),
            present_if_inactive: false,
            force_activation: false,
            declines_activation: false,
            fails: false,
            processed: Mutex::new(Vec::new()),
            inputs: AtomicUsize::new(0),
            idles: AtomicUsize::new(0),
        }
    }

    pub fn listening(mut self, prefixes: &[&str]) -> Self {
        self.listeners = prefixes.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn presenting_if_inactive(mut self) -> Self {
        self.present_if_inactive = true;
        self
    }

    pub fn forcing_activation(mut self) -> Self {
        self.force_activation = true;
        self
    }

    pub fn declining_activation(mut self) -> Self {
        self.declines_activation = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    pub fn processed_types(&self) -> Vec<String> {
        self.processed.lock().clone()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.load(Ordering::SeqCst)
    }

    pub fn idle_count(&self) -> usize {
        self.idles.load(Ordering::SeqCst)
    }
}

impl Script for MockScript {
    fn name(&self) -> &str {
        &self.name
    }

    fn app(&self) -> Option<AxObject> {
        self.app.clone()
    }

    fn listeners(&self) -> Vec<String> {
        self.listeners.clone()
    }

    fn present_if_inactive(&self) -> bool {
        self.present_if_inactive
    }

    fn is_activatable_event(&self, _event: &Notification) -> bool {
        !self.declines_activation
    }

    fn force_activation(&self, _event: &Notification) -> bool {
        self.force_activation
    }

    fn process(&self, event: &Notification) -> Result<()> {
        self.processed.lock().push(event.event_type.clone());
        if self.fails {
            return Err(Error::script(&self.name, "mock failure"));
        }
        Ok(())
    }

    fn process_input(&self, _event: &InputEvent) -> Result<bool> {
        self.inputs.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn on_idle(&self) {
        self.idles.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scripts keyed by application id
pub struct MockRegistry {
    scripts: Mutex<HashMap<ObjectId, ScriptRef>>,
    default: Arc<MockScript>,
    reclaims: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default: Arc::new(MockScript::new("default", None)),
            reclaims: AtomicUsize::new(0),
        }
    }

    pub fn add_script(&self, name: &str, app: &AxObject) -> ScriptRef {
        let script: ScriptRef = Arc::new(MockScript::new(name, Some(app.clone())));
        self.scripts.lock().insert(app.id(), script.clone());
        script
    }

    /// Register any script for `app`
    pub fn insert(&self, app: &AxObject, script: ScriptRef) {
        self.scripts.lock().insert(app.id(), script);
    }

    pub fn add_mock_script(&self, script: MockScript) -> Arc<MockScript> {
        let script = Arc::new(script);
        let app = script.app.clone().expect("mock script needs an application");
        self.scripts.lock().insert(app.id(), script.clone());
        script
    }

    pub fn default_mock(&self) -> Arc<MockScript> {
        self.default.clone()
    }

    pub fn reclaim_count(&self) -> usize {
        self.reclaims.load(Ordering::SeqCst)
    }
}

impl ScriptRegistry for MockRegistry {
    fn get_script(&self, app: &AxObject, _source: Option<&AxObject>) -> Option<ScriptRef> {
        self.scripts.lock().get(&app.id()).cloned()
    }

    fn default_script(&self) -> ScriptRef {
        self.default.clone()
    }

    fn is_known_application(&self, app: &AxObject) -> bool {
        app.is_live()
    }

    fn reclaim_scripts(&self) {
        self.reclaims.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Input
// ============================================================================

#[derive(Default)]
pub struct RecordingInput {
    watching: AtomicBool,
    listeners: Mutex<Vec<(u32, InputKind)>>,
}

impl RecordingInput {
    pub fn watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    pub fn listeners(&self) -> Vec<(u32, InputKind)> {
        self.listeners.lock().clone()
    }
}

impl InputWatcher for RecordingInput {
    fn start_key_watcher(&self) {
        self.watching.store(true, Ordering::SeqCst);
    }

    fn stop_key_watcher(&self) {
        self.watching.store(false, Ordering::SeqCst);
    }

    fn register_input_listener(&self, mask: u32, kind: InputKind) -> Result<()> {
        self.listeners.lock().push((mask, kind));
        Ok(())
    }

    fn deregister_input_listener(&self, mask: u32, kind: InputKind) -> Result<()> {
        self.listeners.lock().retain(|l| *l != (mask, kind));
        Ok(())
    }
}
