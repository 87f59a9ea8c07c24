//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use beacon_core::{
    ActiveWindowPointerRouter, BusListener, Collaborators, EventManager, FocusState,
    ManualScheduler, NullInputWatcher, Script, ScriptRef, ScriptRegistry,
};
use beacon_foundation::{
    AccessibleNode, AxObject, Notification, ObjectId, PipelineConfig, Result, Role, StateSet,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Route pipeline logs to the test harness (`RUST_LOG` picks the level)
pub fn init_test_subscriber() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

pub struct Node {
    pub role: Role,
    pub states: StateSet,
    pub app: Option<AxObject>,
}

impl AccessibleNode for Node {
    fn role(&self) -> Role {
        self.role
    }

    fn states(&self) -> StateSet {
        self.states
    }

    fn application(&self) -> Option<AxObject> {
        self.app.clone()
    }
}

#[derive(Default)]
pub struct Tree {
    nodes: Mutex<HashMap<u64, Arc<dyn AccessibleNode>>>,
}

impl Tree {
    pub fn add(&self, id: u64, role: Role, states: StateSet, app: Option<&AxObject>) -> AxObject {
        let node: Arc<dyn AccessibleNode> = Arc::new(Node {
            role,
            states,
            app: app.cloned(),
        });
        let handle = AxObject::new(ObjectId(id), &node);
        self.nodes.lock().insert(id, node);
        handle
    }

    pub fn kill(&self, id: u64) {
        self.nodes.lock().remove(&id);
    }
}

#[derive(Default)]
pub struct Bus {
    pub subscribes: Mutex<Vec<String>>,
    pub unsubscribes: Mutex<Vec<String>>,
}

impl BusListener for Bus {
    fn register(&self, event_type: &str) -> Result<()> {
        self.subscribes.lock().push(event_type.to_string());
        Ok(())
    }

    fn deregister(&self, event_type: &str) -> Result<()> {
        self.unsubscribes.lock().push(event_type.to_string());
        Ok(())
    }
}

/// Records processed notification ids
pub struct Recorder {
    pub name: String,
    pub app: Option<AxObject>,
    pub seen: Mutex<Vec<Notification>>,
}

impl Recorder {
    pub fn new(name: &str, app: Option<AxObject>) -> Self {
        Self {
            name: name.to_string(),
            app,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_types(&self) -> Vec<String> {
        self.seen.lock().iter().map(|n| n.event_type.clone()).collect()
    }
}

impl Script for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn app(&self) -> Option<AxObject> {
        self.app.clone()
    }

    fn listeners(&self) -> Vec<String> {
        vec![
            "object:".to_string(),
            "window:".to_string(),
            "mouse:".to_string(),
            "document:".to_string(),
        ]
    }

    fn present_if_inactive(&self) -> bool {
        true
    }

    fn process(&self, event: &Notification) -> Result<()> {
        self.seen.lock().push(event.clone());
        Ok(())
    }
}

pub struct Registry {
    pub scripts: Mutex<HashMap<ObjectId, Arc<Recorder>>>,
    pub default: Arc<Recorder>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default: Arc::new(Recorder::new("default", None)),
        }
    }

    pub fn add(&self, name: &str, app: &AxObject) -> Arc<Recorder> {
        let script = Arc::new(Recorder::new(name, Some(app.clone())));
        self.scripts.lock().insert(app.id(), script.clone());
        script
    }
}

impl ScriptRegistry for Registry {
    fn get_script(&self, app: &AxObject, _source: Option<&AxObject>) -> Option<ScriptRef> {
        let script = self.scripts.lock().get(&app.id()).cloned()?;
        Some(script)
    }

    fn default_script(&self) -> ScriptRef {
        self.default.clone()
    }
}

pub struct Pipeline {
    pub tree: Tree,
    pub bus: Arc<Bus>,
    pub registry: Arc<Registry>,
    pub scheduler: Arc<ManualScheduler>,
    pub manager: EventManager,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        init_test_subscriber();
        let bus = Arc::new(Bus::default());
        let registry = Arc::new(Registry::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let manager = EventManager::new(
            config,
            Collaborators {
                bus: bus.clone(),
                scripts: registry.clone(),
                pointer: Arc::new(ActiveWindowPointerRouter::new(registry.clone())),
                input: Arc::new(NullInputWatcher),
                scheduler: scheduler.clone(),
            },
            Arc::new(FocusState::new()),
        )
        .expect("default config is valid");
        manager.activate();

        Self {
            tree: Tree::default(),
            bus,
            registry,
            scheduler,
            manager,
        }
    }

    pub fn focus(&self) -> &FocusState {
        self.manager.focus()
    }

    pub fn run(&self) -> usize {
        self.scheduler.run_pending(&self.manager)
    }
}
