//! Simulated desktop - accessible tree, bus and recording scripts

use crate::scenario::{Scenario, ScriptSpec};
use anyhow::Context;
use beacon_core::{BusListener, FocusState, InputEvent, Script, ScriptRef, ScriptRegistry};
use beacon_foundation::{AccessibleNode, AxObject, Notification, ObjectId, Result, Role, StateSet};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// Tree
// ============================================================================

struct SimNode {
    role: Role,
    states: StateSet,
    name: String,
    app: Option<AxObject>,
    parent: Option<AxObject>,
    toolkit: Option<String>,
}

impl AccessibleNode for SimNode {
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

/// Owns every simulated node. Handles go dead once their node is killed.
#[derive(Default)]
pub struct SimTree {
    nodes: Mutex<HashMap<u64, Arc<dyn AccessibleNode>>>,
    handles: HashMap<u64, AxObject>,
}

impl SimTree {
    pub fn build(scenario: &Scenario) -> anyhow::Result<Self> {
        let mut tree = Self::default();
        for spec in &scenario.objects {
            let parent = spec.parent.map(|id| tree.lookup(id)).transpose()?;
            let app = match (spec.app, &parent) {
                (Some(id), _) => Some(tree.lookup(id)?),
                (None, Some(parent)) => parent.application().ok().flatten(),
                (None, None) => None,
            };

            let node: Arc<dyn AccessibleNode> = Arc::new(SimNode {
                role: spec.role,
                states: spec.state_set()?,
                name: spec.name.clone(),
                app,
                parent,
                toolkit: spec.toolkit.clone(),
            });
            let handle = AxObject::new(ObjectId(spec.id), &node);
            tree.nodes.lock().insert(spec.id, node);
            tree.handles.insert(spec.id, handle);
        }
        debug!(objects = tree.handles.len(), "Built simulated tree");
        Ok(tree)
    }

    /// Handle for `id`, live or not
    pub fn lookup(&self, id: u64) -> anyhow::Result<AxObject> {
        self.handles
            .get(&id)
            .cloned()
            .with_context(|| format!("unknown object {}", id))
    }

    pub fn kill(&self, id: u64) -> bool {
        self.nodes.lock().remove(&id).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.nodes.lock().len()
    }
}

// ============================================================================
// Bus
// ============================================================================

/// Subscription calls seen by the bus
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BusTally {
    pub subscribed: usize,
    pub unsubscribed: usize,
    pub active: BTreeMap<String, bool>,
}

#[derive(Default)]
pub struct SimBus {
    tally: Mutex<BusTally>,
}

impl SimBus {
    pub fn tally(&self) -> BusTally {
        self.tally.lock().clone()
    }
}

impl BusListener for SimBus {
    fn register(&self, event_type: &str) -> Result<()> {
        let mut tally = self.tally.lock();
        tally.subscribed += 1;
        tally.active.insert(event_type.to_string(), true);
        Ok(())
    }

    fn deregister(&self, event_type: &str) -> Result<()> {
        let mut tally = self.tally.lock();
        tally.unsubscribed += 1;
        tally.active.insert(event_type.to_string(), false);
        Ok(())
    }
}

// ============================================================================
// Scripts
// ============================================================================

/// Records what it processes and tracks focus the way a real script would:
/// window activations set the active window, focused changes move the
/// locus of focus.
pub struct SimScript {
    name: String,
    app: Option<AxObject>,
    listeners: Vec<String>,
    present_if_inactive: bool,
    force_activation: bool,
    focus: Arc<FocusState>,
    processed: Mutex<Vec<String>>,
    keys: Mutex<Vec<String>>,
}

impl SimScript {
    pub fn from_spec(spec: &ScriptSpec, tree: &SimTree, focus: Arc<FocusState>) -> anyhow::Result<Self> {
        let app = tree.lookup(spec.app)?;
        let name = match &spec.name {
            Some(name) => name.clone(),
            None => app.name().unwrap_or_default(),
        };
        Ok(Self {
            name: if name.is_empty() { format!("app-{}", spec.app) } else { name },
            app: Some(app),
            listeners: spec.listeners.clone(),
            present_if_inactive: spec.present_if_inactive,
            force_activation: spec.force_activation,
            focus,
            processed: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
        })
    }

    /// Fallback script: every category, presents only when active
    pub fn default_script(focus: Arc<FocusState>) -> Self {
        Self {
            name: "default".to_string(),
            app: None,
            listeners: ["object:", "window:", "mouse:", "document:"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            present_if_inactive: false,
            force_activation: false,
            focus,
            processed: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().clone()
    }
}

impl Script for SimScript {
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

    fn force_activation(&self, _event: &Notification) -> bool {
        self.force_activation
    }

    fn process(&self, event: &Notification) -> Result<()> {
        self.processed.lock().push(event.event_type.clone());

        if event.is("window:activate") {
            self.focus.set_active_window(event.source.clone());
        } else if event.is("object:state-changed:focused") && event.detail1 != 0 {
            self.focus.set_locus_of_focus(event.source.clone());
        }
        Ok(())
    }

    fn process_input(&self, event: &InputEvent) -> Result<bool> {
        if let InputEvent::Keyboard(key) = event {
            self.keys.lock().push(key.event_string.clone());
        }
        Ok(true)
    }

    fn on_idle(&self) {
        info!(script = %self.name, "Idle: nothing has focus");
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Scripts keyed by application object id
pub struct SimRegistry {
    scripts: Vec<(ObjectId, Arc<SimScript>)>,
    default: Arc<SimScript>,
}

impl SimRegistry {
    pub fn build(scenario: &Scenario, tree: &SimTree, focus: &Arc<FocusState>) -> anyhow::Result<Self> {
        let scripts = scenario
            .scripts
            .iter()
            .map(|spec| {
                let script = SimScript::from_spec(spec, tree, focus.clone())?;
                Ok((ObjectId(spec.app), Arc::new(script)))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            scripts,
            default: Arc::new(SimScript::default_script(focus.clone())),
        })
    }

    /// Every script, the default one last
    pub fn all(&self) -> Vec<Arc<SimScript>> {
        self.scripts
            .iter()
            .map(|(_, s)| s.clone())
            .chain(std::iter::once(self.default.clone()))
            .collect()
    }
}

impl ScriptRegistry for SimRegistry {
    fn get_script(&self, app: &AxObject, _source: Option<&AxObject>) -> Option<ScriptRef> {
        let script = self
            .scripts
            .iter()
            .find(|(id, _)| *id == app.id())
            .map(|(_, s)| s.clone())?;
        Some(script)
    }

    fn default_script(&self) -> ScriptRef {
        self.default.clone()
    }

    fn is_known_application(&self, app: &AxObject) -> bool {
        app.is_live()
    }
}
