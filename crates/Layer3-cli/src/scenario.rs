//! Scenario files - a simulated desktop and a script of bus deliveries
//!
//! ```toml
//! [[object]]
//! id = 100
//! role = "application"
//! name = "gedit"
//!
//! [[object]]
//! id = 1
//! role = "frame"
//! states = ["showing", "active"]
//! app = 100
//!
//! [[script]]
//! app = 100
//! listeners = ["window:", "object:state-changed"]
//!
//! [[step]]
//! action = "notify"
//! type = "window:activate"
//! source = 1
//!
//! [[step]]
//! action = "run"
//! ```

use anyhow::{bail, Context};
use beacon_foundation::{Role, StateSet};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// One accessible object in the simulated tree
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    pub id: u64,
    pub role: Role,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub name: String,
    /// Owning application object; inherited from `parent` when absent
    pub app: Option<u64>,
    pub toolkit: Option<String>,
    pub parent: Option<u64>,
}

impl ObjectSpec {
    pub fn state_set(&self) -> anyhow::Result<StateSet> {
        StateSet::parse_all(self.states.iter().map(String::as_str))
            .map_err(|e| anyhow::anyhow!("object {}: {}", self.id, e))
    }
}

/// A recording script bound to one application
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptSpec {
    pub app: u64,
    pub name: Option<String>,
    #[serde(default = "default_listeners")]
    pub listeners: Vec<String>,
    #[serde(default)]
    pub present_if_inactive: bool,
    #[serde(default)]
    pub force_activation: bool,
}

fn default_listeners() -> Vec<String> {
    ["object:", "window:", "mouse:", "document:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Payload attached to a `notify` step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DataSpec {
    Text(String),
    Bool(bool),
    Object { object: u64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Deliver a bus notification
    Notify {
        #[serde(rename = "type")]
        event_type: String,
        source: Option<u64>,
        #[serde(default)]
        detail1: i32,
        #[serde(default)]
        detail2: i32,
        data: Option<DataSpec>,
    },
    /// Destroy an object; handles to it go dead
    Kill { object: u64 },
    /// Move the locus of focus (`object` absent clears it)
    Focus { object: Option<u64> },
    /// Set the active window (`object` absent clears it)
    Window { object: Option<u64> },
    /// Deliver a key press
    Key {
        text: String,
        #[serde(default)]
        keyval: u32,
    },
    /// Drain the queue until idle
    Run,
    Pause {
        #[serde(default)]
        clear: bool,
    },
    Resume,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default, rename = "object")]
    pub objects: Vec<ObjectSpec>,
    #[serde(default, rename = "script")]
    pub scripts: Vec<ScriptSpec>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = toml::from_str(text).context("Invalid scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("In {}", path.display()))
    }

    /// References must point at objects declared earlier in the file
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut declared = HashSet::new();
        for object in &self.objects {
            for reference in [object.app, object.parent].into_iter().flatten() {
                if !declared.contains(&reference) {
                    bail!(
                        "object {} refers to {} before it is declared",
                        object.id,
                        reference
                    );
                }
            }
            object.state_set()?;
            if !declared.insert(object.id) {
                bail!("object {} declared twice", object.id);
            }
        }

        let mut apps = HashSet::new();
        for script in &self.scripts {
            if !declared.contains(&script.app) {
                bail!("script refers to unknown application {}", script.app);
            }
            if !apps.insert(script.app) {
                bail!("application {} has more than one script", script.app);
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            let referenced = match step {
                Step::Notify { source, data, .. } => {
                    let payload = match data {
                        Some(DataSpec::Object { object }) => Some(*object),
                        _ => None,
                    };
                    vec![*source, payload]
                }
                Step::Kill { object } => vec![Some(*object)],
                Step::Focus { object } | Step::Window { object } => vec![*object],
                _ => Vec::new(),
            };
            for id in referenced.into_iter().flatten() {
                if !declared.contains(&id) {
                    bail!("step {} refers to unknown object {}", i + 1, id);
                }
            }
        }
        Ok(())
    }
}
