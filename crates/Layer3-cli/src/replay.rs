//! Scenario replay - drives a scenario through a live `EventManager`

use crate::scenario::{DataSpec, Scenario, Step};
use crate::scheduler::{TickLoop, TokioScheduler};
use crate::sim::{BusTally, SimBus, SimRegistry, SimScript, SimTree};
use beacon_core::{
    ActiveWindowPointerRouter, Collaborators, EventManager, FocusState, NullInputWatcher, Script,
    StatsSnapshot,
};
use beacon_foundation::{AnyData, InputEvent, KeyboardEvent, Notification, PipelineConfig};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What one script saw during the replay
#[derive(Debug, Clone, Serialize)]
pub struct ScriptReport {
    pub name: String,
    pub processed: Vec<String>,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: usize,
    pub drain_steps: usize,
    pub recoveries: usize,
    pub queue_len: usize,
    pub live_objects: usize,
    pub active_script: Option<String>,
    pub bus: BusTally,
    pub scripts: Vec<ScriptReport>,
    pub stats: StatsSnapshot,
}

impl ReplayReport {
    pub fn script(&self, name: &str) -> Option<&ScriptReport> {
        self.scripts.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Replay summary")?;
        writeln!(f, "{}", "-".repeat(60))?;
        writeln!(
            f,
            "steps: {}  drain steps: {}  recoveries: {}  left in queue: {}  live objects: {}",
            self.steps, self.drain_steps, self.recoveries, self.queue_len, self.live_objects
        )?;
        writeln!(
            f,
            "active script: {}",
            self.active_script.as_deref().unwrap_or("(none)")
        )?;
        writeln!(
            f,
            "bus: {} subscribe, {} unsubscribe",
            self.bus.subscribed, self.bus.unsubscribed
        )?;

        let s = &self.stats;
        writeln!(
            f,
            "admitted {}  dropped {}  pruned {}  obsoleted {}  flood-discarded {}",
            s.admitted, s.dropped, s.pruned, s.obsoleted, s.flood_discarded
        )?;
        writeln!(
            f,
            "processed {}  unrouted {}  handler failures {}  input {}",
            s.processed, s.unrouted, s.handler_failures, s.input_processed
        )?;

        for script in &self.scripts {
            writeln!(f)?;
            writeln!(f, "[{}] {} notifications", script.name, script.processed.len())?;
            for event_type in &script.processed {
                writeln!(f, "  {}", event_type)?;
            }
            for key in &script.keys {
                writeln!(f, "  key {:?}", key)?;
            }
        }
        Ok(())
    }
}

/// A scenario wired to a pipeline
pub struct Replay {
    tree: SimTree,
    bus: Arc<SimBus>,
    registry: Arc<SimRegistry>,
    manager: EventManager,
    ticks: TickLoop,
    steps: Vec<Step>,
    drain_steps: usize,
}

impl Replay {
    /// Must be called inside a tokio runtime
    pub fn new(scenario: Scenario, config: PipelineConfig) -> anyhow::Result<Self> {
        let tree = SimTree::build(&scenario)?;
        let focus = Arc::new(FocusState::new());
        let registry = Arc::new(SimRegistry::build(&scenario, &tree, &focus)?);
        let bus = Arc::new(SimBus::default());
        let (scheduler, ticks) = TokioScheduler::new();

        let manager = EventManager::new(
            config,
            Collaborators {
                bus: bus.clone(),
                scripts: registry.clone(),
                pointer: Arc::new(ActiveWindowPointerRouter::new(registry.clone())),
                input: Arc::new(NullInputWatcher),
                scheduler: Arc::new(scheduler),
            },
            focus,
        )?;

        Ok(Self {
            tree,
            bus,
            registry,
            manager,
            ticks,
            steps: scenario.steps,
            drain_steps: 0,
        })
    }

    pub fn manager(&self) -> &EventManager {
        &self.manager
    }

    /// Run every step, then wait for the queue and recovery timers to settle
    pub async fn run(mut self) -> anyhow::Result<ReplayReport> {
        self.manager.activate();
        for script in self.registry.all() {
            self.manager.register_script_listeners(script.as_ref());
        }

        let steps = std::mem::take(&mut self.steps);
        for (i, step) in steps.iter().enumerate() {
            debug!(step = i + 1, ?step, "Replaying step");
            self.apply(step)?;
        }
        self.drain_steps += self.ticks.run_until_settled(&self.manager).await;

        let report = self.report(steps.len());
        self.manager.deactivate();
        info!(
            processed = report.stats.processed,
            dropped = report.stats.dropped,
            "Replay finished"
        );
        Ok(report)
    }

    fn apply(&mut self, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::Notify {
                event_type,
                source,
                detail1,
                detail2,
                data,
            } => {
                let source = source.map(|id| self.tree.lookup(id)).transpose()?;
                let any_data = match data {
                    None => AnyData::None,
                    Some(DataSpec::Text(text)) => AnyData::Text(text.clone()),
                    Some(DataSpec::Bool(b)) => AnyData::Bool(*b),
                    Some(DataSpec::Object { object }) => AnyData::Object(self.tree.lookup(*object)?),
                };
                let event = Notification::new(event_type.as_str(), source)
                    .with_details(*detail1, *detail2)
                    .with_any_data(any_data);
                self.manager.enqueue_object_event(event);
            }
            Step::Kill { object } => {
                if !self.tree.kill(*object) {
                    debug!(object, "Object already dead");
                }
            }
            Step::Focus { object } => {
                let obj = object.map(|id| self.tree.lookup(id)).transpose()?;
                self.manager.focus().set_locus_of_focus(obj);
            }
            Step::Window { object } => {
                let obj = object.map(|id| self.tree.lookup(id)).transpose()?;
                self.manager.focus().set_active_window(obj);
            }
            Step::Key { text, keyval } => {
                self.manager.enqueue_input_event(InputEvent::Keyboard(KeyboardEvent {
                    pressed: true,
                    keyval: *keyval,
                    keycode: 0,
                    modifiers: 0,
                    event_string: text.clone(),
                }));
            }
            Step::Run => {
                self.drain_steps += self.ticks.run_ready(&self.manager);
            }
            Step::Pause { clear } => {
                self.manager.pause_queuing(true, *clear, "scenario pause");
            }
            Step::Resume => {
                self.manager.pause_queuing(false, false, "scenario resume");
            }
        }
        Ok(())
    }

    fn report(&self, steps: usize) -> ReplayReport {
        let scripts = self
            .registry
            .all()
            .iter()
            .map(|s: &Arc<SimScript>| ScriptReport {
                name: s.name().to_string(),
                processed: s.processed(),
                keys: s.keys(),
            })
            .collect();

        ReplayReport {
            steps,
            drain_steps: self.drain_steps,
            recoveries: self.ticks.recoveries_fired(),
            queue_len: self.manager.queue_len(),
            live_objects: self.tree.live_count(),
            active_script: self
                .manager
                .focus()
                .active_script()
                .map(|s| s.name().to_string()),
            bus: self.bus.tally(),
            scripts,
            stats: self.manager.stats(),
        }
    }
}

/// Load, wire and replay in one go
pub async fn replay(scenario: Scenario, config: PipelineConfig) -> anyhow::Result<ReplayReport> {
    Replay::new(scenario, config)?.run().await
}
