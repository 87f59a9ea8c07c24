//! beacon-cli: scenario replay for the Beacon event pipeline
//!
//! Layer3 - builds a simulated desktop from a TOML scenario, feeds its
//! notifications through `beacon_core::EventManager` and reports what every
//! script received.

pub mod replay;
pub mod scenario;
pub mod scheduler;
pub mod settings;
pub mod sim;

pub use replay::{replay, Replay, ReplayReport, ScriptReport};
pub use scenario::{DataSpec, ObjectSpec, Scenario, ScriptSpec, Step};
pub use scheduler::{Tick, TickLoop, TokioScheduler};
pub use settings::load_config;
pub use sim::{BusTally, SimBus, SimRegistry, SimScript, SimTree};
