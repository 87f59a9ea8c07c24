//! beacon-core: event pipeline runtime for Beacon
//!
//! Layer2 - sits between the accessibility bus and per-application scripts.
//!
//! # Modules
//!
//! - `registry`: reference-counted bus subscriptions
//! - `filter`: admission filter and role rule table
//! - `flood`: deluge/flood thresholds and queue pruning
//! - `suspension`: withdraws noisy listeners during window transitions
//! - `queue`: ordered event buffer and obsolescence check
//! - `router`: script lookup and activation decision
//! - `manager`: `EventManager`, which ties the above together
//! - `focus`: injected focus/window/active-script context
//! - `traits`: collaborator boundaries (bus, scripts, input, scheduler)
//!
//! # Example
//!
//! ```ignore
//! use beacon_core::{Collaborators, EventManager, FocusState, ManualScheduler};
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let manager = EventManager::new(config, Collaborators { bus, scripts, pointer, input, scheduler: scheduler.clone() }, Arc::new(FocusState::new()))?;
//! manager.activate();
//! manager.register_script_listeners(script.as_ref());
//!
//! // from the bus callback
//! manager.enqueue_object_event(notification);
//!
//! // from the host loop
//! scheduler.run_pending(&manager);
//! ```

pub mod filter;
pub mod flood;
pub mod focus;
pub mod manager;
pub mod queue;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod stats;
pub mod suspension;
pub mod traits;

#[cfg(test)]
mod test_support;

// ============================================================================
// Re-exports: pipeline
// ============================================================================
pub use manager::{Collaborators, DrainStatus, EventManager};
pub use scheduler::ManualScheduler;
pub use stats::{PipelineStats, StatsSnapshot};

// ============================================================================
// Re-exports: components
// ============================================================================
pub use filter::{AdmissionContext, AdmissionFilter, Verdict};
pub use flood::{FloodController, FLOODABLE_EVENT_TYPES};
pub use focus::FocusState;
pub use queue::{EventQueue, QueueEntry};
pub use registry::ListenerRegistry;
pub use router::{ActivationDecision, ScriptRouter, HIGH_CHURN_EVENT_TYPES};
pub use suspension::SuspensionCoordinator;

// ============================================================================
// Re-exports: collaborator traits
// ============================================================================
pub use traits::{
    same_script, ActiveWindowPointerRouter, BusListener, InputKind, InputWatcher,
    NullInputWatcher, PointerRouter, Scheduler, Script, ScriptRef, ScriptRegistry,
};

// Foundation types used in this crate's public API
pub use beacon_foundation::{
    AnyData, AxObject, Error, InputEvent, Notification, PipelineConfig, Result, Role, StateSet,
};
