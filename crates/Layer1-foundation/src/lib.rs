//! # beacon-foundation
//!
//! Foundation layer for Beacon:
//! - Error: crate-wide error type
//! - Config: pipeline thresholds and rule lists, layered TOML loading
//! - Accessible: weak handles to accessibility-bus objects, roles, states
//! - Event: notifications, input events, type classification
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  accessibility bus                                        │
//! │      │  raw notification (type, source, details, data)    │
//! │      ▼                                                    │
//! │  Notification ── source: AxObject (weak, may be dead)     │
//! │      │                                                    │
//! │      ▼                                                    │
//! │  EventKind::classify(type) ──▶ rule tables (beacon-core)  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod accessible;
pub mod config;
pub mod error;
pub mod event;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    load_config_from_file, AppNoiseRule, ConfigLoader, PipelineConfig, CONFIG_DIR_NAME,
    PIPELINE_CONFIG_FILE,
};

// ============================================================================
// Accessible objects
// ============================================================================
pub use accessible::{AccessibleNode, AxObject, ObjectId, Role, StateSet};

// ============================================================================
// Events
// ============================================================================
pub use event::{
    AnyData, BrailleEvent, DocumentEvent, EventKind, InputEvent, KeyboardEvent, Notification,
    NotificationId, Property, QueuedEvent, WindowEvent,
};
