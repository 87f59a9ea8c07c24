//! Config - pipeline settings
//!
//! - `pipeline.rs` - PipelineConfig (thresholds, rule lists)
//! - `loader.rs` - layered TOML loading

mod loader;
mod pipeline;

pub use loader::{load_config_from_file, ConfigLoader, CONFIG_DIR_NAME};
pub use pipeline::{AppNoiseRule, PipelineConfig, PIPELINE_CONFIG_FILE};
