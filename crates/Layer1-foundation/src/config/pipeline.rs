//! Pipeline Config - thresholds and rule lists for the event pipeline

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Config file name
pub const PIPELINE_CONFIG_FILE: &str = "pipeline.toml";

/// Known-noisy event type for one application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppNoiseRule {
    /// Lower-case application name. Empty matches unnamed applications.
    pub app: String,

    /// Event type prefix
    pub event_type: String,

    /// Only match types ending in `:system`
    #[serde(default)]
    pub system_only: bool,
}

impl AppNoiseRule {
    pub fn new(app: &str, event_type: &str) -> Self {
        Self {
            app: app.to_string(),
            event_type: event_type.to_string(),
            system_only: false,
        }
    }

    pub fn system_only(mut self) -> Self {
        self.system_only = true;
        self
    }

    pub fn matches(&self, app_name: &str, event_type: &str) -> bool {
        self.app == app_name
            && event_type.starts_with(&self.event_type)
            && (!self.system_only || event_type.ends_with(":system"))
    }
}

// ============================================================================
// PipelineConfig
// ============================================================================

/// Event pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Queue depth above which focus-only admission kicks in
    pub deluge_threshold: usize,

    /// Queue depth above which the queue is pruned and dispatch gated
    pub flood_threshold: usize,

    /// Delay before the "no focus" recovery check, in milliseconds
    pub recovery_delay_ms: u64,

    /// Text insertions longer than this are dropped
    pub max_inserted_text: i32,

    /// Event type prefixes that are always dropped
    pub ignored_event_prefixes: Vec<String>,

    /// Event type prefixes that are never dropped
    pub never_ignored_prefixes: Vec<String>,

    /// Toolkits whose events are processed synchronously
    pub synchronous_toolkits: Vec<String>,

    /// Event types withdrawn from the bus during window/busy transitions
    pub suspendable_event_types: Vec<String>,

    /// Process progress bar updates even when their script is inactive
    pub present_all_progress_bars: bool,

    /// Regex restricting verbose per-event logging to matching types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_debug_filter: Option<String>,

    /// Per-application noise table
    pub app_noise: Vec<AppNoiseRule>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deluge_threshold: 30,
            flood_threshold: 50,
            recovery_delay_ms: 2500,
            max_inserted_text: 1000,
            ignored_event_prefixes: Vec::new(),
            never_ignored_prefixes: vec!["window:".to_string(), "mouse:button".to_string()],
            synchronous_toolkits: vec!["VCL".to_string()],
            suspendable_event_types: vec![
                "object:children-changed:add".to_string(),
                "object:children-changed:remove".to_string(),
                "object:property-change:accessible-name".to_string(),
                "object:state-changed:sensitive".to_string(),
                "object:state-changed:showing".to_string(),
                "object:text-changed:delete".to_string(),
            ],
            present_all_progress_bars: false,
            event_debug_filter: None,
            app_noise: vec![
                AppNoiseRule::new("gnome-shell", "object:children-changed:remove"),
                AppNoiseRule::new("", "object:children-changed:remove"),
                AppNoiseRule::new("thunderbird", "object:children-changed").system_only(),
            ],
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.flood_threshold <= self.deluge_threshold {
            return Err(Error::Config(format!(
                "flood_threshold ({}) must be greater than deluge_threshold ({})",
                self.flood_threshold, self.deluge_threshold
            )));
        }
        if self.max_inserted_text < 0 {
            return Err(Error::Config("max_inserted_text must not be negative".into()));
        }
        self.debug_filter()?;
        Ok(())
    }

    /// Compiled event debug filter
    pub fn debug_filter(&self) -> Result<Option<Regex>> {
        self.event_debug_filter
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(Error::from)
    }

    pub fn recovery_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.recovery_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.flood_threshold > config.deluge_threshold);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml("flood_threshold = 80\n").unwrap();
        assert_eq!(config.flood_threshold, 80);
        assert_eq!(config.deluge_threshold, 30);
        assert_eq!(config.recovery_delay_ms, 2500);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let err = PipelineConfig::from_toml("deluge_threshold = 60\nflood_threshold = 50\n");
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_bad_debug_filter() {
        let config = PipelineConfig {
            event_debug_filter: Some("object:(".into()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Regex(_))));
    }

    #[test]
    fn test_app_noise_rule() {
        let rule = AppNoiseRule::new("thunderbird", "object:children-changed").system_only();
        assert!(rule.matches("thunderbird", "object:children-changed:add:system"));
        assert!(!rule.matches("thunderbird", "object:children-changed:add"));
        assert!(!rule.matches("gedit", "object:children-changed:add:system"));
    }
}
