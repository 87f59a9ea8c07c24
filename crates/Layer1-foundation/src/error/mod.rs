//! Error types for Beacon
//!
//! Every layer reports failures through this one enum.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Beacon error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Accessibility bus
    // ========================================================================
    /// The bus object behind a handle no longer exists.
    #[error("Accessible object {0} is dead")]
    DeadObject(u64),

    #[error("Bus subscription error: {event_type} - {message}")]
    Bus { event_type: String, message: String },

    // ========================================================================
    // Scripts (handlers)
    // ========================================================================
    #[error("Script failed: {script} - {message}")]
    Script { script: String, message: String },

    // ========================================================================
    // Conversions from external errors
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Dead objects are routine on the accessibility bus; callers log these
    /// quietly instead of treating them as faults.
    pub fn is_benign(&self) -> bool {
        matches!(self, Error::DeadObject(_))
    }

    /// Bus error helper
    pub fn bus(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Bus {
            event_type: event_type.into(),
            message: message.into(),
        }
    }

    /// Script failure helper
    pub fn script(script: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Script {
            script: script.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_object_is_benign() {
        assert!(Error::DeadObject(7).is_benign());
        assert!(!Error::script("gedit", "boom").is_benign());
    }

    #[test]
    fn test_error_display() {
        let err = Error::bus("object:children-changed", "connection closed");
        assert_eq!(
            err.to_string(),
            "Bus subscription error: object:children-changed - connection closed"
        );
    }
}
