//! Configuration Loader
//!
//! ## Search order
//!
//! 1. User-level: `~/.beacon/pipeline.toml`
//! 2. Project-level: `./.beacon/pipeline.toml`
//! 3. Explicit path given on the command line
//!
//! Keys in later files override the same keys in earlier files.

use super::pipeline::{PipelineConfig, PIPELINE_CONFIG_FILE};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Config directory name
pub const CONFIG_DIR_NAME: &str = ".beacon";

// ============================================================================
// ConfigLoader
// ============================================================================

/// Loads and merges pipeline configuration files
pub struct ConfigLoader {
    search_paths: Vec<ConfigPath>,
}

#[derive(Debug, Clone)]
struct ConfigPath {
    path: PathBuf,
    /// Higher wins
    priority: u8,
    description: &'static str,
}

impl ConfigLoader {
    /// Default search paths relative to `working_dir`
    pub fn new(working_dir: &Path) -> Self {
        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            paths.push(ConfigPath {
                path: home.join(CONFIG_DIR_NAME).join(PIPELINE_CONFIG_FILE),
                priority: 10,
                description: "User settings",
            });
        }

        paths.push(ConfigPath {
            path: working_dir.join(CONFIG_DIR_NAME).join(PIPELINE_CONFIG_FILE),
            priority: 20,
            description: "Project settings",
        });

        Self {
            search_paths: paths,
        }
    }

    /// Only the given paths, in increasing priority
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        let search_paths = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| ConfigPath {
                path,
                priority: i as u8,
                description: "Custom",
            })
            .collect();

        Self { search_paths }
    }

    /// Add a path that overrides everything found so far
    pub fn add_path(&mut self, path: PathBuf) {
        let priority = self
            .search_paths
            .iter()
            .map(|p| p.priority)
            .max()
            .map_or(0, |p| p.saturating_add(10));
        self.search_paths.push(ConfigPath {
            path,
            priority,
            description: "Explicit",
        });
        self.search_paths.sort_by_key(|p| p.priority);
    }

    /// Load every existing file and merge them.
    ///
    /// Unreadable files are skipped with a warning. The merged result must
    /// still validate.
    pub fn load_all(&self) -> Result<PipelineConfig> {
        let mut merged = toml::Table::new();

        for config_path in &self.search_paths {
            if !config_path.path.exists() {
                continue;
            }
            match read_table(&config_path.path) {
                Ok(table) => {
                    info!(
                        "Loaded {} from: {}",
                        config_path.description,
                        config_path.path.display()
                    );
                    merge_tables(&mut merged, table);
                }
                Err(e) => {
                    warn!(
                        "Failed to load settings from {}: {}",
                        config_path.path.display(),
                        e
                    );
                }
            }
        }

        let config: PipelineConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| Error::Config(e.to_string()))?;
        config.validate()?;

        debug!(
            deluge = config.deluge_threshold,
            flood = config.flood_threshold,
            "Pipeline configuration ready"
        );
        Ok(config)
    }

    pub fn existing_files(&self) -> Vec<PathBuf> {
        self.search_paths
            .iter()
            .filter(|p| p.path.exists())
            .map(|p| p.path.clone())
            .collect()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Load a single file
pub fn load_config_from_file(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    PipelineConfig::from_toml(&content).map_err(|e| {
        Error::Config(format!("Invalid {} at {}: {}", PIPELINE_CONFIG_FILE, path.display(), e))
    })
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.parse::<toml::Table>()?)
}

/// Recursive merge; `later` wins on conflicts
fn merge_tables(base: &mut toml::Table, later: toml::Table) {
    for (key, value) in later {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
