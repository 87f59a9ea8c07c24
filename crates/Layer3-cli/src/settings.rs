//! Pipeline configuration for the CLI commands

use anyhow::Context;
use beacon_foundation::{load_config_from_file, ConfigLoader, PipelineConfig};
use std::path::Path;

/// Merge the user and project files, then an explicit `--config` file.
///
/// The layered loader skips files it cannot parse; an explicit file is
/// checked on its own first so a typo there is reported instead.
pub fn load_config(working_dir: &Path, explicit: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let mut loader = ConfigLoader::new(working_dir);
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        load_config_from_file(path)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        loader.add_path(path.to_path_buf());
    }
    loader.load_all().context("Failed to load pipeline configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "flood_threshold = 80\n").unwrap();

        let config = load_config(dir.path(), Some(&path)).unwrap();
        assert_eq!(config.flood_threshold, 80);
    }

    #[test]
    fn test_malformed_explicit_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "flood_threshold = = 3").unwrap();

        let err = load_config(dir.path(), Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid config file"));
    }

    #[test]
    fn test_missing_explicit_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path(), Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
