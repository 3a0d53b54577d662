//! YAML configuration I/O
//!
//! Loading is lenient: a missing or unreadable file yields the default
//! config so a deck can always be constructed. [`try_load_config`] is the
//! strict variant for callers that want to report parse errors.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load configuration from a YAML file, falling back to defaults
///
/// A missing file is expected on first run and logged at info level; a file
/// that exists but fails to parse is logged as a warning.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("Config {:?} not found, using defaults", path);
        return T::default();
    }

    match try_load_config(path) {
        Ok(config) => {
            log::info!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("Ignoring config {:?}: {:#}", path, e);
            T::default()
        }
    }
}

/// Load configuration from a YAML file, reporting any failure
pub fn try_load_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeckConfig;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: DeckConfig = load_config(Path::new("/nonexistent/platter/deck.yaml"));
        assert_eq!(config, DeckConfig::default());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deck.yaml");

        let mut config = DeckConfig::default();
        config.fling.overlap_rate = Some(0.3);
        config.resume.preload_lead = 0.02;
        config.gesture.sensitivity = 2.5;

        save_config(&config, &path).unwrap();
        let loaded: DeckConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.yaml");
        std::fs::write(&path, "fling: [not, a, map]").unwrap();

        assert!(try_load_config::<DeckConfig>(&path).is_err());
        let config: DeckConfig = load_config(&path);
        assert_eq!(config, DeckConfig::default());
    }
}
