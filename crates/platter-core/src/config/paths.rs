//! Standard location of the deck configuration file

use std::path::PathBuf;

/// File name of the deck configuration
pub const CONFIG_FILE_NAME: &str = "deck.yaml";

/// Get the platter configuration directory
///
/// Returns the platform config dir joined with `platter`
/// (e.g. `~/.config/platter` on Linux), or `./platter` when the platform
/// has no config dir.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("platter")
}

/// Get the default deck config path: `{config_dir}/deck.yaml`
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_layout() {
        let path = default_config_path();
        assert!(path.ends_with("platter/deck.yaml"));
        assert!(path.starts_with(config_dir()));
    }
}
