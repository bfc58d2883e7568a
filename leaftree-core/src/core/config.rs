//! Workspace settings persistence.
//!
//! Stores where pages live and what the tree file is called, as a JSON file
//! at a caller-chosen location.

use crate::{LeafTreeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the serialized tree inside the storage directory.
pub const DEFAULT_TREE_FILENAME: &str = "tree.json";

/// Persisted workspace settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Directory holding the tree file and every page document.
    pub storage_dir: PathBuf,
    /// File name of the serialized tree, relative to `storage_dir`.
    pub tree_filename: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_directory(),
            tree_filename: DEFAULT_TREE_FILENAME.to_string(),
        }
    }
}

impl WorkspaceConfig {
    pub fn new<P: Into<PathBuf>>(storage_dir: P) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            tree_filename: DEFAULT_TREE_FILENAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_tree_filename(mut self, name: impl Into<String>) -> Self {
        self.tree_filename = name.into();
        self
    }
}

/// Returns the default storage directory: `<data dir>/leaftree`.
///
/// - Linux: `~/.local/share/leaftree`
/// - macOS: `~/Library/Application Support/leaftree`
/// - Windows: `%APPDATA%/leaftree`
pub fn default_storage_directory() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leaftree")
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_config<P: AsRef<Path>>(path: P) -> WorkspaceConfig {
    match fs::read_to_string(path.as_ref()) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!(
                "Ignoring unreadable settings at {}: {e}",
                path.as_ref().display()
            );
            WorkspaceConfig::default()
        }),
        Err(_) => WorkspaceConfig::default(),
    }
}

/// Saves settings to `path`, creating parent directories as needed.
pub fn save_config<P: AsRef<Path>>(path: P, config: &WorkspaceConfig) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| LeafTreeError::Config(format!("Failed to create settings directory: {e}")))?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
        .map_err(|e| LeafTreeError::Config(format!("Failed to write settings: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_tree_filename() {
        let cfg = WorkspaceConfig::default();
        assert_eq!(cfg.tree_filename, "tree.json");
        assert!(cfg.storage_dir.ends_with("leaftree"));
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let cfg = WorkspaceConfig::new(dir.path().join("pages")).with_tree_filename("pages.json");
        save_config(&path, &cfg).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("storageDir"));
        assert!(raw.contains("treeFilename"));
        assert_eq!(load_config(&path), cfg);
    }

    #[test]
    fn test_load_missing_or_corrupt_config_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(load_config(&path), WorkspaceConfig::default());
        fs::write(&path, "{{{").unwrap();
        assert_eq!(load_config(&path), WorkspaceConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"storageDir":"/srv/wiki"}"#).unwrap();
        let cfg = load_config(&path);
        assert_eq!(cfg.storage_dir, PathBuf::from("/srv/wiki"));
        assert_eq!(cfg.tree_filename, "tree.json");
    }
}
