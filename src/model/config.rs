use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding store.json and the recovery log.
    /// Absent = platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Keep data that could not be loaded or saved in .recovery.log
    #[serde(default = "default_true")]
    pub recovery_log: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_dir: None,
            recovery_log: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Paint checkboxes in the theme color
    #[serde(default = "default_true")]
    pub color: bool,
    /// Titles wider than this many cells are truncated in listings (0 = never)
    #[serde(default)]
    pub max_title_width: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            color: true,
            max_title_width: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.store.data_dir.is_none());
        assert!(config.store.recovery_log);
        assert!(config.ui.color);
        assert_eq!(config.ui.max_title_width, 0);
    }

    #[test]
    fn partial_sections() {
        let config: Config = toml::from_str(
            r#"[store]
data_dir = "/tmp/todo"

[ui]
color = false
"#,
        )
        .unwrap();
        assert_eq!(config.store.data_dir, Some(PathBuf::from("/tmp/todo")));
        assert!(config.store.recovery_log);
        assert!(!config.ui.color);
    }
}
