use serde::{Deserialize, Serialize};

use crate::model::theme::DEFAULT_THEME_ID;

/// User-configurable settings persisted next to the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Hide completed tasks from the visible list
    pub hide_completed: bool,
    /// Selected theme id. May reference no built-in theme.
    pub theme: i64,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            hide_completed: false,
            theme: DEFAULT_THEME_ID,
        }
    }
}
