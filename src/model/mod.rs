pub mod task;
pub mod theme;
pub mod prefs;
pub mod config;

pub use task::*;
pub use theme::*;
pub use prefs::*;
pub use config::*;
