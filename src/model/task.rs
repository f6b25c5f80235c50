use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque task identifier, serialized as the textual UUID form
pub type TaskId = Uuid;

/// A single to-do entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Assigned at creation, never changes
    pub id: TaskId,
    pub completed: bool,
    /// Title text. Empty titles are allowed.
    pub title: String,
}

impl Task {
    /// Create an uncompleted task with a fresh random id
    pub fn new(title: impl Into<String>) -> Self {
        Task::with_id(Uuid::new_v4(), title)
    }

    /// Create an uncompleted task with a caller-chosen id
    fn with_id(id: TaskId, title: impl Into<String>) -> Self {
        Task {
            id,
            completed: false,
            title: title.into(),
        }
    }

    /// Flip the completed flag
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}
