//! The authoritative owner of the task list and preferences.
//!
//! Every mutation is applied in memory, written through to the backing
//! [`KeyValueStore`], and then announced to subscribers, all before the
//! call returns. Loading never fails: values that are missing or cannot be
//! decoded fall back to their defaults and are reported as
//! [`LoadFallback`]s.

use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::io::kv::{KeyValueStore, KvError};
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::prefs::Preferences;
use crate::model::task::{Task, TaskId};
use crate::model::theme::{self, ThemeColor};
use crate::ops::task_ops::{self, TaskError};

/// Store key holding the task list
pub const TASKS_KEY: &str = "Tasks";
/// Store key holding the hide-completed flag
pub const HIDE_COMPLETED_KEY: &str = "HideCompleted";
/// Store key holding the selected theme id
pub const THEME_KEY: &str = "Theme";

/// Which piece of state a mutation changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Tasks,
    HideCompleted,
    Theme,
}

impl StoreChange {
    /// The store key this change is persisted under
    pub fn key(self) -> &'static str {
        match self {
            StoreChange::Tasks => TASKS_KEY,
            StoreChange::HideCompleted => HIDE_COMPLETED_KEY,
            StoreChange::Theme => THEME_KEY,
        }
    }
}

/// Why a persisted value was replaced by its default during load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadFallback {
    /// Nothing stored under the key yet
    Missing { key: &'static str },
    /// A value exists but does not decode to the expected shape
    Undecodable {
        key: &'static str,
        error: String,
        raw: String,
    },
    /// The backing store could not be read
    Unreadable { key: &'static str, error: String },
}

impl LoadFallback {
    pub fn key(&self) -> &'static str {
        match self {
            LoadFallback::Missing { key }
            | LoadFallback::Undecodable { key, .. }
            | LoadFallback::Unreadable { key, .. } => *key,
        }
    }
}

/// Read-only view of the current state, handed to subscribers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub tasks: Vec<Task>,
    pub prefs: Preferences,
}

impl StoreState {
    /// Tasks to display, honoring the hide-completed preference
    pub fn visible_tasks(&self) -> Vec<&Task> {
        task_ops::visible_tasks(&self.tasks, self.prefs.hide_completed)
    }
}

/// Handle returned by [`TaskStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(StoreChange, &StoreState)>;

pub struct TaskStore<S: KeyValueStore> {
    kv: S,
    state: StoreState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    version: u64,
    recovery_dir: Option<PathBuf>,
    fallbacks: Vec<LoadFallback>,
}

impl<S: KeyValueStore> fmt::Debug for TaskStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("version", &self.version)
            .finish()
    }
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Rehydrate from `kv`, falling back to defaults for anything missing
    /// or undecodable.
    pub fn load(kv: S) -> Self {
        Self::load_inner(kv, None)
    }

    /// Like [`TaskStore::load`], but data that cannot be decoded or saved
    /// is also kept in the recovery log under `data_dir`.
    pub fn load_with_recovery(kv: S, data_dir: impl Into<PathBuf>) -> Self {
        Self::load_inner(kv, Some(data_dir.into()))
    }

    fn load_inner(kv: S, recovery_dir: Option<PathBuf>) -> Self {
        let defaults = Preferences::default();
        let mut fallbacks = Vec::new();

        let tasks: Vec<Task> = load_value(&kv, TASKS_KEY, &mut fallbacks).unwrap_or_default();
        let hide_completed =
            load_value(&kv, HIDE_COMPLETED_KEY, &mut fallbacks).unwrap_or(defaults.hide_completed);
        let theme = load_value(&kv, THEME_KEY, &mut fallbacks).unwrap_or(defaults.theme);

        let tasks = dedup_ids(tasks);

        let store = TaskStore {
            kv,
            state: StoreState {
                tasks,
                prefs: Preferences {
                    hide_completed,
                    theme,
                },
            },
            listeners: Vec::new(),
            next_subscription: 0,
            version: 0,
            recovery_dir,
            fallbacks,
        };
        store.report_fallbacks();
        store
    }

    fn report_fallbacks(&self) {
        for fallback in &self.fallbacks {
            match fallback {
                LoadFallback::Missing { key } => {
                    tracing::debug!(key, "no stored value, using default");
                }
                LoadFallback::Undecodable { key, error, raw } => {
                    tracing::warn!(key, error = %error, "stored value could not be decoded, using default");
                    // The same bad value is seen again on every start until overwritten.
                    self.log_recovery_unique(
                        RecoveryEntry::now(
                            RecoveryCategory::Decode,
                            format!("{} could not be decoded", key),
                        )
                        .field("Key", *key)
                        .field("Error", error.clone())
                        .body(raw.clone()),
                    );
                }
                LoadFallback::Unreadable { key, error } => {
                    tracing::warn!(key, error = %error, "store could not be read, using default");
                }
            }
        }
    }

    fn log_recovery(&self, entry: RecoveryEntry) {
        if let Some(dir) = &self.recovery_dir {
            recovery::log_recovery(dir, entry);
        }
    }

    fn log_recovery_unique(&self, entry: RecoveryEntry) {
        if let Some(dir) = &self.recovery_dir {
            recovery::log_recovery_unique(dir, entry);
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.state.tasks.iter().find(|t| t.id == id)
    }

    /// Current position of the task with `id` in the full list
    pub fn position_of(&self, id: TaskId) -> Option<usize> {
        task_ops::find_index(&self.state.tasks, id)
    }

    pub fn preferences(&self) -> Preferences {
        self.state.prefs
    }

    pub fn hide_completed(&self) -> bool {
        self.state.prefs.hide_completed
    }

    pub fn theme(&self) -> i64 {
        self.state.prefs.theme
    }

    /// Accent color of the selected theme (neutral for unknown ids)
    pub fn theme_color(&self) -> ThemeColor {
        theme::theme_color(self.state.prefs.theme)
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.state.visible_tasks()
    }

    /// Incremented once per applied mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Values that fell back to defaults when this store was loaded
    pub fn load_fallbacks(&self) -> &[LoadFallback] {
        &self.fallbacks
    }

    pub fn backing(&self) -> &S {
        &self.kv
    }

    pub fn into_backing(self) -> S {
        self.kv
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register a listener called synchronously after every applied
    /// mutation, in registration order.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(StoreChange, &StoreState) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a new uncompleted task. Returns its id.
    pub fn add_task(&mut self, title: impl Into<String>) -> TaskId {
        let task = Task::new(title);
        let id = task.id;
        self.state.tasks.push(task);
        self.commit(StoreChange::Tasks);
        id
    }

    /// Returns false (and changes nothing) if no task has `id`.
    pub fn set_completed(&mut self, id: TaskId, completed: bool) -> bool {
        let Some(task) = task_ops::find_task_mut(&mut self.state.tasks, id) else {
            return false;
        };
        task.completed = completed;
        self.commit(StoreChange::Tasks);
        true
    }

    /// Flip the completed flag. Returns the new value, or None if no task
    /// has `id`.
    pub fn toggle_completed(&mut self, id: TaskId) -> Option<bool> {
        let task = task_ops::find_task_mut(&mut self.state.tasks, id)?;
        task.toggle();
        let completed = task.completed;
        self.commit(StoreChange::Tasks);
        Some(completed)
    }

    /// Returns false (and changes nothing) if no task has `id`.
    pub fn rename_task(&mut self, id: TaskId, title: impl Into<String>) -> bool {
        let Some(task) = task_ops::find_task_mut(&mut self.state.tasks, id) else {
            return false;
        };
        task.title = title.into();
        self.commit(StoreChange::Tasks);
        true
    }

    pub fn remove_task(&mut self, index: usize) -> Result<Task, TaskError> {
        let task = task_ops::remove_at(&mut self.state.tasks, index)?;
        self.commit(StoreChange::Tasks);
        Ok(task)
    }

    /// See [`task_ops::move_task`] for the index convention.
    pub fn move_task(&mut self, from: usize, to: usize) -> Result<(), TaskError> {
        task_ops::move_task(&mut self.state.tasks, from, to)?;
        self.commit(StoreChange::Tasks);
        Ok(())
    }

    pub fn remove_all(&mut self) {
        self.state.tasks.clear();
        self.commit(StoreChange::Tasks);
    }

    pub fn set_hide_completed(&mut self, hide: bool) {
        self.state.prefs.hide_completed = hide;
        self.commit(StoreChange::HideCompleted);
    }

    /// Any id is accepted; ids matching no built-in theme render neutral.
    pub fn set_theme(&mut self, theme: i64) {
        self.state.prefs.theme = theme;
        self.commit(StoreChange::Theme);
    }

    fn commit(&mut self, change: StoreChange) {
        self.persist(change);
        self.version += 1;
        for (_, listener) in self.listeners.iter_mut() {
            listener(change, &self.state);
        }
    }

    /// Best-effort write of the changed field. Failures are logged, never
    /// returned.
    fn persist(&mut self, change: StoreChange) {
        let value = match change {
            StoreChange::Tasks => serde_json::to_value(&self.state.tasks),
            StoreChange::HideCompleted => serde_json::to_value(self.state.prefs.hide_completed),
            StoreChange::Theme => serde_json::to_value(self.state.prefs.theme),
        };
        let result = value
            .map_err(KvError::from)
            .and_then(|v| self.kv.set(change.key(), v));
        if let Err(e) = result {
            tracing::warn!(key = change.key(), error = %e, "could not persist change");
            let payload = match change {
                StoreChange::Tasks => serde_json::to_string_pretty(&self.state.tasks),
                StoreChange::HideCompleted => {
                    serde_json::to_string(&self.state.prefs.hide_completed)
                }
                StoreChange::Theme => serde_json::to_string(&self.state.prefs.theme),
            }
            .unwrap_or_default();
            self.log_recovery(
                RecoveryEntry::now(
                    RecoveryCategory::Write,
                    format!("{} could not be saved", change.key()),
                )
                .field("Key", change.key())
                .field("Error", e.to_string())
                .body(payload),
            );
        }
    }
}

/// Read and decode one key, recording why it fell back if it did.
fn load_value<S, T>(kv: &S, key: &'static str, fallbacks: &mut Vec<LoadFallback>) -> Option<T>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    match kv.get(key) {
        Ok(Some(value)) => decode_value(key, value, fallbacks),
        Ok(None) => {
            fallbacks.push(LoadFallback::Missing { key });
            None
        }
        Err(e) => {
            fallbacks.push(LoadFallback::Unreadable {
                key,
                error: e.to_string(),
            });
            None
        }
    }
}

fn decode_value<T: DeserializeOwned>(
    key: &'static str,
    value: Value,
    fallbacks: &mut Vec<LoadFallback>,
) -> Option<T> {
    let raw = value.to_string();
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            fallbacks.push(LoadFallback::Undecodable {
                key,
                error: e.to_string(),
                raw,
            });
            None
        }
    }
}

/// Drop later tasks whose id repeats an earlier one.
fn dedup_ids(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = std::collections::HashSet::new();
    let before = tasks.len();
    let tasks: Vec<Task> = tasks.into_iter().filter(|t| seen.insert(t.id)).collect();
    if tasks.len() != before {
        tracing::warn!(
            dropped = before - tasks.len(),
            "stored task list repeated ids, keeping first occurrences"
        );
    }
    tasks
}
