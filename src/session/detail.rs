//! Session details
//!
//! Free-form key/value metadata attached to a session. Writers set
//! details while the catalog is staged and they are embedded in the
//! session file. Readers may update details after the fact; since the
//! session file itself is immutable, updates accumulate in a JSON side
//! file next to it (`.sse`) and are replayed on open.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{SessionError, SessionResult};
use super::ordmap::OrderedMap;

/// One entry of the reader-side update log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailUpdate {
    pub key: String,
    pub value: String,
}

impl DetailUpdate {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Key/value metadata of a session, in insertion order
#[derive(Debug, Clone, Default)]
pub struct SessionDetails {
    entries: OrderedMap<String, String>,
    /// Updates staged since the last save
    pending: Vec<DetailUpdate>,
}

impl SessionDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries
    pub fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            pending: Vec::new(),
        }
    }

    /// Set a detail (writer side, embedded at close)
    ///
    /// Re-setting a key overwrites its value but keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Update a detail (reader side, staged for the update log)
    pub fn update(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let update = DetailUpdate::new(key, value);
        self.entries
            .insert(update.key.clone(), update.value.clone());
        self.pending.push(update);
    }

    /// Update several details in one call
    ///
    /// Keys and values are matched by position.
    pub fn update_many<K, V>(&mut self, keys: &[K], values: &[V]) -> SessionResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if keys.len() != values.len() {
            return Err(SessionError::Argument(format!(
                "detail update has {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        for (key, value) in keys.iter().zip(values) {
            self.update(key.as_ref(), value.as_ref());
        }
        Ok(())
    }

    /// Replay a previously saved update log
    pub fn apply_log(&mut self, log: &[DetailUpdate]) {
        for update in log {
            self.entries.insert(update.key.clone(), update.value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the staged updates for appending to the log
    pub fn take_pending(&mut self) -> Vec<DetailUpdate> {
        std::mem::take(&mut self.pending)
    }

    /// Snapshot entries for embedding in the session file
    pub fn to_entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Load a detail update log from a `.sse` side file
///
/// A missing file is an empty log.
pub fn load_update_log(path: &Path) -> SessionResult<Vec<DetailUpdate>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let log: Vec<DetailUpdate> = serde_json::from_str(&content)?;
    Ok(log)
}

/// Save a detail update log to a `.sse` side file
pub fn save_update_log(path: &Path, log: &[DetailUpdate]) -> SessionResult<()> {
    let content = serde_json::to_string_pretty(log)?;
    std::fs::write(path, content)?;
    Ok(())
}
