//! Process-wide settings store
//!
//! One JSON value per storage key, optionally backed by a file under the
//! user config dir. Writes are partial key sets; every successful write
//! yields the per-key old/new changes that the host broadcasts to all live
//! contexts. Writes replace whole keys (last write wins), so readers always
//! observe either the old or the new value of a key, never a partial one.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

use super::Settings;
use crate::constants::config;

/// One key's transition, as delivered to change listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    /// Previous value; `None` when the key did not exist yet.
    pub old: Option<Value>,
    pub new: Value,
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl SettingsStore {
    fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Open the store backed by `path`, loading any existing contents.
    /// A corrupt or unreadable file degrades to an empty store rather than
    /// taking the context down.
    pub fn open(path: PathBuf) -> Self {
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(values) => values,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to parse settings file, continuing with defaults");
                    Map::new()
                }
            },
            // First run: the file appears with the first write
            Err(_) => Map::new(),
        };
        Self {
            path: Some(path),
            values,
        }
    }

    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// In-memory store with no file backing.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            values: Map::new(),
        }
    }

    /// Full settings as of now, with defaults for every missing key.
    pub fn read_settings(&self) -> Settings {
        Settings::from_values(&self.values)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Apply a partial key set. Keys whose stored value already equals the
    /// incoming one are dropped from the result and announced to nobody.
    /// Changes are returned only after the new state is durably written, so
    /// observers are never notified ahead of the writer's acknowledgement;
    /// a failed write leaves the store untouched.
    pub fn write(&mut self, patch: Map<String, Value>) -> Result<Vec<StorageChange>> {
        let mut changes = Vec::new();
        let mut next = self.values.clone();

        for (key, new) in patch {
            let old = next.get(&key).cloned();
            if old.as_ref() == Some(&new) {
                continue;
            }
            changes.push(StorageChange {
                key: key.clone(),
                old,
                new: new.clone(),
            });
            next.insert(key, new);
        }

        if changes.is_empty() {
            return Ok(changes);
        }

        self.persist(&next)?;
        self.values = next;
        Ok(changes)
    }

    /// First-install defaults: adds only keys that do not exist yet, never
    /// touching present values, so user edits survive reload and update.
    pub fn establish_defaults(&mut self, defaults: &Settings) -> Result<Vec<StorageChange>> {
        let mut patch = Map::new();
        for (key, value) in defaults.to_values() {
            if !self.values.contains_key(&key) {
                patch.insert(key, value);
            }
        }

        if patch.is_empty() {
            return Ok(Vec::new());
        }

        info!(added = patch.len(), "Establishing default settings");
        self.write(patch)
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(values)
            .context("Failed to serialize settings to JSON")?;
        fs::write(path, contents)
            .context(format!("Failed to write settings file to {}", path.display()))?;
        Ok(())
    }
}
