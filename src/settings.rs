use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::PathBuf,
    sync::RwLock,
};

use crate::profile::ProfileStore;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    string_sets: BTreeMap<String, BTreeSet<String>>,
}

/// JSON-file backed key/value settings. Every write rewrites the whole file.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Ignoring unreadable settings file {}: {}",
                    path.display(),
                    err
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

impl ProfileStore for SettingsStore {
    fn read_set(&self, key: &str) -> Result<BTreeSet<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        Ok(guard.string_sets.get(key).cloned().unwrap_or_default())
    }

    fn write_set(&self, key: &str, values: &BTreeSet<String>) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;

        let mut updated = guard.clone();
        updated.string_sets.insert(key.to_string(), values.clone());
        self.persist(&updated)?;
        *guard = updated;
        Ok(())
    }
}
