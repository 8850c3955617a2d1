//! Persistent key-value preference store.
//!
//! Holds the user's last chosen value for every feature. The store is the
//! single source of truth across reboots: controllers write hardware from
//! it at boot and update it when the user changes a control.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// A single stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i32),
}

impl PrefValue {
    /// Converts one YAML scalar. Anything that is not a boolean or an
    /// integer fitting `i32` yields `None`.
    fn from_yaml(value: &serde_yaml::Value) -> Option<Self> {
        match value {
            serde_yaml::Value::Bool(b) => Some(PrefValue::Bool(*b)),
            serde_yaml::Value::Number(n) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(PrefValue::Int),
            _ => None,
        }
    }
}

/// Preference store backed by a YAML file.
///
/// # Example
///
/// ```no_run
/// use klte_settingsd::preferences::Preferences;
/// use std::path::Path;
///
/// let mut prefs = Preferences::load(Path::new("/data/klte_settingsd/preferences.yml"))?;
/// prefs.put_int("percent", 80);
/// prefs.commit()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Preferences {
    path: Option<PathBuf>,
    values: BTreeMap<String, PrefValue>,
}

impl Preferences {
    /// Creates an empty store with no backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the store from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let values = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)
                    .with_context(|| {
                        format!("Failed to parse preferences in: {}", path.display())
                    })?;
                raw.into_iter()
                    .filter_map(|(key, value)| match PrefValue::from_yaml(&value) {
                        Some(value) => Some((key, value)),
                        None => {
                            warn!("Ignoring preference '{key}': unsupported value {value:?}");
                            None
                        }
                    })
                    .collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read preferences file: {}", path.display())
                });
            }
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    /// Loads the store, degrading to an empty one on any error.
    ///
    /// Used on the restore path, where a broken file must not keep the
    /// remaining features from being applied with their defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("{e:#}; falling back to default preferences");
            Self {
                path: Some(path.to_path_buf()),
                values: BTreeMap::new(),
            }
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(PrefValue::Bool(value)) => *value,
            Some(other) => {
                warn!("Preference '{key}' holds {other:?}, expected a boolean");
                default
            }
            None => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        match self.values.get(key) {
            Some(PrefValue::Int(value)) => *value,
            Some(other) => {
                warn!("Preference '{key}' holds {other:?}, expected an integer");
                default
            }
            None => default,
        }
    }

    pub fn put_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), PrefValue::Bool(value));
    }

    pub fn put_int(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_string(), PrefValue::Int(value));
    }

    /// Writes the store to its backing file atomically.
    ///
    /// A store without a backing file only lives in memory, so this is a
    /// no-op for it.
    pub fn commit(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let yaml =
            serde_yaml::to_string(&self.values).context("Failed to serialize preferences")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create preferences directory {}", parent.display())
            })?;
        }

        let tmp_path = path.with_extension("yml.tmp");
        fs::write(&tmp_path, yaml).with_context(|| {
            format!("Failed to write temporary preferences to {}", tmp_path.display())
        })?;

        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move preferences to {}", path.display()))?;

        info!("Preferences saved to: {}", path.display());
        Ok(())
    }
}
