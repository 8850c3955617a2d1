//! On/off features: knock-on, camera, music, torch and fast charge.

use std::{fmt, path::Path, sync::Arc};

use log::{debug, warn};

use crate::{
    config::{Config, ToggleCfg},
    controllers::{Restorable, RestoreOutcome},
    feature::Feature,
    preferences::Preferences,
    sysfs::{self, AttributeIo},
};

/// Checkbox-style controller writing one of two tokens to an attribute.
pub struct ToggleController {
    feature: Feature,
    cfg: ToggleCfg,
    io: Arc<dyn AttributeIo>,
    checked: bool,
    enabled: bool,
}

impl fmt::Debug for ToggleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToggleController")
            .field("feature", &self.feature)
            .field("sysfs", &self.cfg.sysfs)
            .field("checked", &self.checked)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl ToggleController {
    pub fn new(feature: Feature, cfg: ToggleCfg, io: Arc<dyn AttributeIo>) -> Self {
        Self {
            feature,
            checked: cfg.default,
            cfg,
            io,
            enabled: true,
        }
    }

    /// Builds the controller for a toggle feature, unsupported if the
    /// configuration has no section for it.
    pub fn from_config(config: &Config, feature: Feature, io: Arc<dyn AttributeIo>) -> Self {
        let cfg = config.toggle(feature).cloned().unwrap_or_default();
        Self::new(feature, cfg, io)
    }

    pub fn key(&self) -> &str {
        self.cfg.key.as_deref().unwrap_or(self.feature.default_key())
    }

    pub fn sysfs_path(&self) -> Option<&Path> {
        self.cfg.sysfs.as_deref()
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// Whether the control accepts user input.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Token written for the given state.
    pub fn value_for_state(&self, state: bool) -> &str {
        if state {
            &self.cfg.enabled
        } else {
            &self.cfg.disabled
        }
    }

    /// Loads the checked state from the store.
    pub fn bind(&mut self, prefs: &Preferences) {
        self.checked = prefs.get_bool(self.key(), self.cfg.default);
    }

    /// Applies a new state chosen by the user.
    pub fn on_toggle(&mut self, new_state: bool, prefs: &mut Preferences) {
        self.checked = new_state;
        prefs.put_bool(self.key(), new_state);

        match self.cfg.sysfs.as_deref() {
            Some(path) => self.io.write_value(path, self.value_for_state(new_state)),
            None => debug!("{} has no attribute configured", self.feature),
        }
    }

    /// Flips the current state, as a checkbox click does.
    pub fn on_click(&mut self, prefs: &mut Preferences) {
        self.on_toggle(!self.checked, prefs);
    }

    /// Disables the control when the attribute is missing.
    pub fn check_support(&mut self) -> bool {
        let supported = self.is_supported();
        if !supported {
            warn!(
                "{} unsupported, attribute missing: {}",
                self.feature,
                display_path(self.sysfs_path())
            );
            self.enabled = false;
        }
        supported
    }
}

impl Restorable for ToggleController {
    fn feature(&self) -> Feature {
        self.feature
    }

    fn is_supported(&self) -> bool {
        sysfs::is_present(self.io.as_ref(), self.sysfs_path())
    }

    fn restore(&self, prefs: &Preferences) -> RestoreOutcome {
        let Some(path) = self.sysfs_path().filter(|_| self.is_supported()) else {
            return RestoreOutcome::Unsupported;
        };

        let value = self.value_for_state(prefs.get_bool(self.key(), self.cfg.default));
        debug!("Restoring {}: {}", self.feature, value);
        self.io.write_value(path, value);
        RestoreOutcome::Applied(value.to_string())
    }
}

pub(crate) fn display_path(path: Option<&Path>) -> String {
    path.map(Path::display)
        .map(|p| p.to_string())
        .unwrap_or_else(|| "<not configured>".to_string())
}
