//! Vibrator intensity tuning.
//!
//! The user picks a percent (0-100); the driver wants a native strength in
//! a device-specific `[min, max]` range. The two conversions round
//! differently on purpose:
//!
//! - percent -> strength uses integer arithmetic, so the division truncates
//!   toward zero before `min` is added;
//! - strength -> percent is computed in floating point and truncated at the
//!   end.
//!
//! A round trip therefore may lose up to `100 / (max - min)` percent.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use log::{debug, info, warn};

use crate::{
    config::{Config, VibratorCfg},
    controllers::{Restorable, RestoreOutcome, toggle::display_path},
    feature::Feature,
    preferences::Preferences,
    sysfs::{self, AttributeIo},
};

/// Native strength bounds reported by the vibrator driver.
///
/// Always holds `min < max` and `min <= default <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntensityRange {
    min: i32,
    max: i32,
    default: i32,
}

impl IntensityRange {
    pub fn new(min: i32, max: i32, default: i32) -> Result<Self> {
        if min >= max {
            anyhow::bail!("Vibrator range is empty: min {min} must be below max {max}");
        }
        if !(min..=max).contains(&default) {
            anyhow::bail!("Vibrator default {default} is outside [{min}, {max}]");
        }
        Ok(Self { min, max, default })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn default_strength(&self) -> i32 {
        self.default
    }

    /// Converts a user percent into a native strength within `[min, max]`.
    ///
    /// ```
    /// use klte_settingsd::controllers::IntensityRange;
    ///
    /// let range = IntensityRange::new(10, 50, 30)?;
    /// assert_eq!(range.percent_to_strength(0), 10);
    /// assert_eq!(range.percent_to_strength(100), 50);
    /// assert_eq!(range.percent_to_strength(250), 50);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn percent_to_strength(&self, percent: i32) -> i32 {
        let span = i64::from(self.max) - i64::from(self.min);
        let strength = span * i64::from(percent) / 100 + i64::from(self.min);

        strength.clamp(i64::from(self.min), i64::from(self.max)) as i32
    }

    /// Converts a native strength back into a percent within `[0, 100]`.
    pub fn strength_to_percent(&self, strength: i32) -> i32 {
        let max = f64::from(self.max);
        let min = f64::from(self.min);

        let percent = (f64::from(strength) - min) * (100.0 / (max - min));

        percent.clamp(0.0, 100.0) as i32
    }

    /// Percent shown for the driver's default strength.
    pub fn default_percent(&self) -> i32 {
        self.strength_to_percent(self.default)
    }
}

impl TryFrom<&VibratorCfg> for IntensityRange {
    type Error = anyhow::Error;

    fn try_from(cfg: &VibratorCfg) -> Result<Self> {
        Self::new(cfg.min, cfg.max, cfg.default)
    }
}

impl Default for IntensityRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: 100,
            default: 50,
        }
    }
}

/// Controller for the vibrator strength attribute.
pub struct VibratorTuning {
    sysfs: Option<PathBuf>,
    key: String,
    range: IntensityRange,
    io: Arc<dyn AttributeIo>,
    enabled: bool,
}

impl fmt::Debug for VibratorTuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VibratorTuning")
            .field("sysfs", &self.sysfs)
            .field("key", &self.key)
            .field("range", &self.range)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl VibratorTuning {
    /// Builds the controller. An invalid range leaves it without an
    /// attribute, so it reports itself unsupported.
    pub fn new(cfg: &VibratorCfg, io: Arc<dyn AttributeIo>) -> Self {
        let (sysfs, range) = match IntensityRange::try_from(cfg) {
            Ok(range) => (cfg.sysfs.clone(), range),
            Err(e) => {
                warn!("{e:#}; {} disabled", Feature::Vibrator);
                (None, IntensityRange::default())
            }
        };

        Self {
            sysfs,
            key: cfg
                .key
                .clone()
                .unwrap_or_else(|| Feature::Vibrator.default_key().to_string()),
            range,
            io,
            enabled: true,
        }
    }

    /// Builds the controller, unsupported if the configuration has no
    /// vibrator section.
    pub fn from_config(config: &Config, io: Arc<dyn AttributeIo>) -> Self {
        match &config.vibrator {
            Some(cfg) => Self::new(cfg, io),
            None => Self {
                sysfs: None,
                key: Feature::Vibrator.default_key().to_string(),
                range: IntensityRange::default(),
                io,
                enabled: true,
            },
        }
    }

    pub fn range(&self) -> IntensityRange {
        self.range
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn sysfs_path(&self) -> Option<&Path> {
        self.sysfs.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stored percent, or the default strength's percent if none is stored.
    pub fn stored_percent(&self, prefs: &Preferences) -> i32 {
        prefs.get_int(&self.key, self.range.default_percent())
    }

    /// Text shown under the preference title.
    pub fn summary(&self, prefs: &Preferences) -> String {
        format!("{}%", self.stored_percent(prefs))
    }

    /// Disables the control when the attribute is missing.
    pub fn check_support(&mut self) -> bool {
        let supported = self.is_supported();
        if !supported {
            warn!(
                "{} unsupported, attribute missing: {}",
                Feature::Vibrator,
                display_path(self.sysfs_path())
            );
            self.enabled = false;
        }
        supported
    }

    /// Opens the edit dialog.
    ///
    /// The attribute's current value is captured first so a cancelled
    /// dialog can put it back; then the slider is moved to the stored
    /// percent.
    pub fn open(&self, prefs: &Preferences) -> TuningDialog<'_> {
        let original = self.sysfs_path().and_then(|path| self.io.read_line(path));
        let mut dialog = TuningDialog {
            tuning: self,
            original,
            progress: 0,
            label: String::new(),
        };
        dialog.on_progress_changed(self.stored_percent(prefs));
        dialog
    }

    fn write_strength(&self, strength: i32) {
        match self.sysfs_path() {
            Some(path) => self.io.write_value(path, &strength.to_string()),
            None => debug!("{} has no attribute configured", Feature::Vibrator),
        }
    }
}

impl Restorable for VibratorTuning {
    fn feature(&self) -> Feature {
        Feature::Vibrator
    }

    fn is_supported(&self) -> bool {
        sysfs::is_present(self.io.as_ref(), self.sysfs_path())
    }

    fn restore(&self, prefs: &Preferences) -> RestoreOutcome {
        let Some(path) = self.sysfs_path().filter(|_| self.is_supported()) else {
            return RestoreOutcome::Unsupported;
        };

        let strength = self.range.percent_to_strength(self.stored_percent(prefs));
        info!("Restoring vibration setting: {strength}");
        let value = strength.to_string();
        self.io.write_value(path, &value);
        RestoreOutcome::Applied(value)
    }
}

/// An open vibrator-tuning dialog.
///
/// Every slider movement is written to hardware immediately so the user
/// can feel the new strength; nothing is persisted until the dialog is
/// closed positively.
#[derive(Debug)]
pub struct TuningDialog<'a> {
    tuning: &'a VibratorTuning,
    original: Option<String>,
    progress: i32,
    label: String,
}

impl TuningDialog<'_> {
    pub fn progress(&self) -> i32 {
        self.progress
    }

    /// Percent label shown next to the slider.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Attribute value captured when the dialog opened.
    pub fn original_value(&self) -> Option<&str> {
        self.original.as_deref()
    }

    /// Slider callback.
    pub fn on_progress_changed(&mut self, percent: i32) {
        self.progress = percent.clamp(0, 100);
        self.tuning
            .write_strength(self.tuning.range.percent_to_strength(self.progress));
        self.label = format!("{}%", self.progress);
    }

    /// "Defaults" button: moves the slider back to the default strength
    /// and keeps the dialog open.
    pub fn reset_to_default(&mut self) {
        self.on_progress_changed(self.tuning.range.default_percent());
    }

    /// Closes the dialog and returns the new summary.
    ///
    /// A positive close stores the slider position; any other close puts
    /// back the attribute value captured when the dialog opened.
    pub fn close(self, positive: bool, prefs: &mut Preferences) -> String {
        if positive {
            prefs.put_int(&self.tuning.key, self.progress);
        } else {
            match (self.tuning.sysfs_path(), self.original.as_deref()) {
                (Some(path), Some(original)) => self.tuning.io.write_value(path, original),
                _ => warn!(
                    "No original {} value captured, leaving attribute as is",
                    Feature::Vibrator
                ),
            }
        }
        self.tuning.summary(prefs)
    }
}
