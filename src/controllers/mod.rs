//! Per-feature preference controllers.
//!
//! Each controller owns an immutable slice of the device configuration and
//! turns user interaction or a stored preference into a sysfs write.

pub mod toggle;
pub mod vibrator;

use std::{fmt, sync::Arc};

use serde::Serialize;

use crate::{config::Config, feature::Feature, preferences::Preferences, sysfs::AttributeIo};

pub use toggle::ToggleController;
pub use vibrator::{IntensityRange, TuningDialog, VibratorTuning};

/// Result of restoring one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "kebab-case")]
pub enum RestoreOutcome {
    /// The value was handed to the attribute.
    Applied(String),
    /// The attribute does not exist on this device; nothing was written.
    Unsupported,
}

/// A feature whose stored preference can be re-applied to hardware.
///
/// # Example
///
/// ```
/// use klte_settingsd::controllers::{Restorable, RestoreOutcome};
/// use klte_settingsd::feature::Feature;
/// use klte_settingsd::preferences::Preferences;
///
/// #[derive(Debug)]
/// struct Missing;
///
/// impl Restorable for Missing {
///     fn feature(&self) -> Feature { Feature::Torch }
///     fn is_supported(&self) -> bool { false }
///     fn restore(&self, _prefs: &Preferences) -> RestoreOutcome { RestoreOutcome::Unsupported }
/// }
/// ```
pub trait Restorable: fmt::Debug {
    fn feature(&self) -> Feature;

    /// Whether the backing attribute exists right now.
    fn is_supported(&self) -> bool;

    /// Writes the stored preference to hardware; a no-op when unsupported.
    fn restore(&self, prefs: &Preferences) -> RestoreOutcome;
}

/// Builds the controller for `feature` from the configuration.
///
/// Unconfigured features still get a controller: it simply has no
/// attribute path and reports itself unsupported.
pub fn build(config: &Config, feature: Feature, io: Arc<dyn AttributeIo>) -> Box<dyn Restorable> {
    match feature {
        Feature::Vibrator => Box::new(VibratorTuning::from_config(config, io)),
        toggle => Box::new(ToggleController::from_config(config, toggle, io)),
    }
}
