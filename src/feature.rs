//! Hardware features managed by the daemon.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A tunable hardware feature backed by one sysfs attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    /// Vibrator intensity, stored as a percent.
    Vibrator,
    /// Double-tap-to-wake gesture.
    KnockOn,
    Camera,
    Music,
    Torch,
    FastCharge,
}

impl Feature {
    /// Order in which features are restored after boot.
    pub const BOOT_ORDER: [Feature; 6] = [
        Feature::Vibrator,
        Feature::KnockOn,
        Feature::Camera,
        Feature::Music,
        Feature::Torch,
        Feature::FastCharge,
    ];

    /// Preference key used when the configuration does not override it.
    pub const fn default_key(self) -> &'static str {
        match self {
            Feature::Vibrator => "percent",
            Feature::KnockOn => "doubletap_gesture",
            Feature::Camera => "camera_gesture",
            Feature::Music => "music_gesture",
            Feature::Torch => "torch_gesture",
            Feature::FastCharge => "fast_charge",
        }
    }

    /// Whether the feature is an on/off switch rather than a ranged value.
    pub const fn is_toggle(self) -> bool {
        !matches!(self, Feature::Vibrator)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Feature::Vibrator => "vibrator",
            Feature::KnockOn => "knock-on",
            Feature::Camera => "camera",
            Feature::Music => "music",
            Feature::Torch => "torch",
            Feature::FastCharge => "fast-charge",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
