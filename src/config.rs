//! Configuration management for klte_settingsd.
//!
//! Handles loading, parsing, and validation of the YAML file that describes
//! the device: which sysfs attribute backs each feature, the tokens a toggle
//! writes, the native vibrator strength range, and where the user's
//! preferences live.

use crate::{controllers::IntensityRange, feature::Feature};
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::RwLock;

/// Main configuration structure.
///
/// A feature whose section is missing, or whose section has no `sysfs`
/// path, is treated as unsupported on this device.
///
/// # Example
///
/// ```yaml
/// version: 1
/// preferences: /data/klte_settingsd/preferences.yml
///
/// vibrator:
///   sysfs: /sys/class/timed_output/vibrator/pwm_value
///   min: 0
///   max: 100
///   default: 50
///
/// knock_on:
///   sysfs: /sys/devices/virtual/input/input1/wake_gesture
///   enabled: "1"
///   disabled: "0"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    /// Location of the preference store.
    #[serde(default = "defaults::preferences")]
    pub preferences: PathBuf,

    /// Vibrator intensity tuning.
    #[serde(default)]
    pub vibrator: Option<VibratorCfg>,

    /// Double-tap-to-wake gesture.
    #[serde(default)]
    pub knock_on: Option<ToggleCfg>,

    #[serde(default)]
    pub camera: Option<ToggleCfg>,

    #[serde(default)]
    pub music: Option<ToggleCfg>,

    #[serde(default)]
    pub torch: Option<ToggleCfg>,

    #[serde(default)]
    pub fast_charge: Option<ToggleCfg>,
}

/// Vibrator strength attribute and its native range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VibratorCfg {
    /// Attribute holding the native strength.
    #[serde(default)]
    pub sysfs: Option<PathBuf>,

    /// Lowest native strength the driver accepts.
    pub min: i32,

    /// Highest native strength the driver accepts.
    pub max: i32,

    /// Strength used when the user never picked one.
    pub default: i32,

    /// Preference key override.
    #[serde(default)]
    pub key: Option<String>,
}

/// On/off attribute written with one of two tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleCfg {
    #[serde(default)]
    pub sysfs: Option<PathBuf>,

    /// Token written when the feature is switched on.
    #[serde(default = "defaults::enabled")]
    pub enabled: String,

    /// Token written when the feature is switched off.
    #[serde(default = "defaults::disabled")]
    pub disabled: String,

    /// State assumed when no preference has been stored yet.
    #[serde(default)]
    pub default: bool,

    /// Preference key override.
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for ToggleCfg {
    fn default() -> Self {
        Self {
            sysfs: None,
            enabled: defaults::enabled(),
            disabled: defaults::disabled(),
            default: false,
            key: None,
        }
    }
}

impl From<PathBuf> for ToggleCfg {
    fn from(sysfs: PathBuf) -> Self {
        Self {
            sysfs: Some(sysfs),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            preferences: defaults::preferences(),
            vibrator: None,
            knock_on: None,
            camera: None,
            music: None,
            torch: None,
            fast_charge: None,
        }
    }
}

impl Config {
    /// Validates the configuration for consistency.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use klte_settingsd::config::Config;
    ///
    /// let config = Config::default();
    /// config.validate()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn validate(&self) -> Result<()> {
        if let Some(vibrator) = &self.vibrator {
            IntensityRange::try_from(vibrator)?;
        }

        for feature in Feature::BOOT_ORDER.into_iter().filter(|f| f.is_toggle()) {
            let Some(toggle) = self.toggle(feature) else {
                continue;
            };
            if toggle.enabled.is_empty() || toggle.disabled.is_empty() {
                anyhow::bail!("Toggle '{feature}' has an empty enabled or disabled token");
            }
            if toggle.enabled == toggle.disabled {
                anyhow::bail!(
                    "Toggle '{}' uses the same token '{}' for both states",
                    feature,
                    toggle.enabled
                );
            }
        }

        Ok(())
    }

    /// Returns the toggle section for a feature, `None` for the vibrator
    /// or an unconfigured toggle.
    pub fn toggle(&self, feature: Feature) -> Option<&ToggleCfg> {
        match feature {
            Feature::Vibrator => None,
            Feature::KnockOn => self.knock_on.as_ref(),
            Feature::Camera => self.camera.as_ref(),
            Feature::Music => self.music.as_ref(),
            Feature::Torch => self.torch.as_ref(),
            Feature::FastCharge => self.fast_charge.as_ref(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    /// Default preference store location.
    pub fn preferences() -> PathBuf {
        PathBuf::from("/data/klte_settingsd/preferences.yml")
    }

    pub fn enabled() -> String {
        "1".to_string()
    }

    pub fn disabled() -> String {
        "0".to_string()
    }
}

fn locate_config() -> Result<PathBuf> {
    // 2) ENV
    if let Ok(env_path) = env::var("KLTE_SETTINGSD_CONFIG") {
        return Ok(PathBuf::from(env_path));
    }

    // 3) XDG_CONFIG_HOME or $HOME/.config
    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("klte_settingsd/config.yml");
        if cfg_dir.exists() {
            return Ok(cfg_dir);
        }
    }

    // 4) /etc
    let etc = Path::new("/etc/klte_settingsd/config.yml");
    if etc.exists() {
        return Ok(etc.to_path_buf());
    }

    anyhow::bail!("Configuration file not found in any standard location")
}

/// Configuration manager that handles both config data and file operations.
///
/// The configuration itself is immutable between reloads; controllers get a
/// snapshot through [`ConfigManager::clone_config`] when they are built.
///
/// # Example
///
/// ```no_run
/// use klte_settingsd::config::ConfigManager;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config_manager = ConfigManager::load(None).await?;
/// let preferences = config_manager.get().await.preferences.clone();
/// config_manager.reload().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the given config and path.
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            path,
        }
    }

    /// Loads configuration from file or standard locations.
    ///
    /// Searches for configuration in the following order:
    /// 1. Provided path parameter
    /// 2. KLTE_SETTINGSD_CONFIG environment variable
    /// 3. XDG_CONFIG_HOME/klte_settingsd/config.yml or ~/.config/klte_settingsd/config.yml
    /// 4. /etc/klte_settingsd/config.yml
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => locate_config().context("No configuration file found")?,
        };

        info!("Loading config from: {}", config_path.display());
        let config = Self::load_config_from_path(&config_path).await?;

        Ok(Self::new(config, config_path))
    }

    /// Gets a read-only reference to the current configuration.
    pub async fn get(&self) -> tokio::sync::RwLockReadGuard<'_, Config> {
        self.config.read().await
    }

    /// Returns the path to the configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reloads configuration from the same file.
    ///
    /// On failure the previous configuration stays in effect.
    pub async fn reload(&self) -> Result<()> {
        info!("Reloading config from: {}", self.path.display());
        let new_config = Self::load_config_from_path(&self.path).await?;

        *self.config.write().await = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Clones the current configuration.
    pub async fn clone_config(&self) -> Config {
        self.config.read().await.clone()
    }

    async fn load_config_from_path(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        if config.version != 1 {
            anyhow::bail!(
                "Unsupported config version {} in file: {}",
                config.version,
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn vibrator(min: i32, max: i32, default: i32) -> VibratorCfg {
        VibratorCfg {
            sysfs: Some(PathBuf::from("/sys/class/timed_output/vibrator/pwm_value")),
            min,
            max,
            default,
            key: None,
        }
    }

    #[tokio::test]
    async fn config_load_valid_yaml() {
        let yaml_content = r#"
version: 1
preferences: /tmp/klte/preferences.yml
vibrator:
  sysfs: /sys/class/timed_output/vibrator/pwm_value
  min: 10
  max: 50
  default: 30
knock_on:
  sysfs: /sys/devices/virtual/input/input1/wake_gesture
  enabled: "on"
  disabled: "off"
torch:
  sysfs: /sys/devices/virtual/input/input1/torch_gesture
  key: torch
"#;
        let temp_file = create_temp_config(yaml_content);

        let config_manager = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap();
        let config = config_manager.clone_config().await;

        assert_eq!(config.preferences, PathBuf::from("/tmp/klte/preferences.yml"));
        let vib = config.vibrator.unwrap();
        assert_eq!((vib.min, vib.max, vib.default), (10, 50, 30));

        let knock_on = config.knock_on.unwrap();
        assert_eq!(knock_on.enabled, "on");
        assert_eq!(knock_on.disabled, "off");
        assert!(!knock_on.default);

        let torch = config.torch.unwrap();
        assert_eq!(torch.enabled, "1");
        assert_eq!(torch.disabled, "0");
        assert_eq!(torch.key.as_deref(), Some("torch"));

        assert!(config.camera.is_none());
        assert!(config.music.is_none());
        assert!(config.fast_charge.is_none());
    }

    #[tokio::test]
    async fn config_load_rejects_unknown_version() {
        let temp_file = create_temp_config("version: 2\n");

        let err = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported config version 2"));
    }

    #[tokio::test]
    async fn config_reload_keeps_previous_on_error() {
        let temp_file = create_temp_config("version: 1\npreferences: /tmp/a.yml\n");
        let config_manager = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap();

        fs::write(temp_file.path(), "version: 1\nvibrator: { min: 5, max: 5, default: 5 }\n")
            .unwrap();

        assert!(config_manager.reload().await.is_err());
        assert_eq!(
            config_manager.get().await.preferences,
            PathBuf::from("/tmp/a.yml")
        );
    }

    #[test]
    fn config_default_has_every_feature_unconfigured() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        for feature in Feature::BOOT_ORDER {
            assert!(config.toggle(feature).is_none());
        }
        assert!(config.vibrator.is_none());
    }

    #[test]
    fn config_validate_empty_vibrator_range() {
        let config = Config {
            vibrator: Some(vibrator(50, 50, 50)),
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("range is empty"));
    }

    #[test]
    fn config_validate_default_outside_range() {
        let config = Config {
            vibrator: Some(vibrator(10, 50, 60)),
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("outside"));
    }

    #[test]
    fn config_validate_identical_toggle_tokens() {
        let config = Config {
            music: Some(ToggleCfg {
                enabled: "1".to_string(),
                disabled: "1".to_string(),
                ..ToggleCfg::default()
            }),
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("music"));
    }

    #[test]
    fn config_toggle_lookup() {
        let config = Config {
            fast_charge: Some(ToggleCfg::default()),
            vibrator: Some(vibrator(0, 100, 50)),
            ..Config::default()
        };

        assert!(config.toggle(Feature::FastCharge).is_some());
        assert!(config.toggle(Feature::Camera).is_none());
        assert!(config.toggle(Feature::Vibrator).is_none());
    }

    #[test]
    #[serial]
    fn locate_config_prefers_environment_variable() {
        // SAFETY: serialized with the other environment tests.
        unsafe { env::set_var("KLTE_SETTINGSD_CONFIG", "/tmp/klte_from_env.yml") };
        let located = locate_config().unwrap();
        unsafe { env::remove_var("KLTE_SETTINGSD_CONFIG") };

        assert_eq!(located, PathBuf::from("/tmp/klte_from_env.yml"));
    }

    #[test]
    #[serial]
    fn locate_config_finds_xdg_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("klte_settingsd/config.yml");
        fs::create_dir_all(cfg.parent().unwrap()).unwrap();
        fs::write(&cfg, "version: 1\n").unwrap();

        // SAFETY: serialized with the other environment tests.
        unsafe {
            env::remove_var("KLTE_SETTINGSD_CONFIG");
            env::set_var("XDG_CONFIG_HOME", dir.path());
        }
        let located = locate_config().unwrap();
        unsafe { env::remove_var("XDG_CONFIG_HOME") };

        assert_eq!(located, cfg);
    }
}
