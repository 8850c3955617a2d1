//! Application state shared by the command handlers and the watcher.

use std::{path::PathBuf, sync::Arc};

use crate::{
    boot::{BootRestorer, RestoreReport},
    config::{Config, ConfigManager},
    preferences::Preferences,
    sysfs::AttributeIo,
};

/// Configuration plus the attribute accessor every controller is built on.
pub struct AppState {
    /// Configuration manager for centralized config handling
    pub config_manager: Arc<ConfigManager>,
    /// Attribute accessor handed to every controller
    pub io: Arc<dyn AttributeIo>,
}

impl AppState {
    pub fn new(config_manager: ConfigManager, io: Arc<dyn AttributeIo>) -> Self {
        Self {
            config_manager: Arc::new(config_manager),
            io,
        }
    }

    /// Snapshot of the current configuration.
    pub async fn config(&self) -> Config {
        self.config_manager.clone_config().await
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config_manager
    }

    pub async fn preferences_path(&self) -> PathBuf {
        self.config_manager.get().await.preferences.clone()
    }

    /// Runs a full restore pass with freshly built controllers.
    ///
    /// Controllers are rebuilt from the configuration right before the pass
    /// and a broken preference file degrades to defaults, so nothing here
    /// can fail.
    pub async fn restore_all(&self) -> RestoreReport {
        let config = self.config().await;
        let prefs = Preferences::load_or_default(&config.preferences);

        BootRestorer::from_config(&config, self.io.clone()).run(&prefs)
    }
}
