//! Application entry point and builder pattern implementation.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use log::info;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    app_context::AppState,
    cli::Command,
    config::ConfigManager,
    controllers::{Restorable, RestoreOutcome, ToggleController, VibratorTuning},
    feature::Feature,
    preferences::Preferences,
    sysfs::{AttributeIo, Sysfs},
    watcher,
};

/// Main application structure that dispatches CLI commands.
///
/// # Example
///
/// ```no_run
/// use klte_settingsd::application::Application;
/// use klte_settingsd::cli::Command;
/// use klte_settingsd::config::ConfigManager;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config_manager = ConfigManager::load(None).await?;
/// let app = Application::builder()
///     .with_config_manager(config_manager)
///     .build()?;
///
/// app.run(Command::Restore).await?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    state: Arc<AppState>,
}

/// One row of `status` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureStatus {
    pub feature: Feature,
    pub supported: bool,
    pub sysfs: Option<PathBuf>,
    /// Stored preference as shown to the user.
    pub stored: String,
    /// First line of the attribute, if readable.
    pub current: Option<String>,
}

impl Application {
    /// Creates a new ApplicationBuilder for constructing Application instances.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Runs one command to completion.
    ///
    /// `watch` runs until Ctrl-C or SIGTERM.
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Restore => {
                let report = self.state.restore_all().await;
                for entry in &report.entries {
                    match &entry.outcome {
                        RestoreOutcome::Applied(value) => println!("{:<12} {}", entry.feature, value),
                        RestoreOutcome::Unsupported => println!("{:<12} unsupported", entry.feature),
                    }
                }
                Ok(())
            }
            Command::Status { json } => {
                let rows = self.status().await;
                if json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else {
                    for row in rows {
                        println!(
                            "{:<12} {:<12} stored={:<6} current={}",
                            row.feature,
                            if row.supported { "supported" } else { "unsupported" },
                            row.stored,
                            row.current.as_deref().unwrap_or("-")
                        );
                    }
                }
                Ok(())
            }
            Command::Toggle { feature, state } => {
                let checked = self.toggle(feature, state.into()).await?;
                println!("{feature}: {}", if checked { "on" } else { "off" });
                Ok(())
            }
            Command::Intensity { percent, reset } => {
                let summary = self.intensity(percent, reset).await?;
                println!("{}: {summary}", Feature::Vibrator);
                Ok(())
            }
            Command::Watch { .. } => self.watch().await,
        }
    }

    /// Collects per-feature support and values.
    pub async fn status(&self) -> Vec<FeatureStatus> {
        let config = self.state.config().await;
        let prefs = Preferences::load_or_default(&config.preferences);
        let io = self.state.io.clone();

        Feature::BOOT_ORDER
            .into_iter()
            .map(|feature| {
                let (sysfs, stored, supported) = match feature {
                    Feature::Vibrator => {
                        let tuning = VibratorTuning::from_config(&config, io.clone());
                        (
                            tuning.sysfs_path().map(PathBuf::from),
                            tuning.summary(&prefs),
                            tuning.is_supported(),
                        )
                    }
                    toggle => {
                        let mut controller = ToggleController::from_config(&config, toggle, io.clone());
                        controller.bind(&prefs);
                        let stored = if controller.is_checked() { "on" } else { "off" };
                        (
                            controller.sysfs_path().map(PathBuf::from),
                            stored.to_string(),
                            controller.is_supported(),
                        )
                    }
                };
                let current = sysfs
                    .as_deref()
                    .filter(|_| supported)
                    .and_then(|path| io.read_line(path));

                FeatureStatus {
                    feature,
                    supported,
                    sysfs,
                    stored,
                    current,
                }
            })
            .collect()
    }

    /// Sets an on/off feature and commits the preference.
    pub async fn toggle(&self, feature: Feature, new_state: bool) -> Result<bool> {
        if !feature.is_toggle() {
            bail!("'{feature}' is not an on/off feature; use the intensity command");
        }

        let config = self.state.config().await;
        let mut prefs = Preferences::load(&config.preferences)?;
        let mut controller = ToggleController::from_config(&config, feature, self.state.io.clone());
        controller.bind(&prefs);

        if !controller.check_support() {
            bail!("'{feature}' is not supported on this device");
        }

        controller.on_toggle(new_state, &mut prefs);
        prefs
            .commit()
            .with_context(|| format!("Failed to store '{feature}' state"))?;

        info!("{feature} switched {}", if new_state { "on" } else { "off" });
        Ok(controller.is_checked())
    }

    /// Shows, sets or resets the vibrator intensity; returns the summary.
    pub async fn intensity(&self, percent: Option<i32>, reset: bool) -> Result<String> {
        let config = self.state.config().await;
        let mut prefs = Preferences::load(&config.preferences)?;
        let mut tuning = VibratorTuning::from_config(&config, self.state.io.clone());

        if percent.is_none() && !reset {
            return Ok(tuning.summary(&prefs));
        }

        if !tuning.check_support() {
            bail!("'{}' is not supported on this device", Feature::Vibrator);
        }

        let mut dialog = tuning.open(&prefs);
        match percent {
            Some(percent) => dialog.on_progress_changed(percent),
            None => dialog.reset_to_default(),
        }
        let summary = dialog.close(true, &mut prefs);

        prefs.commit().context("Failed to store vibrator intensity")?;
        info!("{} intensity set to {summary}", Feature::Vibrator);
        Ok(summary)
    }

    async fn watch(&self) -> Result<()> {
        let cancel_token = CancellationToken::new();
        let signal_token = cancel_token.clone();

        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("Shutdown signal received");
            signal_token.cancel();
        });

        watcher::run(self.state.clone(), cancel_token).await
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

/// Builder pattern for creating Application instances.
pub struct ApplicationBuilder {
    config_manager: Option<ConfigManager>,
    io: Option<Arc<dyn AttributeIo>>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            config_manager: None,
            io: None,
        }
    }

    /// Sets the configuration manager for the application.
    pub fn with_config_manager(mut self, config_manager: ConfigManager) -> Self {
        self.config_manager = Some(config_manager);
        self
    }

    /// Replaces the sysfs accessor; defaults to [`Sysfs`].
    pub fn with_io(mut self, io: Arc<dyn AttributeIo>) -> Self {
        self.io = Some(io);
        self
    }

    /// Builds the Application instance with the provided configuration.
    pub fn build(self) -> Result<Application> {
        let config_manager = self
            .config_manager
            .ok_or_else(|| anyhow::anyhow!("Configuration manager is required"))?;
        let io = self.io.unwrap_or_else(|| Arc::new(Sysfs));

        Ok(Application {
            state: Arc::new(AppState::new(config_manager, io)),
        })
    }
}
