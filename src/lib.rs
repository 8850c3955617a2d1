//! # klte_settingsd
//!
//! Device settings for sysfs-backed hardware features, and the boot-time
//! restore that puts them back after a reboot.
//!
//! ## Features
//!
//! - **Toggles**: double-tap-to-wake (knock-on), camera, music and torch
//!   gestures, fast charge
//! - **Vibrator tuning**: percent slider mapped onto the driver's native
//!   strength range
//! - **Boot restore**: re-applies every stored preference in a fixed order
//! - **Watch mode**: re-applies when the preference or config file changes
//! - **Graceful degradation**: a missing attribute disables its feature
//!   instead of failing the rest
//!
//! ## Architecture
//!
//! - [`AttributeIo`](sysfs::AttributeIo) - best-effort sysfs access
//! - [`Preferences`](preferences::Preferences) - persistent key-value store
//! - [`ToggleController`](controllers::ToggleController) and
//!   [`VibratorTuning`](controllers::VibratorTuning) - per-feature controllers
//! - [`BootRestorer`](boot::BootRestorer) - ordered restore fan-out
//!
//! ## Example
//!
//! ```no_run
//! use klte_settingsd::{application::Application, cli::Command, config::ConfigManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config_manager = ConfigManager::load(None).await?;
//!     Application::builder()
//!         .with_config_manager(config_manager)
//!         .build()?
//!         .run(Command::Restore)
//!         .await
//! }
//! ```

pub mod app_context;
pub mod application;
pub mod boot;
pub mod cli;
pub mod config;
pub mod controllers;
pub mod feature;
pub mod preferences;
pub mod sysfs;
pub mod watcher;
