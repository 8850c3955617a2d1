//! Re-applies stored preferences to hardware after a reboot.

use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::{
    config::Config,
    controllers::{self, Restorable, RestoreOutcome},
    feature::Feature,
    preferences::Preferences,
    sysfs::AttributeIo,
};

/// Ordered fan-out to every feature's restore.
#[derive(Debug)]
pub struct BootRestorer {
    controllers: Vec<Box<dyn Restorable>>,
}

/// What happened to each feature during a restore pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub entries: Vec<RestoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreEntry {
    pub feature: Feature,
    pub outcome: RestoreOutcome,
}

impl RestoreReport {
    pub fn applied(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, RestoreOutcome::Applied(_)))
            .count()
    }

    pub fn outcome(&self, feature: Feature) -> Option<&RestoreOutcome> {
        self.entries
            .iter()
            .find(|e| e.feature == feature)
            .map(|e| &e.outcome)
    }
}

impl BootRestorer {
    /// Builds one controller per feature in [`Feature::BOOT_ORDER`].
    pub fn from_config(config: &Config, io: Arc<dyn AttributeIo>) -> Self {
        Self::with_controllers(
            Feature::BOOT_ORDER
                .into_iter()
                .map(|feature| controllers::build(config, feature, io.clone()))
                .collect(),
        )
    }

    pub fn with_controllers(controllers: Vec<Box<dyn Restorable>>) -> Self {
        Self { controllers }
    }

    pub fn features(&self) -> Vec<Feature> {
        self.controllers.iter().map(|c| c.feature()).collect()
    }

    /// Restores every feature exactly once, in order.
    ///
    /// An unsupported feature is recorded and skipped; it never stops the
    /// ones after it.
    pub fn run(&self, prefs: &Preferences) -> RestoreReport {
        let entries: Vec<_> = self
            .controllers
            .iter()
            .map(|controller| {
                let outcome = controller.restore(prefs);
                debug!("{}: {:?}", controller.feature(), outcome);
                RestoreEntry {
                    feature: controller.feature(),
                    outcome,
                }
            })
            .collect();

        let report = RestoreReport { entries };
        info!(
            "Restored {} of {} features",
            report.applied(),
            report.entries.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ToggleCfg, sysfs::MockAttributeIo};
    use pretty_assertions::assert_eq;
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    type CallLog = Arc<Mutex<Vec<Feature>>>;

    // Restorable that records every call
    #[derive(Debug)]
    struct RecordingRestorable {
        feature: Feature,
        supported: bool,
        calls: CallLog,
    }

    impl Restorable for RecordingRestorable {
        fn feature(&self) -> Feature {
            self.feature
        }

        fn is_supported(&self) -> bool {
            self.supported
        }

        fn restore(&self, _prefs: &Preferences) -> RestoreOutcome {
            self.calls.lock().unwrap().push(self.feature);
            if self.supported {
                RestoreOutcome::Applied("1".to_string())
            } else {
                RestoreOutcome::Unsupported
            }
        }
    }

    fn recording(calls: &CallLog, unsupported: &[Feature]) -> BootRestorer {
        BootRestorer::with_controllers(
            Feature::BOOT_ORDER
                .into_iter()
                .map(|feature| {
                    Box::new(RecordingRestorable {
                        feature,
                        supported: !unsupported.contains(&feature),
                        calls: calls.clone(),
                    }) as Box<dyn Restorable>
                })
                .collect(),
        )
    }

    #[test]
    fn from_config_uses_fixed_order() {
        let restorer = BootRestorer::from_config(&Config::default(), Arc::new(MockAttributeIo::new()));

        assert_eq!(restorer.features(), Feature::BOOT_ORDER.to_vec());
    }

    #[test]
    fn run_restores_each_feature_once_in_order() {
        let calls = CallLog::default();
        let restorer = recording(&calls, &[]);

        let report = restorer.run(&Preferences::in_memory());

        assert_eq!(*calls.lock().unwrap(), Feature::BOOT_ORDER.to_vec());
        assert_eq!(report.applied(), 6);
    }

    #[test]
    fn unsupported_feature_does_not_block_later_ones() {
        let calls = CallLog::default();
        let restorer = recording(&calls, &[Feature::Vibrator, Feature::Music]);

        let report = restorer.run(&Preferences::in_memory());

        assert_eq!(calls.lock().unwrap().len(), 6);
        assert_eq!(report.applied(), 4);
        assert_eq!(report.outcome(Feature::Music), Some(&RestoreOutcome::Unsupported));
        assert_eq!(
            report.outcome(Feature::FastCharge),
            Some(&RestoreOutcome::Applied("1".to_string()))
        );
    }

    #[test]
    fn missing_attributes_mean_zero_writes() {
        let mut io = MockAttributeIo::new();
        io.expect_exists().returning(|_| false);
        io.expect_write_value().never();

        let config = Config {
            knock_on: Some(ToggleCfg::from(PathBuf::from("/sys/nonexistent/knock_on"))),
            torch: Some(ToggleCfg::from(PathBuf::from("/sys/nonexistent/torch"))),
            ..Config::default()
        };
        let restorer = BootRestorer::from_config(&config, Arc::new(io));

        let report = restorer.run(&Preferences::in_memory());

        assert_eq!(report.applied(), 0);
        assert_eq!(report.entries.len(), 6);
    }

    #[test]
    fn writes_only_supported_attributes() {
        let mut io = MockAttributeIo::new();
        io.expect_exists()
            .returning(|path| path.ends_with("knock_on"));
        io.expect_write_value()
            .withf(|path, value| path.ends_with("knock_on") && value == "1")
            .times(1)
            .return_const(());

        let config = Config {
            knock_on: Some(ToggleCfg::from(PathBuf::from("/sys/fake/knock_on"))),
            camera: Some(ToggleCfg::from(PathBuf::from("/sys/fake/camera"))),
            ..Config::default()
        };
        let mut prefs = Preferences::in_memory();
        prefs.put_bool("doubletap_gesture", true);
        prefs.put_bool("camera_gesture", true);

        let report = BootRestorer::from_config(&config, Arc::new(io)).run(&prefs);

        assert_eq!(report.outcome(Feature::KnockOn), Some(&RestoreOutcome::Applied("1".to_string())));
        assert_eq!(report.outcome(Feature::Camera), Some(&RestoreOutcome::Unsupported));
    }
}
