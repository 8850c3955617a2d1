use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::feature::Feature;

/// klte_settingsd: device settings and boot-time restore for sysfs-backed features
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML config file path (default: /etc/klte_settingsd/config.yml)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log debug messages
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Re-apply every stored preference to hardware (run once after boot)
    Restore,

    /// Show support, stored value and current hardware value per feature
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Switch an on/off feature
    Toggle {
        feature: Feature,
        state: Switch,
    },

    /// Show or set the vibrator intensity in percent
    Intensity {
        /// New intensity, 0-100
        #[arg(value_parser = clap::value_parser!(i32).range(0..=100))]
        percent: Option<i32>,

        /// Go back to the driver's default strength
        #[arg(long, conflicts_with = "percent")]
        reset: bool,
    },

    /// Restore, then re-apply whenever the preference or config file changes
    Watch {
        /// Detach from the terminal before running
        #[arg(short = 'd', long = "daemonize", default_value = "false")]
        daemonize: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(value: Switch) -> Self {
        matches!(value, Switch::On)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_toggle_with_kebab_case_feature() {
        let cli = Cli::try_parse_from(["klte_settingsd", "toggle", "knock-on", "on"]).unwrap();

        assert_eq!(
            cli.command,
            Command::Toggle {
                feature: Feature::KnockOn,
                state: Switch::On
            }
        );
    }

    #[test]
    fn parses_global_flags() {
        let cli =
            Cli::try_parse_from(["klte_settingsd", "-c", "/tmp/c.yml", "-v", "watch", "-d"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yml")));
        assert!(cli.verbose);
        assert_eq!(cli.command, Command::Watch { daemonize: true });
    }

    #[test]
    fn daemonize_is_only_accepted_by_watch() {
        assert!(Cli::try_parse_from(["klte_settingsd", "-d", "restore"]).is_err());
        assert!(Cli::try_parse_from(["klte_settingsd", "restore", "-d"]).is_err());

        let cli = Cli::try_parse_from(["klte_settingsd", "watch"]).unwrap();
        assert_eq!(cli.command, Command::Watch { daemonize: false });
    }

    #[test]
    fn intensity_rejects_out_of_range_percent() {
        assert!(Cli::try_parse_from(["klte_settingsd", "intensity", "101"]).is_err());
        assert!(Cli::try_parse_from(["klte_settingsd", "intensity", "40", "--reset"]).is_err());

        let cli = Cli::try_parse_from(["klte_settingsd", "intensity", "40"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Intensity {
                percent: Some(40),
                reset: false
            }
        );
    }

    #[test]
    fn switch_converts_to_bool() {
        assert!(bool::from(Switch::On));
        assert!(!bool::from(Switch::Off));
    }
}
