//! Access to kernel attribute files.
//!
//! Every operation here is best-effort: a device that lacks an attribute
//! must never bring down the caller, so failures are logged and turned into
//! `false`/`None`/no-op instead of being propagated.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::Path,
};

use log::{debug, warn};

/// Read/write access to sysfs-style attribute files.
///
/// Controllers talk to hardware only through this trait, which lets the
/// tests drive them against a fake without touching the filesystem.
#[cfg_attr(test, mockall::automock)]
pub trait AttributeIo: Send + Sync {
    /// Returns `true` when the attribute can be stat'ed.
    fn exists(&self, path: &Path) -> bool;

    /// Writes `value` to the attribute, swallowing any I/O failure.
    fn write_value(&self, path: &Path, value: &str);

    /// Reads the first line of the attribute with trailing whitespace removed.
    fn read_line(&self, path: &Path) -> Option<String>;
}

/// The real filesystem-backed attribute accessor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sysfs;

impl AttributeIo for Sysfs {
    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok()
    }

    fn write_value(&self, path: &Path, value: &str) {
        // Attributes are never created: a missing file means a missing feature.
        let result = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)
            .and_then(|mut file| file.write_all(value.as_bytes()));

        match result {
            Ok(()) => debug!("Wrote '{}' to {}", value, path.display()),
            Err(e) => warn!("Failed to write '{}' to {}: {}", value, path.display(), e),
        }
    }

    fn read_line(&self, path: &Path) -> Option<String> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open {}: {}", path.display(), e);
                return None;
            }
        };

        let mut line = String::new();
        match BufReader::new(file).read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end().to_string()),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// `exists` for an optional path: an unconfigured attribute is unsupported.
pub fn is_present(io: &dyn AttributeIo, path: Option<&Path>) -> bool {
    path.is_some_and(|p| io.exists(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;
    use tempfile::{NamedTempFile, tempdir};

    fn attribute(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn exists_reports_present_and_missing_files() {
        let file = attribute("1");
        let dir = tempdir().unwrap();

        assert!(Sysfs.exists(file.path()));
        assert!(!Sysfs.exists(&dir.path().join("missing")));
    }

    #[test]
    fn is_present_is_false_without_a_path() {
        let file = attribute("1");

        assert!(!is_present(&Sysfs, None));
        assert!(is_present(&Sysfs, Some(file.path())));
    }

    #[test]
    fn write_value_replaces_previous_content() {
        let file = attribute("12345\n");

        Sysfs.write_value(file.path(), "42");

        assert_eq!(fs::read_to_string(file.path()).unwrap(), "42");
    }

    #[test]
    fn write_value_never_creates_missing_attribute() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wake_gesture");

        Sysfs.write_value(&path, "1");

        assert!(!path.exists());
    }

    #[test]
    fn read_line_returns_first_line_trimmed() {
        let file = attribute("87  \nsecond line\n");

        assert_eq!(Sysfs.read_line(file.path()), Some("87".to_string()));
    }

    #[test]
    fn read_line_fails_quietly() {
        let dir = tempdir().unwrap();
        let empty = attribute("");

        assert_eq!(Sysfs.read_line(&dir.path().join("missing")), None);
        assert_eq!(Sysfs.read_line(empty.path()), None);
    }
}
