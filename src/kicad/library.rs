//! Per-vendor library layout.
//!
//! Every vendor gets three stores under the library directory:
//!
//! - `<vendor>.lib` — symbol database
//! - `<vendor>.dcm` — description database
//! - `<vendor>.pretty/` — footprint directory

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::record::RecordKind;
use super::{ImpartError, ImpartResult, VendorFormat};

/// Matches the trailing comment that closes both database kinds
/// (`#End Library`, `#End Doc Library`).
pub const END_OF_LIBRARY_PATTERN: &str = r"(?i)^# *end ";

/// Contents of an empty description database.
pub const DESCRIPTION_SKELETON: &str = "EESchema-DOCLIB  Version 2.0\n#End Doc Library\n";

/// Contents of an empty symbol database.
pub const SYMBOL_SKELETON: &str = "EESchema-LIBRARY Version 2.4\n#encoding utf-8\n#End Library\n";

/// Returns true if `line` is an end-of-library marker.
///
/// The same pattern is used for symbol and description databases.
#[must_use]
pub fn is_end_of_library(line: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(END_OF_LIBRARY_PATTERN).expect("valid end-of-library pattern"))
        .is_match(line)
}

/// The directory holding all vendor libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    root: PathBuf,
}

impl Library {
    /// Creates a library rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the library directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a vendor's database of the given kind.
    #[must_use]
    pub fn database_path(&self, vendor: VendorFormat, kind: RecordKind) -> PathBuf {
        self.root
            .join(format!("{}.{}", vendor.library_name(), kind.extension()))
    }

    /// Path of a vendor's footprint directory.
    #[must_use]
    pub fn footprint_dir(&self, vendor: VendorFormat) -> PathBuf {
        self.root.join(format!("{}.pretty", vendor.library_name()))
    }

    /// Truncates a vendor's databases to empty skeletons and empties its
    /// footprint directory.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the stores cannot be written.
    pub fn initialize(&self, vendor: VendorFormat) -> ImpartResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| ImpartError::file_write(&self.root, e))?;

        for (kind, skeleton) in [
            (RecordKind::Description, DESCRIPTION_SKELETON),
            (RecordKind::Symbol, SYMBOL_SKELETON),
        ] {
            let path = self.database_path(vendor, kind);
            fs::write(&path, skeleton).map_err(|e| ImpartError::file_write(&path, e))?;
            set_mode(&path, 0o660)?;
        }

        let pretty = self.footprint_dir(vendor);
        match fs::remove_dir_all(&pretty) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ImpartError::file_write(&pretty, e)),
        }
        fs::create_dir(&pretty).map_err(|e| ImpartError::file_write(&pretty, e))?;
        set_mode(&pretty, 0o770)?;

        tracing::info!(vendor = %vendor, path = %self.root.display(), "Initialised library");
        Ok(())
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> ImpartResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| ImpartError::file_write(path, e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_mode(_path: &Path, _mode: u32) -> ImpartResult<()> {
    Ok(())
}
