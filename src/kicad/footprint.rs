//! Footprint file copying.

use std::fs;
use std::path::Path;

use super::archive::Entry;
use super::{ImpartError, ImpartResult};

/// Footprint file extensions recognised by default (KiCad 5+ and legacy).
pub const DEFAULT_FOOTPRINT_EXTENSIONS: [&str; 2] = [".kicad_mod", ".mod"];

/// Copies the footprint files directly inside `source` into `dest`.
///
/// Subdirectories are not searched. Files whose name ends in one of
/// `extensions` are written to `dest` under the same name, overwriting any
/// existing file. Returns the number of files copied.
///
/// # Errors
///
/// Returns an error if `dest` cannot be created or a file cannot be written.
pub fn copy_footprints(source: &Entry, dest: &Path, extensions: &[String]) -> ImpartResult<usize> {
    fs::create_dir_all(dest).map_err(|e| ImpartError::file_write(dest, e))?;

    let mut copied = 0;
    for entry in source.entries() {
        let Some(data) = entry.data() else {
            continue;
        };
        let name = entry.name();
        if !extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            continue;
        }
        if !is_plain_file_name(name) {
            tracing::warn!(name, "Skipping footprint with unsafe file name");
            continue;
        }

        let path = dest.join(name);
        fs::write(&path, data).map_err(|e| ImpartError::file_write(&path, e))?;
        tracing::debug!(path = %path.display(), "Copied footprint");
        copied += 1;
    }

    Ok(copied)
}

/// Returns true if `name` names a file directly inside a directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && Path::new(name).file_name().is_some_and(|n| n == name)
}
