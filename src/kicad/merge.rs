//! Record-level library merging.
//!
//! A library database is never edited in place. [`stage`] streams the current
//! file into a temporary file in the same directory, splicing the new record
//! in as it goes; [`StagedLibrary::commit`] then renames the temporary file
//! over the original. Dropping a staged library without committing it deletes
//! the temporary file, so a failed, declined or cancelled import leaves the
//! original untouched.
//!
//! Lines outside the spliced record are copied byte for byte, whatever their
//! encoding or line endings.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::library::is_end_of_library;
use super::record::{RecordKind, TextRecord};
use super::{decode_text, ImpartError, ImpartResult};
use crate::console::Console;

/// How a record ended up in a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// Inserted before the end-of-library marker.
    Written,
    /// Written over an existing record of the same device.
    Replaced,
    /// The operator kept the existing record.
    AlreadyPresent,
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Written => "added",
            Self::Replaced => "replaced",
            Self::AlreadyPresent => "kept",
        })
    }
}

/// Result of [`stage`].
#[derive(Debug)]
pub enum MergeOutcome {
    /// The merged library is ready to commit.
    Staged(StagedLibrary),
    /// The operator declined to replace an existing record.
    AlreadyPresent,
}

/// A fully written replacement for a library file.
#[derive(Debug)]
pub struct StagedLibrary {
    temp: NamedTempFile,
    target: PathBuf,
    status: MergeStatus,
}

impl StagedLibrary {
    /// Path of the library this stage replaces.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Whether the record was added or replaced.
    #[must_use]
    pub const fn status(&self) -> MergeStatus {
        self.status
    }

    /// Flushes the staged file to disk, then atomically replaces the library
    /// with it.
    ///
    /// The original file's permissions are carried over.
    ///
    /// # Errors
    ///
    /// Returns an error if the staged file cannot be synced or renamed; the
    /// original is then unchanged.
    pub fn commit(self) -> ImpartResult<MergeStatus> {
        if let Ok(metadata) = fs::metadata(&self.target) {
            fs::set_permissions(self.temp.path(), metadata.permissions())
                .map_err(|e| ImpartError::file_write(self.temp.path(), e))?;
        }

        self.temp
            .as_file()
            .sync_all()
            .map_err(|e| ImpartError::file_write(self.temp.path(), e))?;

        self.temp
            .persist(&self.target)
            .map_err(|e| ImpartError::file_write(&self.target, e.error))?;

        tracing::debug!(path = %self.target.display(), status = %self.status, "Committed library");
        Ok(self.status)
    }
}

/// Streams `path` into a temporary file with `record` spliced in.
///
/// - A record whose declared name starts with `device` is a collision: the
///   operator is asked whether to replace it. Declining returns
///   [`MergeOutcome::AlreadyPresent`]; confirming writes the record body in
///   place of the old one.
/// - Otherwise the record, with its comment header, is inserted just before
///   the end-of-library marker.
///
/// Only the first colliding record prompts. Once it is replaced, later
/// records for the same device are dropped so the library keeps a single
/// record per device.
///
/// # Errors
///
/// Returns an error if the library cannot be read, the temporary file cannot
/// be written, the library has no end-of-library marker, or a prompt fails.
pub fn stage(
    path: &Path,
    kind: RecordKind,
    record: &TextRecord,
    device: &str,
    console: &mut Console<'_>,
) -> ImpartResult<MergeOutcome> {
    let file = File::open(path).map_err(|e| ImpartError::file_read(path, e))?;
    let mut reader = BufReader::new(file);

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(dir).map_err(|e| ImpartError::file_write(dir, e))?;
    let temp_path = temp.path().to_path_buf();
    let mut writer = BufWriter::new(temp);
    let write_err = |e: std::io::Error| ImpartError::file_write(&temp_path, e);

    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let mut status = MergeStatus::Written;
    let mut skipping = false;
    let mut terminated = false;
    let mut raw = Vec::new();

    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .map_err(|e| ImpartError::file_read(path, e))?;
        if read == 0 {
            break;
        }
        let text = decode_text(&raw);
        let line = text.trim_end_matches(['\r', '\n']);

        if is_end_of_library(line) {
            if status == MergeStatus::Written {
                write_lines(&mut writer, record.with_header()).map_err(write_err)?;
            }
            writer.write_all(&raw).map_err(write_err)?;
            terminated = true;
            break;
        }

        let collision = kind
            .declared_name(line)
            .filter(|name| !skipping && name.starts_with(device));
        if let Some(name) = collision {
            if status == MergeStatus::Written {
                tracing::debug!(existing = name, device, "Device already in library");
                if !console.confirm(&format!("{device} in {file_name}, replace it ?"))? {
                    return Ok(MergeOutcome::AlreadyPresent);
                }
                write_lines(&mut writer, record.body()).map_err(write_err)?;
                status = MergeStatus::Replaced;
            } else {
                tracing::debug!(existing = name, device, "Dropping duplicate record");
            }
            skipping = true;
            continue;
        }

        if skipping {
            if kind.is_end(line) {
                skipping = false;
            }
            continue;
        }

        writer.write_all(&raw).map_err(write_err)?;
    }

    if !terminated {
        return Err(ImpartError::UnterminatedLibrary {
            path: path.to_path_buf(),
        });
    }

    let temp = writer
        .into_inner()
        .map_err(|e| ImpartError::file_write(&temp_path, e.into_error()))?;

    Ok(MergeOutcome::Staged(StagedLibrary {
        temp,
        target: path.to_path_buf(),
        status,
    }))
}

/// Stages and immediately commits a merge.
///
/// The cancellation flag is checked once more before the library is
/// replaced.
///
/// # Errors
///
/// See [`stage`] and [`StagedLibrary::commit`]; also returns
/// [`ImpartError::Cancelled`] if cancelled before the commit.
pub fn merge(
    path: &Path,
    kind: RecordKind,
    record: &TextRecord,
    device: &str,
    console: &mut Console<'_>,
) -> ImpartResult<MergeStatus> {
    match stage(path, kind, record, device, console)? {
        MergeOutcome::Staged(staged) => {
            console.cancel_token().checkpoint()?;
            staged.commit()
        }
        MergeOutcome::AlreadyPresent => Ok(MergeStatus::AlreadyPresent),
    }
}

fn write_lines<W: Write>(writer: &mut W, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
