//! Import orchestration.
//!
//! [`Importer::import`] runs one archive through the whole pipeline. Both
//! databases are staged before anything is written, so declining a
//! replacement, a validation failure or a cancellation at any prompt leaves
//! every store untouched. Footprints are copied only once both merges are
//! staged, and the two databases are committed last.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::console::Console;
use crate::kicad::footprint::{copy_footprints, DEFAULT_FOOTPRINT_EXTENSIONS};
use crate::kicad::merge::{self, MergeOutcome, MergeStatus};
use crate::kicad::record::{
    edit_description_fields, extract_description, extract_symbol, placeholder_description,
    ExtractRequest, RecordKind,
};
use crate::kicad::{
    classify, decode_text, Archive, ImpartError, ImpartResult, Library, VendorFormat,
};

/// The result of importing one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Both records were merged and the footprints copied.
    Imported {
        /// Device identifier the part was filed under.
        device: String,
        /// Library the part went into.
        vendor: VendorFormat,
        /// What happened in the description database.
        description: MergeStatus,
        /// What happened in the symbol database.
        symbol: MergeStatus,
        /// Number of footprint files copied.
        footprints: usize,
    },
    /// The operator kept an existing record; nothing was written.
    AlreadyPresent {
        /// Device identifier.
        device: String,
        /// Library file that already holds the device.
        library: PathBuf,
    },
    /// No device identifier was given.
    Skipped,
}

impl ImportOutcome {
    /// Returns true if the archive was fully imported.
    #[must_use]
    pub const fn is_imported(&self) -> bool {
        matches!(self, Self::Imported { .. })
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imported {
                device,
                vendor,
                description,
                symbol,
                footprints,
            } => write!(
                f,
                "OK: {device} in {vendor} (symbol {symbol}, description {description}, footprints: {footprints})"
            ),
            Self::AlreadyPresent { device, library } => {
                let name = library
                    .file_name()
                    .map_or_else(|| library.display().to_string(), |n| n.to_string_lossy().into_owned());
                write!(f, "OK: {device} already in {name}")
            }
            Self::Skipped => f.write_str("Skipped: no device name given"),
        }
    }
}

/// Imports component archives into a [`Library`].
#[derive(Debug, Clone)]
pub struct Importer {
    library: Library,
    footprint_extensions: Vec<String>,
}

impl Importer {
    /// Creates an importer using the default footprint extensions.
    #[must_use]
    pub fn new(library: Library) -> Self {
        Self {
            library,
            footprint_extensions: DEFAULT_FOOTPRINT_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Overrides the recognised footprint extensions.
    #[must_use]
    pub fn with_footprint_extensions(mut self, extensions: Vec<String>) -> Self {
        self.footprint_extensions = extensions;
        self
    }

    /// Returns the target library.
    #[must_use]
    pub const fn library(&self) -> &Library {
        &self.library
    }

    /// Imports one archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is unreadable or unrecognised, a
    /// record fails validation, a library cannot be read or written, or the
    /// operator cancels or closes the input.
    pub fn import(&self, path: &Path, console: &mut Console<'_>) -> ImpartResult<ImportOutcome> {
        let archive = Archive::open(path)?;
        let layout = classify(&archive)?;
        let vendor = layout.format;
        debug!(archive = %path.display(), vendor = %vendor, "Classified archive");

        let original = archive_base_name(path);
        let device = console.ask("Generic device name", &original)?;
        if device.is_empty() {
            return Ok(ImportOutcome::Skipped);
        }
        info!(device = %device, vendor = %vendor, "Adding device");

        let description = match layout.description {
            Some(entry) => {
                let text = decode_text(entry.data().unwrap_or_default());
                let request = ExtractRequest {
                    device: &device,
                    original: &original,
                    source: entry.name(),
                };
                extract_description(&text, &request, Some(&mut *console))?
            }
            None => {
                let mut record = placeholder_description(&ExtractRequest {
                    device: &device,
                    original: &original,
                    source: "",
                });
                edit_description_fields(&mut record, console)?;
                record
            }
        };

        let symbol = {
            let text = decode_text(layout.symbol.data().unwrap_or_default());
            let request = ExtractRequest {
                device: &device,
                original: &original,
                source: layout.symbol.name(),
            };
            extract_symbol(&text, &request)?
        };

        let dcm_path = self.library.database_path(vendor, RecordKind::Description);
        let MergeOutcome::Staged(dcm) = merge::stage(
            &dcm_path,
            RecordKind::Description,
            &description,
            &device,
            console,
        )?
        else {
            return Ok(ImportOutcome::AlreadyPresent {
                device,
                library: dcm_path,
            });
        };

        let lib_path = self.library.database_path(vendor, RecordKind::Symbol);
        let MergeOutcome::Staged(lib) =
            merge::stage(&lib_path, RecordKind::Symbol, &symbol, &device, console)?
        else {
            return Ok(ImportOutcome::AlreadyPresent {
                device,
                library: lib_path,
            });
        };

        console.cancel_token().checkpoint()?;
        let footprints = copy_footprints(
            layout.footprints,
            &self.library.footprint_dir(vendor),
            &self.footprint_extensions,
        )?;
        info!(footprints, "Copied footprints");

        console.cancel_token().checkpoint()?;
        let description = dcm.commit()?;
        let symbol = lib.commit()?;

        Ok(ImportOutcome::Imported {
            device,
            vendor,
            description,
            symbol,
            footprints,
        })
    }
}

/// Returns the archive's file name without its `.zip` extension.
fn archive_base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists the `*.zip` file names in `dir`, sorted.
///
/// # Errors
///
/// Returns an error if the directory path cannot form a search pattern.
pub fn list_archives(dir: &Path) -> ImpartResult<Vec<String>> {
    let pattern = format!(
        "{}/*.zip",
        glob::Pattern::escape(&dir.display().to_string())
    );
    let paths = glob::glob(&pattern).map_err(|e| {
        ImpartError::file_read(
            dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
        )
    })?;

    let mut names: Vec<String> = paths
        .filter_map(|entry| match entry {
            Ok(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable archive path");
                None
            }
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Interactively initialises vendor libraries, each at most once.
///
/// Stops when the operator gives an empty reply or every vendor has been
/// initialised. Returns the vendors that were reset.
///
/// # Errors
///
/// Returns an error if a prompt fails or a store cannot be written.
pub fn initialize_libraries(
    library: &Library,
    console: &mut Console<'_>,
) -> ImpartResult<Vec<VendorFormat>> {
    let mut remaining: Vec<String> = VendorFormat::ALL
        .iter()
        .map(|v| v.library_name().to_string())
        .collect();
    let mut initialized = Vec::new();

    while !remaining.is_empty() {
        let reply = console.choose("Erase/Initialize which library? ", &remaining)?;
        if reply.is_empty() {
            break;
        }
        let Some(index) = remaining.iter().position(|name| *name == reply) else {
            warn!(reply = %reply, "Unknown library");
            continue;
        };
        let name = remaining.remove(index);
        let Some(vendor) = VendorFormat::from_library_name(&name) else {
            continue;
        };
        library.initialize(vendor)?;
        initialized.push(vendor);
    }

    Ok(initialized)
}
