//! KiCad legacy library handling.
//!
//! This module merges vendor component archives into per-vendor KiCad
//! "legacy" libraries:
//!
//! - `.lib` — symbol databases (`DEF` ... `ENDDEF` records)
//! - `.dcm` — description databases (`$CMP` ... `$ENDCMP` records)
//! - `.pretty/` — footprint directories
//!
//! # Pipeline
//!
//! ```text
//! archive ──▶ classify ──▶ extract (dcm, lib) ──▶ stage merges ──▶ footprints ──▶ commit
//! ```
//!
//! Both database kinds are closed by an end-of-library comment line
//! (`#End Library`, `#End Doc Library`); new records are spliced in just
//! before it.

pub mod archive;
pub mod error;
pub mod footprint;
pub mod library;
pub mod merge;
pub mod record;
pub mod vendor;

pub use archive::{classify, Archive, Entry, Layout};
pub use error::{ImpartError, ImpartResult};
pub use library::Library;
pub use merge::{MergeOutcome, MergeStatus, StagedLibrary};
pub use record::{ExtractRequest, RecordKind, TextRecord};
pub use vendor::VendorFormat;

use std::borrow::Cow;

/// Decodes vendor text, falling back to Windows-1252 for legacy files that
/// are not valid UTF-8.
#[must_use]
pub fn decode_text(data: &[u8]) -> Cow<'_, str> {
    std::str::from_utf8(data).map_or_else(
        |_| encoding_rs::WINDOWS_1252.decode_without_bom_handling(data).0,
        Cow::Borrowed,
    )
}
