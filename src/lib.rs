//! kicad-impart: merge vendor component archives into KiCad legacy libraries
//!
//! Component distributors ship KiCad exports as zip archives in four
//! different layouts. This library sorts each archive into a per-vendor
//! library made of a symbol database (`.lib`), a description database
//! (`.dcm`) and a footprint directory (`.pretty/`).
//!
//! # Architecture
//!
//! - **Classification**: detect the vendor layout and locate the relevant files
//! - **Extraction**: pull the single symbol and description record out of the
//!   vendor files and rename them to the operator's device name
//! - **Merging**: splice the records into the vendor databases with
//!   replace-or-keep semantics and atomic commit
//! - **Footprints**: copy the footprint files into the vendor's `.pretty/`
//!
//! # Modules
//!
//! - [`cancel`] — Cooperative cancellation (Ctrl+C)
//! - [`config`] — Configuration loading and validation
//! - [`console`] — Interactive operator prompts
//! - [`error`] — Configuration error types
//! - [`impart`] — Import orchestration
//! - [`kicad`] — KiCad legacy library handling

pub mod cancel;
pub mod config;
pub mod console;
pub mod error;
pub mod impart;
pub mod kicad;
