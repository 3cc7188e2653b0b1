//! Configuration error types.
//!
//! Import failures are reported through [`crate::kicad::ImpartError`].

use std::path::PathBuf;

use thiserror::Error;

/// Problems with the settings `kicad-impart` starts from.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings from {path}")]
    ReadError {
        /// Settings file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON or has unknown keys.
    #[error("malformed settings in {path}")]
    ParseError {
        /// Settings file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A settings file named on the command line does not exist.
    #[error("no settings file at {path}")]
    NotFound {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// A setting has an unusable value.
    #[error("invalid setting: {message}")]
    ValidationError {
        /// What is wrong with the setting.
        message: String,
    },

    /// Neither the settings file nor the command line names a library
    /// directory.
    #[error("no library directory: set \"library_dir\" in the settings file or pass --library-dir")]
    MissingLibraryDir,
}
