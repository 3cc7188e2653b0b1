//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::kicad::footprint::DEFAULT_FOOTPRINT_EXTENSIONS;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Directory scanned for downloaded component archives.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Directory holding the per-vendor libraries.
    #[serde(default)]
    pub library_dir: Option<PathBuf>,

    /// File name suffixes recognised as footprints.
    #[serde(default = "default_footprint_extensions")]
    pub footprint_extensions: Vec<String>,

    /// Delete each archive after it has been fully imported.
    #[serde(default)]
    pub delete_imported: bool,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            source_dir: None,
            library_dir: None,
            footprint_extensions: default_footprint_extensions(),
            delete_imported: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.footprint_extensions.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "footprint_extensions must not be empty".to_string(),
            });
        }
        if let Some(ext) = self
            .footprint_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigError::ValidationError {
                message: format!("footprint extension '{ext}' must be a suffix starting with '.'"),
            });
        }
        Ok(())
    }

    /// Returns the library directory, preferring `override_dir` over the
    /// file's `library_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingLibraryDir`] if neither names one.
    pub fn resolve_library_dir(
        &self,
        override_dir: Option<PathBuf>,
    ) -> Result<PathBuf, ConfigError> {
        override_dir
            .or_else(|| self.library_dir.clone())
            .ok_or(ConfigError::MissingLibraryDir)
    }
}

fn default_footprint_extensions() -> Vec<String> {
    DEFAULT_FOOTPRINT_EXTENSIONS
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
