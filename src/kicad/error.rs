//! Error types for library import operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for import operations.
pub type ImpartResult<T> = Result<T, ImpartError>;

/// Errors that can occur while importing a component archive.
///
/// Every variant is local to a single import attempt. None of them leaves a
/// library half-written, because libraries are only ever replaced by an atomic
/// rename of a fully written temporary file.
#[derive(Debug, Error)]
pub enum ImpartError {
    /// Failed to open or read a file.
    #[error("Failed to read file: {path}")]
    FileRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file: {path}")]
    FileWrite {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The input is not a readable zip archive.
    #[error("Invalid archive {path}: {message}")]
    Archive {
        /// Path to the archive.
        path: PathBuf,
        /// Description of what's wrong.
        message: String,
    },

    /// Archive layout unrecognised or vendor-specific substructure missing.
    #[error("Unsupported archive: {message}")]
    Format {
        /// Description of what's wrong.
        message: String,
    },

    /// A record names a device that does not match the requested identifier.
    #[error("Unexpected device in {file}")]
    DeviceMismatch {
        /// File holding the record.
        file: String,
    },

    /// More than one record where exactly one was expected.
    #[error("Multiple devices in {file}")]
    MultipleRecords {
        /// File holding the records.
        file: String,
    },

    /// The record's end marker was never found.
    #[error("{device} not found in {file}")]
    UnterminatedRecord {
        /// Requested device identifier.
        device: String,
        /// File that was scanned.
        file: String,
    },

    /// A library file has no end-of-library marker.
    #[error("No end-of-library marker in {path}")]
    UnterminatedLibrary {
        /// Path to the library file.
        path: PathBuf,
    },

    /// The operator cancelled the import.
    #[error("Import cancelled")]
    Cancelled,

    /// The interactive input channel was closed.
    #[error("End of input")]
    EndOfInput,

    /// Reading an interactive reply failed.
    #[error("Failed to read reply")]
    Prompt {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ImpartError {
    /// Creates a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid archive error.
    pub fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an archive layout error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Creates a device mismatch error.
    pub fn device_mismatch(file: impl Into<String>) -> Self {
        Self::DeviceMismatch { file: file.into() }
    }

    /// Creates a multiple records error.
    pub fn multiple_records(file: impl Into<String>) -> Self {
        Self::MultipleRecords { file: file.into() }
    }

    /// Creates an unterminated record error.
    pub fn unterminated_record(device: impl Into<String>, file: impl Into<String>) -> Self {
        Self::UnterminatedRecord {
            device: device.into(),
            file: file.into(),
        }
    }

    /// Maps a failed prompt read. A closed input channel becomes
    /// [`ImpartError::EndOfInput`].
    #[must_use]
    pub fn prompt(source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            Self::EndOfInput
        } else {
            Self::Prompt { source }
        }
    }

    /// Returns true if the control loop should stop rather than move on to
    /// the next archive.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::EndOfInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ImpartError::multiple_records("part.lib");
        assert_eq!(err.to_string(), "Multiple devices in part.lib");
    }

    #[test]
    fn unterminated_record_display() {
        let err = ImpartError::unterminated_record("LM358", "LM358.dcm");
        assert_eq!(err.to_string(), "LM358 not found in LM358.dcm");
    }

    #[test]
    fn eof_is_fatal() {
        let err = ImpartError::prompt(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, ImpartError::EndOfInput));
        assert!(err.is_fatal());
    }

    #[test]
    fn other_prompt_failures_are_recoverable() {
        let err = ImpartError::prompt(io::Error::from(io::ErrorKind::InvalidData));
        assert!(matches!(err, ImpartError::Prompt { .. }));
        assert!(!err.is_fatal());
        assert!(!ImpartError::Cancelled.is_fatal());
    }
}
