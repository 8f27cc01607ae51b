//! Error types for the copy engine.
//!
//! The primary error type is `EngineError`, which represents
//! configuration-level errors that abort a run before any item is
//! processed. Per-item errors are `ItemError` values captured in the
//! item's ResultRecord and never abort the run.

use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

/// Errors that abort a run before any item is processed.
///
/// Everything that can go wrong on an individual item is recorded in that
/// item's ResultRecord instead, and the run continues.
#[derive(Debug)]
pub enum EngineError {
    /// Destination root cannot be created or written
    DestinationUnwritable { path: PathBuf, source: io::Error },

    /// A prior-run result file cannot be read
    IndexRead { path: PathBuf, source: io::Error },

    /// No entry could be parsed from any supplied result file
    EmptyIndex,

    /// No digest algorithm could be determined from the supplied result files
    NoRecordedDigests,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DestinationUnwritable { path, source } => {
                write!(f, "cannot prepare destination {}: {}", path.display(), source)
            }
            Self::IndexRead { path, source } => {
                write!(f, "cannot read result file {}: {}", path.display(), source)
            }
            Self::EmptyIndex => {
                write!(f, "no entries could be parsed from the supplied result files")
            }
            Self::NoRecordedDigests => {
                write!(f, "cannot determine digest types from the supplied result files")
            }
        }
    }
}

impl Error for EngineError {}

/// Errors recorded on a single item's ResultRecord.
#[derive(Debug)]
pub enum ItemError {
    /// Source unreadable or destination file uncreatable
    OpenFailed { path: PathBuf, source: io::Error },

    /// Read from the source failed mid-stream
    ReadFailed { path: PathBuf, source: io::Error },

    /// Write to the destination failed mid-stream
    WriteFailed { path: PathBuf, source: io::Error },

    /// Destination directory could not be created
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Source is neither a regular file nor a directory
    UnsupportedEntry { path: PathBuf },
}

impl Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed { path, source } => {
                write!(f, "cannot open {}: {}", path.display(), source)
            }
            Self::ReadFailed { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(f, "cannot write {}: {}", path.display(), source)
            }
            Self::CreateDirFailed { path, source } => {
                write!(f, "cannot create directory {}: {}", path.display(), source)
            }
            Self::UnsupportedEntry { path } => {
                write!(f, "{} is not a regular file or directory", path.display())
            }
        }
    }
}

impl Error for ItemError {}

impl ItemError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::OpenFailed { source, .. }
            | Self::ReadFailed { source, .. }
            | Self::WriteFailed { source, .. }
            | Self::CreateDirFailed { source, .. } => source.raw_os_error(),
            Self::UnsupportedEntry { .. } => None,
        }
    }
}
