//! Core data model for copy runs.
//!
//! This module defines the main data structures for representing a run:
//! - WorkItem: one unit of copy work produced by enumeration
//! - ResultRecord: the structured outcome of processing one WorkItem
//! - CopyOptions: immutable per-run settings
//! - RunInfo, RunSummary: run-level data handed to the sink

use std::path::PathBuf;
use std::time::SystemTime;
use uuid::Uuid;

use crate::digest::{AlgorithmSet, DigestRecord};
use crate::error::ItemError;
use crate::index::Index;

/// Default size of the reusable read/write buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Classification of a source entry at enumeration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file, with its size in bytes
    File { size: u64 },

    /// Directory to be created at the destination
    Dir,

    /// Symbolic link or special file; not copied
    Other,
}

/// A single unit of copy work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Full source path
    pub source_path: PathBuf,

    /// Full destination path; always the destination root joined with
    /// `rel_path`
    pub dest_path: PathBuf,

    /// The source's basename chain. Also the key used for index lookups
    /// and the path recorded in result files.
    pub rel_path: PathBuf,

    /// Entry classification
    pub kind: EntryKind,
}

/// Classification of a file against a prior recorded digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// No prior record exists for this path
    New,
    /// Content digest matches the prior record
    Unchanged,
    /// Content digest differs from the prior record
    Changed,
    /// No index was supplied, or the item produced no digest
    Unknown,
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeStatus::New => write!(f, "new"),
            ChangeStatus::Unchanged => write!(f, "unchanged"),
            ChangeStatus::Changed => write!(f, "changed"),
            ChangeStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// The structured outcome of processing one WorkItem.
///
/// Exactly one record is produced per item, in enumeration order.
#[derive(Debug)]
pub struct ResultRecord {
    /// Full source path
    pub source_path: PathBuf,

    /// Full destination path
    pub dest_path: PathBuf,

    /// The path recorded in result files
    pub rel_path: PathBuf,

    /// Bytes written to the destination (0 for directories)
    pub size_bytes: u64,

    /// Digests in canonical order; empty for directories and failed items
    pub digests: Vec<DigestRecord>,

    /// How the content compares to the prior record for this path
    pub change: ChangeStatus,

    /// Per-item error; when set, the item was not copied
    pub error: Option<ItemError>,

    /// Non-fatal condition (ownership application failure); the copy
    /// itself succeeded
    pub warning: Option<String>,
}

impl ResultRecord {
    pub(crate) fn for_item(item: &WorkItem) -> Self {
        ResultRecord {
            source_path: item.source_path.clone(),
            dest_path: item.dest_path.clone(),
            rel_path: item.rel_path.clone(),
            size_bytes: 0,
            digests: Vec::new(),
            change: ChangeStatus::Unknown,
            error: None,
            warning: None,
        }
    }

    /// True when this item failed.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Immutable settings for one run.
#[derive(Debug)]
pub struct CopyOptions {
    /// Size of the single reusable read/write buffer
    pub buffer_size: usize,

    /// Digests computed while copying; an empty set means MD5
    pub algorithms: AlgorithmSet,

    /// Owner applied to every copy
    pub uid: u32,

    /// Group applied to every copy
    pub gid: u32,

    /// Prior-run digests for change detection
    pub index: Option<Index>,

    /// Whether sinks should report every item as it is processed
    pub verbose: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        CopyOptions {
            buffer_size: DEFAULT_BUFFER_SIZE,
            algorithms: AlgorithmSet::default(),
            uid: rustix::process::geteuid().as_raw(),
            gid: rustix::process::getegid().as_raw(),
            index: None,
            verbose: false,
        }
    }
}

/// Run-level information available when processing starts.
#[derive(Debug, Clone)]
pub struct RunInfo {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// Destination root every item is placed under
    pub dest_root: PathBuf,

    /// Number of enumerated WorkItems
    pub items: usize,

    /// Sum of all regular-file sizes
    pub total_bytes: u64,
}

/// Aggregate outcome of a run, handed to the sink after the last record.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identifier shared with the run's RunInfo
    pub run_id: Uuid,

    /// Number of WorkItems processed
    pub items: usize,

    /// Files copied successfully
    pub files_copied: usize,

    /// Directories created
    pub dirs_created: usize,

    /// Bytes written across all copied files
    pub bytes_copied: u64,

    /// Files with no prior record
    pub new_files: usize,

    /// Files whose digest matches the prior record
    pub unchanged_files: usize,

    /// Files whose digest differs from the prior record
    pub changed_files: usize,

    /// Files copied without an index to compare against
    pub unknown_files: usize,

    /// Items that could not be opened
    pub open_failures: usize,

    /// Items that failed mid-read
    pub read_failures: usize,

    /// Items that failed mid-write
    pub write_failures: usize,

    /// Directories that could not be created
    pub mkdir_failures: usize,

    /// Symbolic links and special files that were not copied
    pub unsupported_entries: usize,

    /// Records carrying a non-fatal warning
    pub warnings: usize,

    /// When the run started
    pub started: SystemTime,

    /// When the run finished
    pub finished: Option<SystemTime>,
}

impl RunSummary {
    pub(crate) fn new(run_id: Uuid, items: usize) -> Self {
        RunSummary {
            run_id,
            items,
            files_copied: 0,
            dirs_created: 0,
            bytes_copied: 0,
            new_files: 0,
            unchanged_files: 0,
            changed_files: 0,
            unknown_files: 0,
            open_failures: 0,
            read_failures: 0,
            write_failures: 0,
            mkdir_failures: 0,
            unsupported_entries: 0,
            warnings: 0,
            started: SystemTime::now(),
            finished: None,
        }
    }

    pub(crate) fn absorb(&mut self, kind: EntryKind, record: &ResultRecord) {
        if record.warning.is_some() {
            self.warnings += 1;
        }
        if let Some(error) = &record.error {
            match error {
                ItemError::OpenFailed { .. } => self.open_failures += 1,
                ItemError::ReadFailed { .. } => self.read_failures += 1,
                ItemError::WriteFailed { .. } => self.write_failures += 1,
                ItemError::CreateDirFailed { .. } => self.mkdir_failures += 1,
                ItemError::UnsupportedEntry { .. } => self.unsupported_entries += 1,
            }
            return;
        }
        match kind {
            EntryKind::File { .. } => {
                self.files_copied += 1;
                self.bytes_copied += record.size_bytes;
                match record.change {
                    ChangeStatus::New => self.new_files += 1,
                    ChangeStatus::Unchanged => self.unchanged_files += 1,
                    ChangeStatus::Changed => self.changed_files += 1,
                    ChangeStatus::Unknown => self.unknown_files += 1,
                }
            }
            EntryKind::Dir => self.dirs_created += 1,
            EntryKind::Other => {}
        }
    }

    /// Total number of failed items, of any kind.
    pub fn failed(&self) -> usize {
        self.open_failures
            + self.read_failures
            + self.write_failures
            + self.mkdir_failures
            + self.unsupported_entries
    }
}
