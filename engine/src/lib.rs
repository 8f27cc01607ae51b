//! # dcp engine - digest-aware copy library
//!
//! A library for copying files and directory trees while computing
//! content digests in the same pass, with change detection against the
//! results of previous runs.
//!
//! ## Overview
//!
//! The engine enumerates the source operands into an ordered sequence of
//! work items, then processes them one at a time: each file is read once
//! through a single reusable buffer, with every chunk written to the
//! destination and fed to all enabled digests in the same iteration. When
//! an index built from prior result files is supplied, each file is
//! classified as new, unchanged, or changed. One structured record per
//! item is handed to a pluggable sink, in enumeration order, followed by
//! a run summary. Per-item failures are captured in the record and never
//! abort the run.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use engine::{CopyEngine, CopyOptions, ResultRecord, ResultSink, RunInfo, RunSummary};
//!
//! struct Stdout;
//!
//! impl ResultSink for Stdout {
//!     fn on_run_started(&mut self, _info: &RunInfo) {}
//!     fn on_result(&mut self, record: &ResultRecord) {
//!         println!("{} {}", record.change, record.rel_path.display());
//!     }
//!     fn on_run_completed(&mut self, _summary: &RunSummary) {}
//! }
//!
//! # fn main() -> Result<(), engine::EngineError> {
//! let mut engine = CopyEngine::new(CopyOptions::default());
//! let sources = vec![PathBuf::from("photos")];
//! let summary = engine.run(&sources, Path::new("backup"), &mut Stdout)?;
//! println!("{} items, {} failed", summary.items, summary.failed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: core data structures (WorkItem, ResultRecord, CopyOptions)
//! - **error**: run-fatal and per-item error types
//! - **digest**: digest algorithms and the fan-out accumulator
//! - **index**: change-detection index built from prior result files
//! - **planner**: source enumeration into ordered work items
//! - **copy**: the copy engine itself
//! - **report**: the result-file line format
//! - **sink**: the result sink trait

pub mod copy;
pub mod digest;
pub mod error;
pub mod index;
pub mod model;
pub mod planner;
pub mod report;
pub mod sink;

// Re-export main types and functions
pub use copy::CopyEngine;
pub use digest::{Algorithm, AlgorithmSet, DigestRecord, DigestSet};
pub use error::{EngineError, ItemError};
pub use index::{peek_algorithms, Index};
pub use model::{
    ChangeStatus, CopyOptions, EntryKind, ResultRecord, RunInfo, RunSummary, WorkItem,
    DEFAULT_BUFFER_SIZE,
};
pub use planner::plan;
pub use sink::ResultSink;
