//! The digest-aware copy engine.
//!
//! Each file is streamed once: every chunk read into the engine's reusable
//! buffer is written to the destination and fed to the enabled digests in
//! the same iteration. The result is classified against the prior-run
//! index and ownership is applied to the copy. Per-item failures are
//! captured in the item's record; the run continues.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

use crate::digest::{AlgorithmSet, DigestRecord, DigestSet};
use crate::error::{EngineError, ItemError};
use crate::model::{
    ChangeStatus, CopyOptions, EntryKind, ResultRecord, RunInfo, RunSummary, WorkItem,
    DEFAULT_BUFFER_SIZE,
};
use crate::planner;
use crate::sink::ResultSink;

/// Sequential copy engine owning the single reusable read/write buffer.
///
/// The buffer is sized once from the options and shared by every item in
/// the run; it is never reallocated per file.
pub struct CopyEngine {
    options: CopyOptions,
    buffer: Vec<u8>,
}

impl CopyEngine {
    pub fn new(mut options: CopyOptions) -> Self {
        if options.algorithms.is_empty() {
            options.algorithms = AlgorithmSet::default();
        }
        // A zero-sized buffer would make every read look like EOF.
        if options.buffer_size == 0 {
            options.buffer_size = DEFAULT_BUFFER_SIZE;
        }
        let buffer = vec![0u8; options.buffer_size];
        CopyEngine { options, buffer }
    }

    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Copy `sources` under `dest_root`.
    ///
    /// Emits one record per enumerated item to the sink, in enumeration
    /// order, followed by the run summary. Only configuration-level
    /// failures return Err; everything else is captured per item and the
    /// run proceeds to completion.
    pub fn run(
        &mut self,
        sources: &[PathBuf],
        dest_root: &Path,
        sink: &mut dyn ResultSink,
    ) -> Result<RunSummary, EngineError> {
        fs::create_dir_all(dest_root).map_err(|e| EngineError::DestinationUnwritable {
            path: dest_root.to_path_buf(),
            source: e,
        })?;

        let items = planner::plan(sources, dest_root);
        let run_id = Uuid::new_v4();
        let total_bytes = items
            .iter()
            .map(|item| match item.kind {
                EntryKind::File { size } => size,
                _ => 0,
            })
            .sum();
        sink.on_run_started(&RunInfo {
            run_id,
            dest_root: dest_root.to_path_buf(),
            items: items.len(),
            total_bytes,
        });

        let mut summary = RunSummary::new(run_id, items.len());
        for item in &items {
            let record = self.process(item);
            summary.absorb(item.kind, &record);
            sink.on_result(&record);
        }
        summary.finished = Some(SystemTime::now());
        sink.on_run_completed(&summary);
        Ok(summary)
    }

    /// Process one WorkItem and produce its record.
    pub fn process(&mut self, item: &WorkItem) -> ResultRecord {
        match item.kind {
            EntryKind::File { .. } => self.process_file(item),
            EntryKind::Dir => self.process_dir(item),
            EntryKind::Other => {
                let mut record = ResultRecord::for_item(item);
                record.error = Some(ItemError::UnsupportedEntry {
                    path: item.source_path.clone(),
                });
                record
            }
        }
    }

    fn process_file(&mut self, item: &WorkItem) -> ResultRecord {
        let mut record = ResultRecord::for_item(item);

        let mut src = match File::open(&item.source_path) {
            Ok(file) => file,
            Err(e) => {
                record.error = Some(ItemError::OpenFailed {
                    path: item.source_path.clone(),
                    source: e,
                });
                return record;
            }
        };
        let src_mtime = src.metadata().ok().and_then(|m| m.modified().ok());

        let mut dst = match File::create(&item.dest_path) {
            Ok(file) => file,
            Err(e) => {
                record.error = Some(ItemError::OpenFailed {
                    path: item.dest_path.clone(),
                    source: e,
                });
                return record;
            }
        };

        // Copy and hash share one pass over the data: each chunk is
        // written to the destination and fed to every enabled digest
        // before the next read.
        let mut digests = DigestSet::new(self.options.algorithms);
        let mut written: u64 = 0;
        loop {
            let n = match src.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    drop(dst);
                    Self::discard_partial(&item.dest_path);
                    record.error = Some(ItemError::ReadFailed {
                        path: item.source_path.clone(),
                        source: e,
                    });
                    return record;
                }
            };
            if let Err(e) = dst.write_all(&self.buffer[..n]) {
                drop(dst);
                Self::discard_partial(&item.dest_path);
                record.error = Some(ItemError::WriteFailed {
                    path: item.dest_path.clone(),
                    source: e,
                });
                return record;
            }
            digests.update(&self.buffer[..n]);
            written += n as u64;
        }
        drop(dst);

        record.size_bytes = written;
        record.digests = digests.finalize();
        record.change = self.classify(&item.rel_path, &record.digests);

        if let Some(mtime) = src_mtime {
            let _ = filetime::set_file_mtime(
                &item.dest_path,
                filetime::FileTime::from_system_time(mtime),
            );
        }
        self.apply_ownership(&item.dest_path, &mut record);
        record
    }

    fn process_dir(&mut self, item: &WorkItem) -> ResultRecord {
        let mut record = ResultRecord::for_item(item);
        if let Err(e) = fs::create_dir_all(&item.dest_path) {
            record.error = Some(ItemError::CreateDirFailed {
                path: item.dest_path.clone(),
                source: e,
            });
            return record;
        }
        self.apply_ownership(&item.dest_path, &mut record);
        record
    }

    fn classify(&self, rel_path: &Path, digests: &[DigestRecord]) -> ChangeStatus {
        let Some(index) = self.options.index.as_ref() else {
            return ChangeStatus::Unknown;
        };
        let Some(primary) = self.options.algorithms.primary() else {
            return ChangeStatus::Unknown;
        };
        let Some(computed) = digests.iter().find(|d| d.algorithm() == primary) else {
            return ChangeStatus::Unknown;
        };
        match index.lookup(rel_path, primary) {
            None => ChangeStatus::New,
            Some(prior) if prior == computed.hex() => ChangeStatus::Unchanged,
            Some(_) => ChangeStatus::Changed,
        }
    }

    /// Ownership failure is a warning on the record; the copy stands.
    fn apply_ownership(&self, path: &Path, record: &mut ResultRecord) {
        let owner = unsafe { rustix::fs::Uid::from_raw(self.options.uid) };
        let group = unsafe { rustix::fs::Gid::from_raw(self.options.gid) };
        if let Err(e) = rustix::fs::chown(path, Some(owner), Some(group)) {
            record.warning = Some(format!(
                "ownership {}:{} not applied: {}",
                self.options.uid, self.options.gid, e
            ));
        }
    }

    /// A half-written destination must not be left looking complete.
    fn discard_partial(path: &Path) {
        let _ = fs::remove_file(path);
    }
}
