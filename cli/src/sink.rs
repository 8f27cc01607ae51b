//! The command-line result sink.
//!
//! Writes the metadata header and one entry line per (file, algorithm) to
//! the output stream, and reports progress and the final summary on
//! stderr.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use engine::{report, AlgorithmSet, ResultRecord, ResultSink, RunInfo, RunSummary};

/// Everything the metadata header records about a run.
pub struct RunMetadata {
    pub version: String,
    pub command: String,
    pub digests: AlgorithmSet,
    pub host: String,
    pub cwd: Option<PathBuf>,
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
    pub output: PathBuf,
    pub owner: Option<String>,
    pub group: Option<String>,
}

/// Sink writing entry lines to the output file and progress to stderr.
pub struct CliSink {
    out: File,
    verbose: bool,
    metadata: RunMetadata,
    start_time: Instant,
    seen: usize,
}

impl CliSink {
    pub fn new(out: File, verbose: bool, metadata: RunMetadata) -> Self {
        CliSink {
            out,
            verbose,
            metadata,
            start_time: Instant::now(),
            seen: 0,
        }
    }

    fn write_header(&mut self, info: &RunInfo) -> io::Result<()> {
        let display = |path: &PathBuf| path.display().to_string();

        report::write_banner(&mut self.out)?;
        report::write_value(&mut self.out, "version", &self.metadata.version)?;
        report::write_value(&mut self.out, "timestamp", &Local::now().to_rfc2822())?;
        report::write_value(&mut self.out, "command", &self.metadata.command)?;
        report::write_value(&mut self.out, "digests", &self.metadata.digests.to_string())?;
        report::write_value(&mut self.out, "host", &self.metadata.host)?;
        report::write_value(&mut self.out, "run_id", &info.run_id.to_string())?;
        if let Some(cwd) = &self.metadata.cwd {
            report::write_json(&mut self.out, "cwd", &[display(cwd)])?;
        }
        let sources: Vec<String> = self.metadata.sources.iter().map(display).collect();
        report::write_json(&mut self.out, "sources", &sources)?;
        report::write_json(&mut self.out, "destination", &[display(&self.metadata.destination)])?;
        report::write_json(&mut self.out, "output", &[display(&self.metadata.output)])?;
        if let Some(owner) = &self.metadata.owner {
            report::write_value(&mut self.out, "data_owner", owner)?;
        }
        if let Some(group) = &self.metadata.group {
            report::write_value(&mut self.out, "data_group", group)?;
        }
        report::write_blank(&mut self.out)
    }

    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }

    fn format_duration(elapsed: std::time::Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }

    fn status_word(record: &ResultRecord) -> &'static str {
        if record.is_failure() {
            "failed"
        } else if record.digests.is_empty() {
            "dir"
        } else {
            "copied"
        }
    }
}

impl ResultSink for CliSink {
    fn on_run_started(&mut self, info: &RunInfo) {
        if let Err(e) = self.write_header(info) {
            eprintln!("dcp: cannot write result header: {}", e);
        }
        eprintln!(
            "Copying {} items ({}) to {}",
            info.items,
            Self::format_bytes(info.total_bytes),
            self.metadata.destination.display()
        );
    }

    fn on_result(&mut self, record: &ResultRecord) {
        let index = self.seen;
        self.seen += 1;

        for digest in &record.digests {
            let line = report::format_entry(digest.algorithm(), digest.hex(), &record.rel_path);
            if let Err(e) = writeln!(self.out, "{}", line) {
                eprintln!("dcp: cannot write result entry: {}", e);
            }
        }

        if let Some(error) = &record.error {
            eprintln!("dcp: {}", error);
        }
        if let Some(warning) = &record.warning {
            eprintln!("dcp: warning: {}: {}", record.dest_path.display(), warning);
        }
        if self.verbose {
            eprintln!(
                "[{:3}] {} {} ({})",
                index,
                Self::status_word(record),
                record.rel_path.display(),
                record.change
            );
        }
    }

    fn on_run_completed(&mut self, summary: &RunSummary) {
        if let Err(e) = self.out.flush() {
            eprintln!("dcp: cannot flush result file: {}", e);
        }

        let elapsed = self.start_time.elapsed();
        eprintln!();
        eprintln!(
            "Summary: {} copied, {} directories, {} failed, {} warnings",
            summary.files_copied,
            summary.dirs_created,
            summary.failed(),
            summary.warnings
        );
        if summary.new_files + summary.unchanged_files + summary.changed_files > 0 {
            eprintln!(
                "Changes: {} new, {} changed, {} unchanged",
                summary.new_files, summary.changed_files, summary.unchanged_files
            );
        }
        eprintln!("Bytes copied: {}", Self::format_bytes(summary.bytes_copied));
        eprintln!("Elapsed: {}", Self::format_duration(elapsed));
    }
}
