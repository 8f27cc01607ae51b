//! Change-detection index built from prior-run result files.
//!
//! The index maps a relative path to the digests recorded for it on a
//! previous run. It is populated once before any copy begins and is
//! read-only for the rest of the run.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::digest::{Algorithm, AlgorithmSet};
use crate::error::EngineError;
use crate::report;

/// In-memory record of previously computed digests per relative path.
#[derive(Debug)]
pub struct Index {
    entries: HashMap<PathBuf, BTreeMap<Algorithm, String>>,
}

impl Index {
    /// Build an index from prior result files, in order.
    ///
    /// Files are parsed line-by-line; lines that are not entry lines
    /// (metadata headers, blanks, malformed history) are skipped, never
    /// fatal. Entries from later files override earlier ones for the same
    /// (path, algorithm). A file that cannot be read at all is fatal, as
    /// is ending up with no entries.
    pub fn build(paths: &[PathBuf]) -> Result<Index, EngineError> {
        let mut entries: HashMap<PathBuf, BTreeMap<Algorithm, String>> = HashMap::new();

        for path in paths {
            let file = File::open(path).map_err(|e| EngineError::IndexRead {
                path: path.clone(),
                source: e,
            })?;
            for line in BufReader::new(file).lines() {
                let line = line.map_err(|e| EngineError::IndexRead {
                    path: path.clone(),
                    source: e,
                })?;
                if let Some((algorithm, hex, rel_path)) = report::parse_entry(&line) {
                    entries.entry(rel_path).or_default().insert(algorithm, hex);
                }
            }
        }

        if entries.is_empty() {
            return Err(EngineError::EmptyIndex);
        }
        Ok(Index { entries })
    }

    /// Previously recorded digest for a path under one algorithm.
    pub fn lookup(&self, rel_path: &Path, algorithm: Algorithm) -> Option<&str> {
        self.entries
            .get(rel_path)
            .and_then(|digests| digests.get(&algorithm))
            .map(String::as_str)
    }

    /// Number of indexed paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Discover which algorithms a set of result files recorded, without
/// building a full index.
///
/// Prefers each file's `digests` header line; when a file has none, the
/// algorithms seen on its entry lines are used instead. Used to make a
/// re-verification run compute the same digests the original run recorded.
pub fn peek_algorithms(paths: &[PathBuf]) -> Result<AlgorithmSet, EngineError> {
    let mut set = AlgorithmSet::empty();

    for path in paths {
        let file = File::open(path).map_err(|e| EngineError::IndexRead {
            path: path.clone(),
            source: e,
        })?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| EngineError::IndexRead {
                path: path.clone(),
                source: e,
            })?;
            if let Some(algorithms) = report::parse_digests_line(&line) {
                for algorithm in algorithms {
                    set.insert(algorithm);
                }
                break;
            }
            if let Some((algorithm, _, _)) = report::parse_entry(&line) {
                set.insert(algorithm);
            }
        }
    }

    if set.is_empty() {
        return Err(EngineError::NoRecordedDigests);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_result_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).expect("Failed to create result file");
        file.write_all(contents.as_bytes())
            .expect("Failed to write result file");
        path
    }

    #[test]
    fn test_build_skips_metadata_and_garbage() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_result_file(
            temp_dir.path(),
            "run.out",
            "File generated by dcp DO NOT EDIT\n\
             version     0.1.0\n\
             digests     md5\n\
             \n\
             md5 5d41402abc4b2a76b9719d911017c592 a.txt\n\
             this line is not an entry\n\
             md5 deadbeef a.txt\n",
        );

        let index = Index::build(&[path]).expect("Failed to build index");
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.lookup(Path::new("a.txt"), Algorithm::Md5),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
    }

    #[test]
    fn test_build_last_writer_wins_across_files() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let first = write_result_file(
            temp_dir.path(),
            "first.out",
            &format!("md5 {} a.txt\nmd5 {} b.txt\n", "1".repeat(32), "2".repeat(32)),
        );
        let second = write_result_file(
            temp_dir.path(),
            "second.out",
            &format!("md5 {} a.txt\n", "3".repeat(32)),
        );

        let index = Index::build(&[first, second]).expect("Failed to build index");
        assert_eq!(
            index.lookup(Path::new("a.txt"), Algorithm::Md5).unwrap(),
            "3".repeat(32)
        );
        assert_eq!(
            index.lookup(Path::new("b.txt"), Algorithm::Md5).unwrap(),
            "2".repeat(32)
        );
    }

    #[test]
    fn test_build_with_no_entries_is_empty_index() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_result_file(temp_dir.path(), "run.out", "just a header\nand noise\n");

        let result = Index::build(&[path]);
        assert!(matches!(result, Err(EngineError::EmptyIndex)));
    }

    #[test]
    fn test_build_with_unreadable_file_is_fatal() {
        let result = Index::build(&[PathBuf::from("/nonexistent/run.out")]);
        assert!(matches!(result, Err(EngineError::IndexRead { .. })));
    }

    #[test]
    fn test_lookup_miss() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_result_file(
            temp_dir.path(),
            "run.out",
            &format!("md5 {} a.txt\n", "1".repeat(32)),
        );

        let index = Index::build(&[path]).expect("Failed to build index");
        assert_eq!(index.lookup(Path::new("missing.txt"), Algorithm::Md5), None);
        assert_eq!(index.lookup(Path::new("a.txt"), Algorithm::Sha256), None);
    }

    #[test]
    fn test_peek_prefers_digests_header() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_result_file(
            temp_dir.path(),
            "run.out",
            "digests     sha1, sha512\n",
        );

        let set = peek_algorithms(&[path]).expect("Failed to peek");
        assert!(set.contains(Algorithm::Sha1));
        assert!(set.contains(Algorithm::Sha512));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_peek_falls_back_to_entry_lines() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_result_file(
            temp_dir.path(),
            "run.out",
            &format!("some header\nsha256 {} a.txt\n", "a".repeat(64)),
        );

        let set = peek_algorithms(&[path]).expect("Failed to peek");
        assert!(set.contains(Algorithm::Sha256));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_peek_with_no_recorded_digests_is_fatal() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_result_file(temp_dir.path(), "run.out", "nothing here\n");

        let result = peek_algorithms(&[path]);
        assert!(matches!(result, Err(EngineError::NoRecordedDigests)));
    }
}
