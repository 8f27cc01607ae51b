//! The result-file format.
//!
//! A result file mixes a metadata header with entry lines:
//!
//! ```text
//! File generated by dcp DO NOT EDIT
//! version     0.1.0
//! timestamp   Thu, 07 Aug 2026 11:52:00 +0000
//! digests     md5, sha256
//! sources     ["photos"]
//!
//! md5 9e107d9d372bb6826bd81d3542a419d6 photos/a.jpg
//! sha256 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824 photos/a.jpg
//! ```
//!
//! An entry line is `<algorithm> <hex> <relative-path>`, one per
//! (file, algorithm). The parsing side is a tolerant line classifier:
//! anything that is not a well-formed entry line is skipped, so metadata
//! headers and malformed historical lines never abort index construction.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::digest::Algorithm;

/// First line of every result file.
pub const BANNER: &str = "File generated by dcp DO NOT EDIT";

/// Metadata key announcing the digest set; `peek_algorithms` reads it back.
pub const DIGESTS_KEY: &str = "digests";

/// Format one entry line.
pub fn format_entry(algorithm: Algorithm, hex: &str, rel_path: &Path) -> String {
    format!("{} {} {}", algorithm, hex, rel_path.display())
}

/// Classify one line. Returns the entry it carries, or None for metadata
/// lines, blanks, and anything else that is not a well-formed entry line.
pub fn parse_entry(line: &str) -> Option<(Algorithm, String, PathBuf)> {
    let mut parts = line.trim_end().splitn(3, ' ');
    let algorithm = Algorithm::from_str(parts.next()?)?;
    let hex = parts.next()?;
    let rel_path = parts.next()?.trim_start();
    if hex.len() != algorithm.hex_len() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if rel_path.is_empty() {
        return None;
    }
    Some((algorithm, hex.to_ascii_lowercase(), PathBuf::from(rel_path)))
}

/// Parse a `digests` metadata line into the algorithms it names.
pub fn parse_digests_line(line: &str) -> Option<Vec<Algorithm>> {
    let rest = line.strip_prefix(DIGESTS_KEY)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut algorithms = Vec::new();
    for name in rest.split(',') {
        algorithms.push(Algorithm::from_str(name.trim())?);
    }
    if algorithms.is_empty() {
        return None;
    }
    Some(algorithms)
}

/// Write the banner line.
pub fn write_banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", BANNER)
}

/// Write one aligned `key value` metadata line.
pub fn write_value<W: Write>(out: &mut W, key: &str, value: &str) -> io::Result<()> {
    writeln!(out, "{:<11} {}", key, value)
}

/// Write a metadata line whose value is a JSON array of strings, so values
/// containing spaces or quotes stay unambiguous.
pub fn write_json<W: Write>(out: &mut W, key: &str, values: &[String]) -> io::Result<()> {
    let encoded = serde_json::to_string(values).unwrap_or_else(|_| String::from("[]"));
    writeln!(out, "{:<11} {}", key, encoded)
}

/// Blank separator between the header and the entry lines.
pub fn write_blank<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_round_trip() {
        let line = format_entry(
            Algorithm::Md5,
            "5d41402abc4b2a76b9719d911017c592",
            Path::new("dir/file.txt"),
        );
        let (algorithm, hex, rel_path) = parse_entry(&line).expect("entry should parse");
        assert_eq!(algorithm, Algorithm::Md5);
        assert_eq!(hex, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(rel_path, PathBuf::from("dir/file.txt"));
    }

    #[test]
    fn test_entry_path_may_contain_spaces() {
        let line = format_entry(
            Algorithm::Md5,
            "5d41402abc4b2a76b9719d911017c592",
            Path::new("my docs/file one.txt"),
        );
        let (_, _, rel_path) = parse_entry(&line).expect("entry should parse");
        assert_eq!(rel_path, PathBuf::from("my docs/file one.txt"));
    }

    #[test]
    fn test_metadata_lines_are_not_entries() {
        assert!(parse_entry(BANNER).is_none());
        assert!(parse_entry("version     0.1.0").is_none());
        assert!(parse_entry("digests     md5, sha256").is_none());
        assert!(parse_entry("").is_none());
    }

    #[test]
    fn test_entry_rejects_wrong_hex_width() {
        // md5 hex with sha256's width
        let line = format!("md5 {} file.txt", "a".repeat(64));
        assert!(parse_entry(&line).is_none());
        let line = format!("md5 {} file.txt", "a".repeat(32));
        assert!(parse_entry(&line).is_some());
    }

    #[test]
    fn test_entry_rejects_non_hex() {
        let line = format!("md5 {} file.txt", "z".repeat(32));
        assert!(parse_entry(&line).is_none());
    }

    #[test]
    fn test_entry_hex_is_lowercased() {
        let line = format!("md5 {} file.txt", "A".repeat(32));
        let (_, hex, _) = parse_entry(&line).expect("entry should parse");
        assert_eq!(hex, "a".repeat(32));
    }

    #[test]
    fn test_parse_digests_line() {
        let algorithms = parse_digests_line("digests     md5, sha256").unwrap();
        assert_eq!(algorithms, vec![Algorithm::Md5, Algorithm::Sha256]);
        assert!(parse_digests_line("digests").is_none());
        assert!(parse_digests_line("digestsmd5").is_none());
        assert!(parse_digests_line("version     0.1.0").is_none());
    }

    #[test]
    fn test_write_value_alignment() {
        let mut out = Vec::new();
        write_value(&mut out, "version", "0.1.0").unwrap();
        write_value(&mut out, "destination", "backup").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "version     0.1.0\ndestination backup\n");
    }

    #[test]
    fn test_write_json_quotes_values() {
        let mut out = Vec::new();
        write_json(&mut out, "sources", &[String::from("my docs")]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "sources     [\"my docs\"]\n");
    }
}
