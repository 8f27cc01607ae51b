//! Source enumeration.
//!
//! Expands the source operands into the ordered WorkItem sequence: a file
//! becomes one item, a directory is walked depth-first with parents before
//! children, and everything else (symbolic links, devices, sockets) is
//! classified as unsupported. Children are visited in file-name order so
//! the sequence is a deterministic function of the inputs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{EntryKind, WorkItem};

/// Enumerate the WorkItems for a run.
///
/// Destination paths are the source's basename chain re-rooted under
/// `dest_root`; directory structure is preserved exactly. Entries that
/// cannot be classified are planned as files so the engine reports the
/// failure on exactly that item, and enumeration of siblings continues.
pub fn plan(sources: &[PathBuf], dest_root: &Path) -> Vec<WorkItem> {
    let mut items = Vec::new();
    for source in sources {
        plan_source(source, dest_root, &mut items);
    }
    items
}

fn plan_source(source: &Path, dest_root: &Path, items: &mut Vec<WorkItem>) {
    let rel_path = basename(source);
    let kind = match fs::symlink_metadata(source) {
        Ok(meta) if meta.file_type().is_symlink() => EntryKind::Other,
        Ok(meta) if meta.is_dir() => EntryKind::Dir,
        Ok(meta) if meta.is_file() => EntryKind::File { size: meta.len() },
        Ok(_) => EntryKind::Other,
        // Unreadable sources become zero-size files so processing surfaces
        // an open failure on this one item.
        Err(_) => EntryKind::File { size: 0 },
    };

    items.push(WorkItem {
        source_path: source.to_path_buf(),
        dest_path: dest_root.join(&rel_path),
        rel_path: rel_path.clone(),
        kind,
    });
    if kind == EntryKind::Dir {
        descend(source, &rel_path, dest_root, items);
    }
}

fn descend(dir: &Path, rel: &Path, dest_root: &Path, items: &mut Vec<WorkItem>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // The directory item itself is already planned; siblings continue.
        Err(_) => return,
    };

    let mut children: Vec<fs::DirEntry> = entries.filter_map(Result::ok).collect();
    children.sort_by_key(|entry| entry.file_name());

    for child in children {
        let child_path = child.path();
        let child_rel = rel.join(child.file_name());
        let kind = match child.file_type() {
            Ok(t) if t.is_symlink() => EntryKind::Other,
            Ok(t) if t.is_dir() => EntryKind::Dir,
            Ok(t) if t.is_file() => EntryKind::File {
                size: child.metadata().map(|m| m.len()).unwrap_or(0),
            },
            Ok(_) => EntryKind::Other,
            Err(_) => EntryKind::File { size: 0 },
        };

        items.push(WorkItem {
            source_path: child_path.clone(),
            dest_path: dest_root.join(&child_rel),
            rel_path: child_rel.clone(),
            kind,
        });
        if kind == EntryKind::Dir {
            descend(&child_path, &child_rel, dest_root, items);
        }
    }
}

fn basename(path: &Path) -> PathBuf {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
}
