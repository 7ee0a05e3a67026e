//! Discover file suffixes per participant code.
//!
//! Recordings and transcripts are named `<code>_<suffix>.<ext>`, e.g.
//! `DEbi01MR_fsD.wav`. Walking a directory tree yields, for every code,
//! the set of suffixes that have a file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{ScanError, ScanResult};
use crate::models::CodePattern;

/// Suffix tokens found per code.
pub type SuffixIndex = BTreeMap<String, BTreeSet<String>>;

/// Whether a file name takes part in the suffix scan.
///
/// It must contain `_` and start with a valid code followed by `_`.
pub fn is_candidate(file_name: &str, pattern: &CodePattern) -> bool {
    match file_name.split_once('_') {
        Some((code, _)) => pattern.is_match(code),
        None => false,
    }
}

/// Split a candidate file name into `(code, suffix)`.
///
/// The name must split on `_` and `.` into exactly three tokens.
pub fn split_file_name<'a>(file_name: &'a str, path: &Path) -> ScanResult<(&'a str, &'a str)> {
    let tokens: Vec<&str> = file_name.split(['_', '.']).collect();
    match tokens.as_slice() {
        [code, suffix, _extension] => Ok((*code, *suffix)),
        _ => Err(ScanError::MalformedName {
            name: file_name.to_string(),
            path: path.to_path_buf(),
            tokens: tokens.len(),
        }),
    }
}

/// Walk `root` recursively and collect suffixes of candidate files.
///
/// Symlinks are followed, so linked recordings count like regular files.
/// An unreadable root is fatal; unreadable entries below it, broken links
/// and link loops are skipped with a warning.
pub fn scan_suffixes(root: &Path, pattern: &CodePattern) -> ScanResult<SuffixIndex> {
    let mut index = SuffixIndex::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ScanError::Walk {
                    path: e.path().unwrap_or(root).to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!(
                    path = %e.path().unwrap_or(root).display(),
                    error = %e,
                    "Skipping unreadable entry"
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_candidate(name, pattern) {
            continue;
        }

        let (code, suffix) = split_file_name(name, entry.path())?;
        debug!(path = %entry.path().display(), code, suffix, "Found suffix");
        index
            .entry(code.to_string())
            .or_default()
            .insert(suffix.to_string());
    }

    debug!(codes = index.len(), root = %root.display(), "Scanned file suffixes");
    Ok(index)
}
