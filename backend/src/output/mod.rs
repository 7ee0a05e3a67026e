//! `.meta` file output.
//!
//! One file per (code, suffix): the code's core entries sorted
//! lexicographically, then the six supplementary entries decoded from the
//! suffix, one `key=value` per line.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{WriteError, WriteResult};
use crate::models::{entry_line, MetadataSet};
use crate::scan::SuffixIndex;
use crate::transform::suffix::decode_suffix;

/// Platform line separator used inside `.meta` files.
pub const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Extension of generated files.
pub const META_EXTENSION: &str = "meta";

/// What [`write_meta_files`] produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteSummary {
    /// Paths written, in (code, suffix) order.
    pub files: Vec<PathBuf>,
    /// Validated codes for which no suffix was found.
    pub codes_without_suffix: Vec<String>,
}

/// `<code>_<suffix>.meta`
pub fn meta_file_name(code: &str, suffix: &str) -> String {
    format!("{code}_{suffix}.{META_EXTENSION}")
}

/// Full contents of one `.meta` file, trailing separator included.
pub fn compose_meta(metadata: &MetadataSet, code: &str, suffix: &str) -> String {
    let mut lines = metadata.sorted_lines();
    lines.extend(
        decode_suffix(suffix, Some(code))
            .into_iter()
            .map(|(field, value)| entry_line(field, &value)),
    );
    lines.push(String::new());
    lines.join(LINE_SEPARATOR)
}

/// Check, without touching the disk, that `dir` can serve as target.
///
/// It must be a directory already or have an existing parent.
pub fn check_target_dir(dir: &Path) -> WriteResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(WriteError::NotADirectory(dir.to_path_buf()));
    }
    match dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) if !parent.is_dir() => Err(WriteError::CreateDir {
            path: dir.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("parent '{}' is not a directory", parent.display()),
            ),
        }),
        _ => Ok(()),
    }
}

/// Make sure `dir` is a directory, creating it (but not its parents).
pub fn prepare_target_dir(dir: &Path) -> WriteResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(WriteError::NotADirectory(dir.to_path_buf()));
    }
    fs::create_dir(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    info!(path = %dir.display(), "Created target directory");
    Ok(())
}

/// Write one file per (code, suffix) into `target_dir`, overwriting.
pub fn write_meta_files(
    target_dir: &Path,
    groups: &BTreeMap<String, MetadataSet>,
    suffixes: &SuffixIndex,
) -> WriteResult<WriteSummary> {
    prepare_target_dir(target_dir)?;

    let mut summary = WriteSummary::default();
    for (code, metadata) in groups {
        let Some(code_suffixes) = suffixes.get(code).filter(|s| !s.is_empty()) else {
            debug!(code, "No file suffix found, nothing written");
            summary.codes_without_suffix.push(code.clone());
            continue;
        };
        for suffix in code_suffixes {
            let path = target_dir.join(meta_file_name(code, suffix));
            fs::write(&path, compose_meta(metadata, code, suffix)).map_err(|source| {
                WriteError::Io {
                    path: path.clone(),
                    source,
                }
            })?;
            debug!(path = %path.display(), "Wrote meta file");
            summary.files.push(path);
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn metadata() -> MetadataSet {
        let mut set = MetadataSet::new();
        set.insert("speaker-id", "DEbi01MR");
        set.insert("speaker-age", "30");
        set.insert("speaker-age-group", "adult");
        set
    }

    fn suffixes(code: &str, list: &[&str]) -> SuffixIndex {
        let mut index = SuffixIndex::new();
        index.insert(
            code.to_string(),
            list.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        );
        index
    }

    #[test]
    fn test_compose_meta() {
        let content = compose_meta(&metadata(), "DEbi01MR", "fwE");
        let lines: Vec<&str> = content.split(LINE_SEPARATOR).collect();
        assert_eq!(
            lines,
            vec![
                "speaker-age-group=adult",
                "speaker-age=30",
                "speaker-id=DEbi01MR",
                "formality=formal",
                "mode=written",
                "elicitation-order=<NO VALUE>",
                "elicitation-language=English",
                "transcriber-id=<NO VALUE>",
                "elicitator-id=<NO VALUE>",
                "",
            ]
        );
        assert!(content.ends_with(LINE_SEPARATOR));
    }

    #[test]
    fn test_one_file_per_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut groups = BTreeMap::new();
        groups.insert("DEbi01MR".to_string(), metadata());

        let summary =
            write_meta_files(dir.path(), &groups, &suffixes("DEbi01MR", &["is3", "fw4"])).unwrap();

        assert_eq!(summary.files.len(), 2);
        let is3 = fs::read_to_string(dir.path().join("DEbi01MR_is3.meta")).unwrap();
        let fw4 = fs::read_to_string(dir.path().join("DEbi01MR_fw4.meta")).unwrap();
        let core = |s: &str| s.lines().take(3).map(String::from).collect::<Vec<_>>();
        assert_eq!(core(is3.as_str()), core(fw4.as_str()));
        assert!(is3.contains("formality=informal"));
        assert!(fw4.contains("formality=formal"));
    }

    #[test]
    fn test_code_without_suffix_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut groups = BTreeMap::new();
        groups.insert("DEbi01MR".to_string(), metadata());

        let summary = write_meta_files(dir.path(), &groups, &SuffixIndex::new()).unwrap();

        assert!(summary.files.is_empty());
        assert_eq!(summary.codes_without_suffix, vec!["DEbi01MR"]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_existing_file_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DEbi01MR_isD.meta");
        fs::write(&path, "stale").unwrap();
        let mut groups = BTreeMap::new();
        groups.insert("DEbi01MR".to_string(), metadata());

        write_meta_files(dir.path(), &groups, &suffixes("DEbi01MR", &["isD"])).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert!(content.contains("elicitation-language=German"));
    }

    #[test]
    fn test_target_dir_created_non_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("meta");
        prepare_target_dir(&target).unwrap();
        assert!(target.is_dir());

        let deep = dir.path().join("a").join("b");
        assert!(matches!(
            prepare_target_dir(&deep),
            Err(WriteError::CreateDir { .. })
        ));
    }

    #[test]
    fn test_check_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_target_dir(dir.path()).is_ok());
        assert!(check_target_dir(&dir.path().join("new")).is_ok());
        assert!(!dir.path().join("new").exists());
        assert!(matches!(
            check_target_dir(&dir.path().join("a").join("b")),
            Err(WriteError::CreateDir { .. })
        ));
    }

    #[test]
    fn test_target_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("meta");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            prepare_target_dir(&file),
            Err(WriteError::NotADirectory(_))
        ));
    }
}
