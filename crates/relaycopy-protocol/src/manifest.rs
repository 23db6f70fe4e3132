//! Manifest construction: expanding filesystem paths into the ordered
//! list of `(relative path, size)` entries the sender transmits.
//!
//! Directory walking itself is an external collaborator per the spec;
//! this module only defines the shape and ordering contract so the
//! CLI layer has something concrete to call.

use crate::wire::messages::ManifestEntry;
use std::path::{Path, PathBuf};

/// A manifest entry paired with the local path it reads from. The
/// wire only ever sees the [`ManifestEntry`] half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub source: PathBuf,
    pub entry: ManifestEntry,
}

/// Walk `inputs` (files and/or directories) into manifest entries.
///
/// A file path `foo.txt` yields one entry `(basename, size)`. A
/// directory path yields one entry per regular file underneath, with
/// the path `basename/relative/path`, lexicographically sorted by
/// path so transfer order is deterministic.
pub fn build(inputs: &[PathBuf]) -> std::io::Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();
    for input in inputs {
        let basename = top_level_name(input);
        let metadata = std::fs::metadata(input)?;
        if metadata.is_dir() {
            walk_dir(input, &basename, &mut entries)?;
        } else {
            entries.push(SourceEntry {
                source: input.clone(),
                entry: ManifestEntry {
                    path: basename,
                    size: metadata.len(),
                },
            });
        }
    }
    entries.sort_by(|a, b| a.entry.path.cmp(&b.entry.path));
    Ok(entries)
}

fn top_level_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn walk_dir(dir: &Path, prefix: &str, out: &mut Vec<SourceEntry>) -> std::io::Result<()> {
    let mut stack = vec![(dir.to_path_buf(), prefix.to_string())];
    while let Some((current, current_prefix)) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = format!("{current_prefix}/{name}");
            if file_type.is_dir() {
                stack.push((path.clone(), rel));
            } else if file_type.is_file() {
                let size = entry.metadata()?.len();
                out.push(SourceEntry {
                    source: path,
                    entry: ManifestEntry { path: rel, size },
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn single_file_yields_basename_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("greeting.txt");
        std::fs::File::create(&file_path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();

        let entries = build(&[file_path.clone()]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry.path, "greeting.txt");
        assert_eq!(entries[0].entry.size, 5);
        assert_eq!(entries[0].source, file_path);
    }

    #[test]
    fn directory_yields_prefixed_nested_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("README.md"), b"readme").unwrap();
        std::fs::write(root.join("src/main.rs"), b"fn main() {}").unwrap();

        let entries = build(&[root]).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.entry.path.as_str()).collect();
        assert_eq!(paths, vec!["project/README.md", "project/src/main.rs"]);
    }

    #[test]
    fn empty_directory_yields_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("empty");
        std::fs::create_dir_all(&root).unwrap();

        let entries = build(&[root]).unwrap();
        assert!(entries.is_empty());
    }
}
