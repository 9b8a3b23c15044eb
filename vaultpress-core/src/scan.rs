//! Corpus discovery: walk the vault and load every eligible note.

use crate::config::normalize_separators;
use crate::note::{Note, NoteContext};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of note files
pub const NOTE_EXTENSION: &str = ".md";

/// All loaded notes in walk order, plus the published subset
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub(crate) notes: Vec<Note>,
    pub(crate) published: Vec<usize>,
    pub(crate) resolved: bool,
}

impl Corpus {
    pub fn new(notes: Vec<Note>) -> Self {
        let published = notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.published)
            .map(|(idx, _)| idx)
            .collect();
        Self {
            notes,
            published,
            resolved: false,
        }
    }

    /// Every note, published or not, in walk order
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Published notes in walk order
    pub fn published(&self) -> impl Iterator<Item = &Note> {
        self.published.iter().map(|&idx| &self.notes[idx])
    }

    pub fn published_count(&self) -> usize {
        self.published.len()
    }

    /// Whether cross-references have already been resolved
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Find a note by vault-relative path
    pub fn find_by_path(&self, rel_path: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.rel_path == rel_path)
    }
}

/// Why a scan stopped before the walk finished
#[derive(Debug, Clone, Serialize)]
pub struct ScanInterruption {
    /// 1-based position of the failing note in walk order
    pub index: usize,
    pub path: PathBuf,
    pub error: String,
}

/// Result of walking the vault
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub corpus: Corpus,
    /// Set when a note failed to load; the corpus then holds only earlier notes
    pub interruption: Option<ScanInterruption>,
    /// Directory entries the walk could not read
    pub walk_errors: Vec<String>,
    /// Display names shared by more than one note
    pub duplicate_names: Vec<String>,
}

impl Scan {
    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }
}

/// Walk `cx.vault_root` in file-name order and load every eligible note.
///
/// A file is skipped unless it ends in `.md` and none of `exclusions` occurs in
/// its path. The first note that fails to load stops the walk.
pub fn scan(cx: &NoteContext<'_>, exclusions: &[String]) -> Scan {
    let mut notes = Vec::new();
    let mut walk_errors = Vec::new();
    let mut interruption = None;
    let mut first_by_name: HashMap<String, PathBuf> = HashMap::new();
    let mut duplicate_names = Vec::new();
    let mut note_index = 0;

    for entry in WalkDir::new(cx.vault_root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Skipping unreadable vault entry: {}", err);
                walk_errors.push(err.to_string());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if is_excluded(path, exclusions) {
            tracing::debug!("Excluded {:?}", path);
            continue;
        }

        note_index += 1;
        tracing::info!("Processing note: {} {}", note_index, path.display());

        let note = match Note::load(path, cx) {
            Ok(note) => note,
            Err(err) => {
                tracing::error!(
                    "Scan stopped at note {} {}: {}",
                    note_index,
                    path.display(),
                    err
                );
                interruption = Some(ScanInterruption {
                    index: note_index,
                    path: path.to_path_buf(),
                    error: err.to_string(),
                });
                break;
            }
        };

        if let Some(first) = first_by_name.get(&note.name) {
            tracing::warn!(
                "Duplicate note name '{}': {:?} shadows {:?} for name links",
                note.name,
                first,
                path
            );
            if !duplicate_names.contains(&note.name) {
                duplicate_names.push(note.name.clone());
            }
        } else {
            first_by_name.insert(note.name.clone(), path.to_path_buf());
        }

        if note.published {
            tracing::info!("Shared note: {}", path.display());
        }
        notes.push(note);
    }

    Scan {
        corpus: Corpus::new(notes),
        interruption,
        walk_errors,
        duplicate_names,
    }
}

/// Non-note files and paths containing an exclusion substring are skipped
pub fn is_excluded(path: &Path, exclusions: &[String]) -> bool {
    let path = normalize_separators(&path.to_string_lossy());
    if !path.ends_with(NOTE_EXTENSION) {
        return true;
    }
    exclusions.iter().any(|e| path.contains(e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::NoHistory;
    use crate::resources::ResourceStore;
    use chrono::NaiveDate;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scan_dir(root: &Path, exclusions: &[String]) -> Scan {
        let resources = ResourceStore::new(root.join("assets"));
        let cx = NoteContext {
            vault_root: root,
            share_tag: "share",
            pinned_tag: "top",
            resources: &resources,
            history: &NoHistory,
            now: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        scan(&cx, exclusions)
    }

    #[test]
    fn test_is_excluded() {
        let exclusions = vec!["private/".to_string(), "/vault/assets".to_string()];
        assert!(is_excluded(Path::new("/vault/a.txt"), &exclusions));
        assert!(is_excluded(Path::new("/vault/private/a.md"), &exclusions));
        assert!(is_excluded(Path::new("/vault/assets/readme.md"), &exclusions));
        assert!(!is_excluded(Path::new("/vault/public/a.md"), &exclusions));
    }

    #[test]
    fn test_scan_partitions_and_orders_notes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "b.md", "#share\nB");
        write(root, "a.md", "#draft\nA");
        write(root, "sub/c.md", "#share #x\nC");
        write(root, "sub/image.png", "not a note");
        write(root, "secret/d.md", "#share\nD");

        let scan = scan_dir(root, &["/secret/".to_string()]);
        assert!(scan.is_complete());

        let all: Vec<&str> = scan.corpus.notes().iter().map(|n| n.rel_path.as_str()).collect();
        assert_eq!(all, vec!["a.md", "b.md", "sub/c.md"]);

        let published: Vec<&str> = scan.corpus.published().map(|n| n.name.as_str()).collect();
        assert_eq!(published, vec!["b", "c"]);
        assert_eq!(scan.corpus.published_count(), 2);
        assert!(!scan.corpus.is_resolved());
        assert!(scan.corpus.find_by_path("sub/c.md").is_some());
    }

    #[test]
    fn test_scan_reports_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "one/Topic.md", "#share\n1");
        write(dir.path(), "two/Topic.md", "#share\n2");

        let scan = scan_dir(dir.path(), &[]);
        assert_eq!(scan.corpus.notes().len(), 2);
        assert_eq!(scan.duplicate_names, vec!["Topic"]);
    }

    #[test]
    fn test_scan_stops_at_unreadable_note() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "#share\nA");
        fs::write(dir.path().join("b.md"), [0xff, 0xfe, 0x00]).unwrap();
        write(dir.path(), "c.md", "#share\nC");

        let scan = scan_dir(dir.path(), &[]);
        assert!(!scan.is_complete());
        let interruption = scan.interruption.as_ref().unwrap();
        assert_eq!(interruption.index, 2);
        assert!(interruption.path.ends_with("b.md"));
        assert_eq!(scan.corpus.notes().len(), 1);
        assert_eq!(scan.corpus.notes()[0].name, "a");
    }
}
