//! The note model: one vault document and everything derived from it.

use crate::config::normalize_separators;
use crate::history::{HistoryError, HistorySource};
use crate::resources::ResourceStore;
use crate::rewrite::{apply_construction_rules, apply_finalize_passes, RewriteContext};
use crate::tags::TagLine;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Layout of `date:` in the front matter
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of hex digits kept from the path digest
const ID_LEN: usize = 20;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} is not inside the vault {vault:?}")]
    OutsideVault { path: PathBuf, vault: PathBuf },

    #[error("Unusable history for {path:?}: {source}")]
    History {
        path: PathBuf,
        #[source]
        source: HistoryError,
    },
}

/// Stable permalink slug of a note: a digest of its vault-relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(String);

impl NoteId {
    pub fn from_rel_path(rel_path: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(rel_path.as_bytes());
        let full_hex = hex::encode(hasher.finalize());
        NoteId(full_hex[..ID_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a note needs from its surroundings while loading
pub struct NoteContext<'a> {
    pub vault_root: &'a Path,
    pub share_tag: &'a str,
    pub pinned_tag: &'a str,
    pub resources: &'a ResourceStore,
    pub history: &'a dyn HistorySource,
    /// Run start time, used when a file has no history
    pub now: NaiveDateTime,
}

/// A single vault document
#[derive(Debug, Clone)]
pub struct Note {
    /// Absolute path of the source file
    pub source_path: PathBuf,

    /// Path relative to the vault root, `/`-separated (e.g. "rust/Ownership.md")
    pub rel_path: String,

    /// File stem; wiki-links match on it
    pub name: String,

    /// Body after the tag line, progressively rewritten
    pub body: String,

    pub tags: BTreeSet<String>,
    pub published: bool,
    pub pinned: bool,

    /// Raw wiki-link targets in body order
    pub links: Vec<String>,

    /// Images to copy into `images/`
    pub images: Vec<String>,

    /// Attachments to copy into `download/`
    pub files: Vec<String>,

    pub id: NoteId,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,

    /// Rendered links to notes referencing this one
    pub backlinks: BTreeSet<String>,

    /// Rendered links shown in the mindmap outline
    pub outline: BTreeSet<String>,
}

impl Note {
    /// Read and rewrite a note file.
    ///
    /// The first line carries the tags and is not part of the body.
    pub fn load(path: &Path, cx: &NoteContext<'_>) -> Result<Self, NoteError> {
        let text = fs::read_to_string(path).map_err(|source| NoteError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let (first_line, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        let tag_line = TagLine::parse(first_line.trim_end_matches('\r'), cx.share_tag, cx.pinned_tag);

        let mut rewrite_cx = RewriteContext::new(cx.resources);
        let body = apply_construction_rules(rest.to_string(), &mut rewrite_cx);
        let refs = rewrite_cx.refs;

        let rel_path = path
            .strip_prefix(cx.vault_root)
            .map_err(|_| NoteError::OutsideVault {
                path: path.to_path_buf(),
                vault: cx.vault_root.to_path_buf(),
            })?;
        let rel_path = normalize_separators(&rel_path.to_string_lossy());

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let revisions = cx.history.history_of(path);
        let (created, modified) = match (revisions.last(), revisions.first()) {
            (Some(oldest), Some(newest)) => {
                let to_note_error = |source| NoteError::History {
                    path: path.to_path_buf(),
                    source,
                };
                (
                    oldest.timestamp().map_err(to_note_error)?,
                    newest.timestamp().map_err(to_note_error)?,
                )
            }
            _ => (cx.now, cx.now),
        };

        let id = NoteId::from_rel_path(&rel_path);

        Ok(Note {
            source_path: path.to_path_buf(),
            rel_path,
            name,
            body,
            tags: tag_line.tags,
            published: tag_line.published,
            pinned: tag_line.pinned,
            links: refs.links,
            images: refs.images,
            files: refs.files,
            id,
            created,
            modified,
            backlinks: BTreeSet::new(),
            outline: BTreeSet::new(),
        })
    }

    /// Number of directories between the vault root and the file
    pub fn depth(&self) -> usize {
        self.rel_path.matches('/').count()
    }

    /// Directory segments of the vault-relative path, used as categories
    pub fn categories(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.rel_path.split('/').filter(|s| !s.is_empty()).collect();
        segments.pop();
        segments
    }

    /// Markdown link to this note's permalink, optionally to one heading
    pub fn permalink(&self, heading: Option<&str>, label: Option<&str>) -> String {
        match heading {
            Some(heading) => {
                let default_label = format!("{}#{}", self.name, heading);
                let label = label.unwrap_or(&default_label);
                format!("[{}](../{}/#{})", label, self.id, heading)
            }
            None => format!("[{}](../{})", label.unwrap_or(&self.name), self.id),
        }
    }

    /// Produce the output document: front matter, finalized body, backlinks
    /// and mindmap outline.
    ///
    /// Rendering borrows the note and leaves the body untouched, so calling it
    /// again yields the same document rather than stacking front matter.
    pub fn render_document(&self, pinned_rank: u32) -> String {
        let mut document = self.front_matter(pinned_rank);
        document.push_str(&apply_finalize_passes(&self.body));

        if !self.backlinks.is_empty() {
            document.push_str("\n\n**Backlinks:**\n");
            for backlink in &self.backlinks {
                document.push_str(&format!("\n- {backlink}"));
            }
        }

        if !self.outline.is_empty() {
            document.push_str("\n\n{% pullquote mindmap mindmap-md %}");
            document.push_str(&format!("\n- {}", self.name));
            for link in &self.outline {
                document.push_str(&format!("\n  - {link}"));
            }
            document.push_str("\n{% endpullquote %}");
        }

        document
    }

    fn front_matter(&self, pinned_rank: u32) -> String {
        let mut fm = String::from("---\n");
        fm.push_str(&format!("title: {}\n", yaml_scalar(&self.name)));
        fm.push_str(&format!("date: {}\n", self.created.format(DATE_FORMAT)));
        fm.push_str(&format!("categories: {}\n", yaml_list(self.categories())));
        fm.push_str(&format!(
            "tags: {}\n",
            yaml_list(self.tags.iter().map(String::as_str))
        ));
        if self.pinned {
            fm.push_str(&format!("top: {pinned_rank}\n"));
        }
        fm.push_str("---\n");
        fm
    }
}

/// A YAML scalar, quoted only when the plain form would not round-trip
fn yaml_scalar(value: &str) -> String {
    match serde_yaml::to_string(value) {
        Ok(rendered) => rendered.trim_end().to_string(),
        Err(_) => format!("'{}'", value.replace('\'', "''")),
    }
}

fn yaml_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let items: Vec<String> = items.into_iter().map(yaml_scalar).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{MemoryHistory, NoHistory, Revision};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct Vault {
        dir: TempDir,
        resources: ResourceStore,
    }

    impl Vault {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("assets")).unwrap();
            let resources = ResourceStore::new(dir.path().join("assets"));
            Self { dir, resources }
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn context<'a>(&'a self, history: &'a dyn HistorySource) -> NoteContext<'a> {
            NoteContext {
                vault_root: self.dir.path(),
                share_tag: "share",
                pinned_tag: "top",
                resources: &self.resources,
                history,
                now: now(),
            }
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap()
    }

    #[test]
    fn test_load_extracts_tags_links_and_identity() {
        let vault = Vault::new();
        fs::write(vault.dir.path().join("assets/pic.png"), b"png").unwrap();
        let path = vault.write(
            "rust/Ownership.md",
            "#share #lang/rust\nSee [[Borrowing]] and ![[pic.png]].\n",
        );

        let note = Note::load(&path, &vault.context(&NoHistory)).unwrap();
        assert_eq!(note.rel_path, "rust/Ownership.md");
        assert_eq!(note.name, "Ownership");
        assert_eq!(note.depth(), 1);
        assert!(note.published);
        assert!(!note.pinned);
        assert_eq!(
            note.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["lang", "rust"]
        );
        assert_eq!(note.links, vec!["Borrowing"]);
        assert_eq!(note.images, vec!["pic.png"]);
        assert_eq!(note.body, "See [[Borrowing]] and ![](/images/pic.png).\n");
        assert_eq!(note.id, NoteId::from_rel_path("rust/Ownership.md"));
        assert_eq!(note.id.as_str().len(), 20);
        assert_eq!(note.created, now());
        assert_eq!(note.modified, now());
    }

    #[test]
    fn test_load_is_deterministic() {
        let vault = Vault::new();
        let path = vault.write("a.md", "#share #x\n[[b]] [[c#h]]");

        let first = Note::load(&path, &vault.context(&NoHistory)).unwrap();
        let second = Note::load(&path, &vault.context(&NoHistory)).unwrap();
        assert_eq!(first.tags, second.tags);
        assert_eq!(first.links, second.links);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_single_line_note_has_empty_body() {
        let vault = Vault::new();
        let path = vault.write("solo.md", "#share");
        let note = Note::load(&path, &vault.context(&NoHistory)).unwrap();
        assert!(note.published);
        assert_eq!(note.body, "");
    }

    #[test]
    fn test_timestamps_come_from_history() {
        let vault = Vault::new();
        let path = vault.write("dated.md", "#share\nbody");

        let mut history = MemoryHistory::new();
        history.insert(
            &path,
            vec![
                Revision {
                    hash: "new".into(),
                    date: "Tue Oct 10 21:04:05 2023 +0800".into(),
                    ..Revision::default()
                },
                Revision {
                    hash: "old".into(),
                    date: "Mon Jan 2 15:04:05 2023 +0800".into(),
                    ..Revision::default()
                },
            ],
        );

        let note = Note::load(&path, &vault.context(&history)).unwrap();
        assert_eq!(note.created.format(DATE_FORMAT).to_string(), "2023-01-02 15:04:05");
        assert_eq!(note.modified.format(DATE_FORMAT).to_string(), "2023-10-10 21:04:05");
    }

    #[test]
    fn test_malformed_history_date_fails() {
        let vault = Vault::new();
        let path = vault.write("bad.md", "#share\nbody");

        let mut history = MemoryHistory::new();
        history.insert(
            &path,
            vec![Revision {
                hash: "h".into(),
                date: "not a date".into(),
                ..Revision::default()
            }],
        );

        let err = Note::load(&path, &vault.context(&history)).unwrap_err();
        assert!(matches!(err, NoteError::History { .. }));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let vault = Vault::new();
        let err = Note::load(&vault.dir.path().join("nope.md"), &vault.context(&NoHistory))
            .unwrap_err();
        assert!(matches!(err, NoteError::Read { .. }));
    }

    #[test]
    fn test_permalink_rendering() {
        let vault = Vault::new();
        let path = vault.write("Target.md", "#share\n");
        let note = Note::load(&path, &vault.context(&NoHistory)).unwrap();
        let id = note.id.clone();

        assert_eq!(note.permalink(None, None), format!("[Target](../{id})"));
        assert_eq!(
            note.permalink(Some("Usage"), None),
            format!("[Target#Usage](../{id}/#Usage)")
        );
        assert_eq!(
            note.permalink(None, Some("the target")),
            format!("[the target](../{id})")
        );
    }

    #[test]
    fn test_render_document() {
        let vault = Vault::new();
        let path = vault.write(
            "lang/rust/Traits.md",
            "#share #top #rust\nIntro\n## Usage\ntext",
        );
        let mut note = Note::load(&path, &vault.context(&NoHistory)).unwrap();
        note.backlinks.insert("[Generics](../abc)".into());
        note.outline.insert("[Generics](../abc)".into());
        note.outline.insert("[Objects](../def)".into());

        let document = note.render_document(999);
        assert_eq!(
            document,
            "---\n\
title: Traits\n\
date: 2024-05-06 07:08:09\n\
categories: [lang, rust]\n\
tags: [rust, top]\n\
top: 999\n\
---\n\
Intro\n\n## Usage\n\ntext\
\n\n**Backlinks:**\n\n- [Generics](../abc)\
\n\n{% pullquote mindmap mindmap-md %}\n- Traits\n  - [Generics](../abc)\n  - [Objects](../def)\n{% endpullquote %}"
        );
        assert_eq!(note.render_document(999), document);
    }

    #[test]
    fn test_front_matter_quotes_awkward_titles() {
        let vault = Vault::new();
        let path = vault.write("Rust: a tour.md", "#share\nbody");
        let note = Note::load(&path, &vault.context(&NoHistory)).unwrap();

        let document = note.render_document(999);
        assert!(document.starts_with("---\ntitle: 'Rust: a tour'\n"));
        assert!(document.contains("categories: []\ntags: []\n---\nbody"));
        assert!(!document.contains("top:"));
        assert!(!document.contains("Backlinks"));
        assert!(!document.contains("pullquote"));
    }
}
