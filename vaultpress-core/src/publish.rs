//! Writing the Hexo site: posts, images and downloads.

use crate::note::NoteId;
use crate::resolve::{resolve_links, ResolveReport};
use crate::resources::ResourceStore;
use crate::scan::Corpus;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to prepare {path:?}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy {from:?} to {to:?}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Resource name {0:?} points outside the resource store")]
    UnsafeResource(String),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Notes {first} and {second} share the identity {id}")]
    DuplicateIdentity {
        id: NoteId,
        first: String,
        second: String,
    },
}

/// Directory layout of a Hexo site
#[derive(Debug, Clone)]
pub struct SiteLayout {
    root: PathBuf,
}

impl SiteLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `source/_posts`, rebuilt from scratch on every run
    pub fn posts_dir(&self) -> PathBuf {
        self.root.join("source").join("_posts")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("source").join("images")
    }

    pub fn download_dir(&self) -> PathBuf {
        self.root.join("source").join("download")
    }

    pub fn post_path(&self, id: &NoteId) -> PathBuf {
        self.posts_dir().join(format!("{id}.md"))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub documents_written: usize,
    pub images_copied: usize,
    pub files_copied: usize,
    pub links: ResolveReport,
}

pub struct Publisher<'a> {
    layout: SiteLayout,
    resources: &'a ResourceStore,
    pinned_rank: u32,
}

impl<'a> Publisher<'a> {
    pub fn new(layout: SiteLayout, resources: &'a ResourceStore, pinned_rank: u32) -> Self {
        Self {
            layout,
            resources,
            pinned_rank,
        }
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    /// Regenerate the site from the published part of `corpus`.
    ///
    /// The posts directory is deleted first. Media is copied before any post is
    /// written, and links are resolved before any document is rendered.
    pub fn publish(&self, corpus: &mut Corpus) -> Result<PublishReport, PublishError> {
        check_identities(corpus)?;
        self.prepare_dirs()?;

        let mut report = PublishReport::default();

        let images: BTreeSet<&str> = corpus
            .published()
            .flat_map(|n| n.images.iter().map(String::as_str))
            .collect();
        for name in images {
            self.copy_resource(name, &self.layout.images_dir())?;
            report.images_copied += 1;
        }

        let files: BTreeSet<&str> = corpus
            .published()
            .flat_map(|n| n.files.iter().map(String::as_str))
            .collect();
        for name in files {
            self.copy_resource(name, &self.layout.download_dir())?;
            report.files_copied += 1;
        }

        if !corpus.is_resolved() {
            report.links = resolve_links(corpus);
        }

        for note in corpus.published() {
            let path = self.layout.post_path(&note.id);
            let document = note.render_document(self.pinned_rank);
            fs::write(&path, document).map_err(|source| PublishError::Write {
                path: path.clone(),
                source,
            })?;
            tracing::info!("Generated {} -> {}", note.rel_path, path.display());
            report.documents_written += 1;
        }

        Ok(report)
    }

    fn prepare_dirs(&self) -> Result<(), PublishError> {
        let posts_dir = self.layout.posts_dir();
        match fs::remove_dir_all(&posts_dir) {
            Ok(()) => tracing::debug!("Cleared {}", posts_dir.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(PublishError::Prepare {
                    path: posts_dir,
                    source,
                })
            }
        }

        for dir in [
            posts_dir,
            self.layout.images_dir(),
            self.layout.download_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|source| PublishError::Prepare {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn copy_resource(&self, name: &str, dest_dir: &Path) -> Result<(), PublishError> {
        let from = self
            .resources
            .path_of(name)
            .ok_or_else(|| PublishError::UnsafeResource(name.to_string()))?;
        let to = dest_dir.join(name.trim());

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|source| PublishError::Prepare {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(&from, &to).map_err(|source| PublishError::Copy {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        tracing::debug!("Copied {} -> {}", from.display(), to.display());
        Ok(())
    }
}

/// Two published notes may not write to the same post file
fn check_identities(corpus: &Corpus) -> Result<(), PublishError> {
    let mut seen: HashMap<&NoteId, &str> = HashMap::new();
    for note in corpus.published() {
        if let Some(first) = seen.insert(&note.id, &note.rel_path) {
            return Err(PublishError::DuplicateIdentity {
                id: note.id.clone(),
                first: first.to_string(),
                second: note.rel_path.clone(),
            });
        }
    }
    Ok(())
}
