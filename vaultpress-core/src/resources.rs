//! The media store holding embedded images and attachments.

use std::path::{Component, Path, PathBuf};

/// Directory of binary resources referenced from notes by name
#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a resource inside the store.
    ///
    /// Absolute names and names escaping the store resolve to `None`.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let relative = Path::new(name);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return None;
        }

        Some(self.root.join(relative))
    }

    /// Whether `name` is a file in the store
    pub fn contains(&self, name: &str) -> bool {
        self.path_of(name).is_some_and(|p| p.is_file())
    }
}
