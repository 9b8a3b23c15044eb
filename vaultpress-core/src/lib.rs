//! # vaultpress-core
//!
//! Core library for the vaultpress note publisher.
//!
//! This crate turns an Obsidian-style vault into a Hexo site: it scans the
//! vault for notes tagged for sharing, rewrites their links, images and
//! attachments, resolves cross-references between notes and writes one post
//! per shared note.

pub mod config;
pub mod deploy;
pub mod history;
pub mod note;
pub mod pipeline;
pub mod publish;
pub mod resolve;
pub mod resources;
pub mod rewrite;
pub mod scan;
pub mod tags;

pub use config::{Config, ConfigError, DeployConfig};
pub use deploy::{CommandDeployer, DeployError, Deployer};
pub use history::{GitHistory, HistoryError, HistorySource, MemoryHistory, NoHistory, Revision};
pub use note::{Note, NoteContext, NoteError, NoteId};
pub use pipeline::{
    deploy, generate, scan_vault, verify, DeployOutcome, PipelineError, RunContext, RunSummary,
};
pub use publish::{PublishError, PublishReport, Publisher, SiteLayout};
pub use resolve::{resolve_links, DanglingLink, ResolveReport};
pub use resources::ResourceStore;
pub use scan::{Corpus, Scan, ScanInterruption};
pub use tags::TagLine;
