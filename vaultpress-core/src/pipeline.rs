//! End-to-end runs: scan the vault, publish the site, deploy it.
//!
//! Flow: Scanner → Notes → Link Resolver → Publisher → Deployer

use crate::config::Config;
use crate::deploy::{CommandDeployer, Deployer};
use crate::history::{GitHistory, HistorySource, NoHistory};
use crate::note::{NoteContext, DATE_FORMAT};
use crate::publish::{PublishError, Publisher, SiteLayout};
use crate::resolve::{resolve_links, DanglingLink};
use crate::resources::ResourceStore;
use crate::scan::{scan, Scan, ScanInterruption};
use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Vault directory {0:?} does not exist")]
    MissingVault(std::path::PathBuf),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Configuration and collaborators shared by every stage of one run
pub struct RunContext {
    pub config: Config,
    history: Box<dyn HistorySource>,
    resources: ResourceStore,
    /// Run start; stands in for missing history and stamps deploy commits
    pub started: NaiveDateTime,
}

impl RunContext {
    /// Git history when enabled, the local clock as the run time
    pub fn new(config: Config) -> Self {
        let history: Box<dyn HistorySource> = if config.history {
            Box::new(GitHistory::new(config.vault_dir()))
        } else {
            Box::new(NoHistory)
        };
        let started = chrono::Local::now().naive_local();
        Self::with_history(config, history, started)
    }

    pub fn with_history(
        config: Config,
        history: Box<dyn HistorySource>,
        started: NaiveDateTime,
    ) -> Self {
        let resources = ResourceStore::new(config.resource_dir());
        Self {
            config,
            history,
            resources,
            started,
        }
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn layout(&self) -> SiteLayout {
        SiteLayout::new(self.config.output_dir())
    }

    /// Deployer running the configured steps, stamped with the run time
    pub fn deployer(&self) -> CommandDeployer {
        CommandDeployer::new(
            self.config.deploy.steps.clone(),
            self.started.format(DATE_FORMAT).to_string(),
        )
    }

    fn note_context<'a>(&'a self, vault_root: &'a std::path::Path) -> NoteContext<'a> {
        NoteContext {
            vault_root,
            share_tag: self.config.share_tag(),
            pinned_tag: &self.config.pinned_tag,
            resources: &self.resources,
            history: self.history.as_ref(),
            now: self.started,
        }
    }
}

/// Result of the deploy stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum DeployOutcome {
    Skipped,
    Succeeded,
    Failed(String),
}

/// What a run did, printed by the CLI and serialized for `--json`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub notes_scanned: usize,
    pub notes_published: usize,
    pub documents_written: usize,
    pub images_copied: usize,
    pub files_copied: usize,
    pub links_resolved: usize,
    pub dangling_links: Vec<DanglingLink>,
    pub duplicate_names: Vec<String>,
    pub interruption: Option<ScanInterruption>,
    pub walk_errors: Vec<String>,
    pub deploy: DeployOutcome,
}

impl RunSummary {
    fn from_scan(scan: &Scan) -> Self {
        Self {
            notes_scanned: scan.corpus.notes().len(),
            notes_published: scan.corpus.published_count(),
            documents_written: 0,
            images_copied: 0,
            files_copied: 0,
            links_resolved: 0,
            dangling_links: Vec::new(),
            duplicate_names: scan.duplicate_names.clone(),
            interruption: scan.interruption.clone(),
            walk_errors: scan.walk_errors.clone(),
            deploy: DeployOutcome::Skipped,
        }
    }

    /// The whole vault was read; deploy results do not count
    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }
}

/// Walk the configured vault
pub fn scan_vault(cx: &RunContext) -> Result<Scan, PipelineError> {
    let vault_root = cx.config.vault_dir();
    if !vault_root.is_dir() {
        return Err(PipelineError::MissingVault(vault_root));
    }
    tracing::info!("Scanning vault {}", vault_root.display());
    let scan = scan(&cx.note_context(&vault_root), &cx.config.exclusions());
    tracing::info!(
        "Scanned {} notes, {} shared",
        scan.corpus.notes().len(),
        scan.corpus.published_count()
    );
    Ok(scan)
}

/// Scan the vault and regenerate the site.
///
/// An interrupted scan still publishes what was read; the summary carries the
/// interruption.
pub fn generate(cx: &RunContext) -> Result<RunSummary, PipelineError> {
    let mut scan = scan_vault(cx)?;
    let mut summary = RunSummary::from_scan(&scan);

    let publisher = Publisher::new(cx.layout(), cx.resources(), cx.config.pinned_rank);
    let report = publisher.publish(&mut scan.corpus)?;

    summary.documents_written = report.documents_written;
    summary.images_copied = report.images_copied;
    summary.files_copied = report.files_copied;
    summary.links_resolved = report.links.resolved;
    summary.dangling_links = report.links.dangling;

    tracing::info!(
        "Wrote {} documents to {}",
        summary.documents_written,
        publisher.layout().posts_dir().display()
    );
    Ok(summary)
}

/// Scan and resolve links without touching the output directory
pub fn verify(cx: &RunContext) -> Result<RunSummary, PipelineError> {
    let mut scan = scan_vault(cx)?;
    let mut summary = RunSummary::from_scan(&scan);

    let report = resolve_links(&mut scan.corpus);
    summary.links_resolved = report.resolved;
    summary.dangling_links = report.dangling;
    Ok(summary)
}

/// Run `deployer` against the output directory; failure is reported, not
/// propagated
pub fn deploy(cx: &RunContext, deployer: &dyn Deployer) -> DeployOutcome {
    let site_root = cx.config.output_dir();
    match deployer.deploy(&site_root) {
        Ok(()) => {
            tracing::info!("Deployed {}", site_root.display());
            DeployOutcome::Succeeded
        }
        Err(err) => {
            tracing::error!("Deploy failed: {}", err);
            DeployOutcome::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeployError;
    use chrono::NaiveDate;
    use std::fs;
    use std::path::Path;

    struct AlwaysFails;

    impl Deployer for AlwaysFails {
        fn deploy(&self, _site_root: &Path) -> Result<(), DeployError> {
            Err(DeployError::EmptyStep(1))
        }
    }

    struct AlwaysSucceeds;

    impl Deployer for AlwaysSucceeds {
        fn deploy(&self, _site_root: &Path) -> Result<(), DeployError> {
            Ok(())
        }
    }

    fn context(root: &Path) -> RunContext {
        let config = Config::new(root.join("vault"), root.join("site"), root.join("vault/assets"));
        let started = NaiveDate::from_ymd_opt(2024, 2, 3)
            .unwrap()
            .and_hms_opt(4, 5, 6)
            .unwrap();
        RunContext::with_history(config, Box::new(NoHistory), started)
    }

    #[test]
    fn test_generate_and_verify_agree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vault/assets")).unwrap();
        fs::write(dir.path().join("vault/A.md"), "#share\n[[B]] [[Missing]]").unwrap();
        fs::write(dir.path().join("vault/B.md"), "#draft\nB").unwrap();
        fs::write(dir.path().join("vault/assets/notes.md"), "#share\nnot a note").unwrap();

        let cx = context(dir.path());
        let verified = verify(&cx).unwrap();
        assert_eq!(verified.notes_scanned, 2);
        assert_eq!(verified.notes_published, 1);
        assert_eq!(verified.documents_written, 0);
        assert!(!dir.path().join("site").exists());

        let generated = generate(&cx).unwrap();
        assert_eq!(generated.documents_written, 1);
        assert_eq!(generated.links_resolved, verified.links_resolved);
        assert_eq!(generated.dangling_links, verified.dangling_links);
        assert_eq!(generated.dangling_links.len(), 1);
        assert!(generated.is_complete());
    }

    #[test]
    fn test_deploy_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let cx = context(dir.path());
        assert_eq!(deploy(&cx, &AlwaysSucceeds), DeployOutcome::Succeeded);
        assert!(matches!(deploy(&cx, &AlwaysFails), DeployOutcome::Failed(_)));
    }

    #[test]
    fn test_deployer_uses_run_time() {
        let dir = tempfile::tempdir().unwrap();
        let cx = context(dir.path());
        let steps = cx.deployer().expanded_steps();
        assert!(steps
            .iter()
            .flatten()
            .any(|arg| arg == "note:update 2024-02-03 04:05:06"));
    }

    #[test]
    fn test_summary_serializes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vault")).unwrap();
        let summary = verify(&context(dir.path())).unwrap();
        let yaml = serde_yaml::to_string(&summary).unwrap();
        assert!(yaml.contains("notes_scanned: 0"));
        assert!(yaml.contains("status: skipped"));
    }

    #[test]
    fn test_missing_vault_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate(&context(dir.path())).unwrap_err();
        assert!(matches!(err, PipelineError::MissingVault(_)));
        assert!(!dir.path().join("site").exists());
    }
}
