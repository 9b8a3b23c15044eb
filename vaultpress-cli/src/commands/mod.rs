//! CLI command implementations.

pub mod build;
pub mod deploy;
pub mod init;
pub mod verify;

pub use build::build_site;
pub use deploy::deploy_site;
pub use init::init_project;
pub use verify::verify_vault;

use anyhow::{Context, Result};
use std::path::Path;
use vaultpress_core::{Config, RunContext, RunSummary};

/// Load the config and set up the run
pub(crate) fn load_context(config_path: &Path) -> Result<RunContext> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    Ok(RunContext::new(config))
}

/// Print a summary either as pretty JSON or as a short report
pub(crate) fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        let payload =
            serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
        println!("{}", payload);
        return Ok(());
    }

    println!(
        "{} notes scanned, {} shared, {} documents written",
        summary.notes_scanned, summary.notes_published, summary.documents_written
    );
    println!(
        "{} images and {} files copied, {} links resolved, {} dangling",
        summary.images_copied,
        summary.files_copied,
        summary.links_resolved,
        summary.dangling_links.len()
    );
    for link in &summary.dangling_links {
        println!("- dangling [[{}]] in {}", link.target, link.source);
    }
    for name in &summary.duplicate_names {
        println!("- duplicate note name '{}'", name);
    }
    for err in &summary.walk_errors {
        println!("- unreadable entry: {}", err);
    }
    if let Some(interruption) = &summary.interruption {
        println!(
            "Scan stopped at note {} ({}): {}",
            interruption.index,
            interruption.path.display(),
            interruption.error
        );
    }
    Ok(())
}

/// Turn an interrupted scan into a failing exit status
pub(crate) fn ensure_complete(summary: &RunSummary) -> Result<()> {
    if let Some(interruption) = &summary.interruption {
        anyhow::bail!(
            "Scan was interrupted at {}; only {} notes were read",
            interruption.path.display(),
            summary.notes_scanned
        );
    }
    Ok(())
}
