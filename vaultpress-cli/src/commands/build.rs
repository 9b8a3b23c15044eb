//! Build command implementation.

use super::{ensure_complete, load_context, print_summary};
use anyhow::{Context, Result};
use std::path::Path;
use vaultpress_core::{deploy, generate, DeployOutcome};

/// Regenerate the Hexo posts, then deploy when asked to
pub fn build_site(config_path: &Path, deploy_after: bool, json: bool) -> Result<()> {
    let cx = load_context(config_path)?;
    let mut summary = generate(&cx).context("Failed to generate site")?;

    if deploy_after || cx.config.deploy.enabled {
        if summary.is_complete() {
            summary.deploy = deploy(&cx, &cx.deployer());
        } else {
            tracing::error!("Skipping deploy: the scan was interrupted and the site is partial");
        }
    }

    print_summary(&summary, json)?;
    if let DeployOutcome::Failed(err) = &summary.deploy {
        tracing::warn!("Site was generated but not deployed: {}", err);
    }

    ensure_complete(&summary)
}
