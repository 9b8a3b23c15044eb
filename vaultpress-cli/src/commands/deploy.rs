//! Deploy command implementation.

use super::load_context;
use anyhow::Result;
use std::path::Path;
use vaultpress_core::{deploy, DeployOutcome};

/// Run the configured deploy steps in the site directory
pub fn deploy_site(config_path: &Path) -> Result<()> {
    let cx = load_context(config_path)?;
    let site_root = cx.config.output_dir();
    if !site_root.is_dir() {
        anyhow::bail!("Site directory {:?} does not exist; run `vaultpress build` first", site_root);
    }

    match deploy(&cx, &cx.deployer()) {
        DeployOutcome::Failed(err) => anyhow::bail!("Deploy failed: {}", err),
        _ => {
            println!("✓ Deployed {:?}", site_root);
            Ok(())
        }
    }
}
