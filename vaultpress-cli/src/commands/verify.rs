//! Verify the vault without writing the site.

use super::{ensure_complete, load_context, print_summary};
use anyhow::{Context, Result};
use std::path::Path;

/// Scan and resolve links, then report dangling links, duplicate names and
/// any interruption
pub fn verify_vault(config_path: &Path, json: bool) -> Result<()> {
    let cx = load_context(config_path)?;
    let summary = vaultpress_core::verify(&cx).context("Failed to verify vault")?;

    print_summary(&summary, json)?;
    ensure_complete(&summary)
}
