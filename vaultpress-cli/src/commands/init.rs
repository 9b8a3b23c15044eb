//! Init command implementation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../../../vaultpress.yml.example");

/// Write a starter config and the directories it points at
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    write_config(root)?;
    scaffold_vault(root)?;

    println!("✓ vaultpress initialized in {:?}", root);
    println!("  - Point `output` in vaultpress.yml at your Hexo site");
    println!("  - Start a note with #share on its first line to publish it");
    Ok(())
}

fn write_config(root: &Path) -> Result<()> {
    let config_path = root.join("vaultpress.yml");
    if config_path.exists() {
        println!("vaultpress.yml already exists at {:?}", config_path);
        return Ok(());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}

fn scaffold_vault(root: &Path) -> Result<()> {
    let vault_root = root.join("vault");
    let assets = vault_root.join("assets");

    for dir in [&vault_root, &assets] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    let sample = vault_root.join("Welcome.md");
    if !sample.exists() {
        fs::write(&sample, sample_note())
            .with_context(|| format!("Failed to write {:?}", sample))?;
        println!("Created {:?}", sample);
    }

    Ok(())
}

fn sample_note() -> &'static str {
    "#share #vaultpress\n\
This note is published because its first line carries `#share`.\n\
\n\
## Links\n\
\n\
Link other notes with [[Wiki Links]] and embed images from `assets/` with ![[picture.png]].\n"
}
