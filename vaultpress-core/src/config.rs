//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Main configuration struct matching the vaultpress.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vault root containing the authored notes
    #[serde(alias = "path_from")]
    pub vault: PathBuf,

    /// Site root; documents land in `<output>/source/_posts`
    #[serde(alias = "path_to")]
    pub output: PathBuf,

    /// Media store holding images and attachments
    #[serde(alias = "resource")]
    pub resources: PathBuf,

    /// Path substrings that exclude a file from the scan
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// Tag marking a note for publication (without the leading '#')
    #[serde(default)]
    pub share_tag: Option<String>,

    /// Tag pinning a note to the top of the site
    #[serde(default = "default_pinned_tag")]
    pub pinned_tag: String,

    /// Rank written as `top:` for pinned notes
    #[serde(default = "default_pinned_rank")]
    pub pinned_rank: u32,

    /// Derive timestamps from git history
    #[serde(default = "default_true")]
    pub history: bool,

    #[serde(default)]
    pub deploy: DeployConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

pub const DEFAULT_SHARE_TAG: &str = "share";

fn default_pinned_tag() -> String {
    String::from("top")
}

fn default_pinned_rank() -> u32 {
    999
}

fn default_true() -> bool {
    true
}

/// External build-and-publish sequence run inside the output root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Each step is an argv list; `{timestamp}` is substituted with the run time
    #[serde(default = "default_deploy_steps")]
    pub steps: Vec<Vec<String>>,
}

fn default_deploy_steps() -> Vec<Vec<String>> {
    [
        vec!["hexo", "clean"],
        vec!["hexo", "g"],
        vec!["hexo", "d"],
        vec!["git", "add", "."],
        vec!["git", "commit", "-m", "note:update {timestamp}"],
        vec!["git", "pull"],
        vec!["git", "push"],
    ]
    .into_iter()
    .map(|step| step.into_iter().map(String::from).collect())
    .collect()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            steps: default_deploy_steps(),
        }
    }
}

impl Config {
    /// Build a config in memory, with every optional field at its default
    pub fn new(
        vault: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        resources: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vault: vault.into(),
            output: output.into(),
            resources: resources.into(),
            exclude: None,
            share_tag: None,
            pinned_tag: default_pinned_tag(),
            pinned_rank: default_pinned_rank(),
            history: true,
            deploy: DeployConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;

        for (field, value) in [
            ("vault", &config.vault),
            ("output", &config.output),
            ("resources", &config.resources),
        ] {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
        }

        Ok(config)
    }

    /// Get the vault directory, resolved relative to config file
    pub fn vault_dir(&self) -> PathBuf {
        self.resolve_path(&self.vault)
    }

    /// Get the site root, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.output)
    }

    /// Get the resource store, resolved relative to config file
    pub fn resource_dir(&self) -> PathBuf {
        self.resolve_path(&self.resources)
    }

    /// Share tag, falling back to `share` when unset or blank
    pub fn share_tag(&self) -> &str {
        match self.share_tag.as_deref().map(str::trim) {
            Some(tag) if !tag.is_empty() => tag.trim_start_matches('#'),
            _ => DEFAULT_SHARE_TAG,
        }
    }

    /// Effective exclusion substrings: configured entries plus the resource root
    pub fn exclusions(&self) -> Vec<String> {
        let mut exclusions: Vec<String> = self
            .exclude
            .iter()
            .flatten()
            .map(|e| normalize_separators(e))
            .filter(|e| !e.is_empty())
            .collect();
        exclusions.push(normalize_separators(&self.resource_dir().to_string_lossy()));
        exclusions
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}

/// Use `/` as the only path separator
pub fn normalize_separators(raw: &str) -> String {
    raw.replace('\\', "/")
}
