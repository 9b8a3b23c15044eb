//! Running the site generator and pushing the result.

use std::path::Path;
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Placeholder in deploy step arguments replaced with the run time
pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Deploy step {0} is empty")]
    EmptyStep(usize),

    #[error("Failed to start `{step}`: {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{step}` exited with {status}")]
    Failed { step: String, status: ExitStatus },
}

/// Publishes a generated site directory
pub trait Deployer {
    fn deploy(&self, site_root: &Path) -> Result<(), DeployError>;
}

/// Runs each configured argv in the site directory, stopping at the first
/// failure
#[derive(Debug, Clone)]
pub struct CommandDeployer {
    steps: Vec<Vec<String>>,
    timestamp: String,
}

impl CommandDeployer {
    pub fn new(steps: Vec<Vec<String>>, timestamp: impl Into<String>) -> Self {
        Self {
            steps,
            timestamp: timestamp.into(),
        }
    }

    /// Steps with the timestamp placeholder filled in
    pub fn expanded_steps(&self) -> Vec<Vec<String>> {
        self.steps
            .iter()
            .map(|step| {
                step.iter()
                    .map(|arg| arg.replace(TIMESTAMP_PLACEHOLDER, &self.timestamp))
                    .collect()
            })
            .collect()
    }
}

impl Deployer for CommandDeployer {
    fn deploy(&self, site_root: &Path) -> Result<(), DeployError> {
        for (idx, step) in self.expanded_steps().into_iter().enumerate() {
            let Some((program, args)) = step.split_first() else {
                return Err(DeployError::EmptyStep(idx + 1));
            };
            let command = step.join(" ");
            tracing::info!("Running `{}` in {}", command, site_root.display());

            let output = Command::new(program)
                .args(args)
                .current_dir(site_root)
                .output()
                .map_err(|source| DeployError::Spawn {
                    step: command.clone(),
                    source,
                })?;

            for line in String::from_utf8_lossy(&output.stdout)
                .lines()
                .chain(String::from_utf8_lossy(&output.stderr).lines())
                .filter(|l| !l.trim().is_empty())
            {
                tracing::info!("{}", line);
            }

            if !output.status.success() {
                return Err(DeployError::Failed {
                    step: command,
                    status: output.status,
                });
            }
        }
        Ok(())
    }
}
