//! # vaultpress CLI
//!
//! Command-line interface for publishing an Obsidian vault as a Hexo site.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vaultpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, env = "VAULTPRESS_CONFIG", default_value = "vaultpress.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter vaultpress.yml
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Regenerate the site from shared notes
    Build {
        /// Run the deploy steps afterwards (also enabled by `deploy.enabled`)
        #[arg(long)]
        deploy: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the deploy steps against the existing site
    Deploy,

    /// Scan the vault and resolve links without writing anything
    Verify {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::Build { deploy, json } => commands::build_site(&cli.config, deploy, json),
        Commands::Deploy => commands::deploy_site(&cli.config),
        Commands::Verify { json } => commands::verify_vault(&cli.config, json),
    }
}
