//! Config command - show and initialize configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use fiscorelay_store::Config;

use super::emit;
use crate::context::load_config;
use crate::Cli;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration (default).
    Show,

    /// Print the configuration file path.
    Path,

    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);

    match args.action.as_ref().unwrap_or(&ConfigAction::Show) {
        ConfigAction::Show => {
            let config = load_config(cli).await?;
            let rendered = serde_json::to_string_pretty(&config)?;
            emit(cli, &config, move |_| rendered)
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Init { force } => {
            if !force && tokio::fs::try_exists(&path).await? {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default().save_to(&path).await?;
            if !cli.quiet {
                println!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}
