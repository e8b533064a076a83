//! Logs command - inspect the session log and export saved sessions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use fiscorelay_store::{Config, SessionLog};

use super::emit;
use crate::context::load_config;
use crate::Cli;

/// Arguments for the logs command.
#[derive(Args)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub action: Option<LogsAction>,

    /// Number of entries to show.
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,
}

/// Logs subcommands.
#[derive(Subcommand)]
pub enum LogsAction {
    /// List recent workflow events (default).
    List,

    /// List recent saved sessions.
    Sessions,

    /// Export saved sessions.
    Export {
        /// Export as CSV.
        #[arg(long, conflicts_with = "json")]
        csv: bool,

        /// Export as JSON (default).
        #[arg(long)]
        json: bool,

        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn open_log(config: &Config) -> Result<SessionLog> {
    let path = config.session_log_path();
    SessionLog::open(&path).with_context(|| format!("Failed to open session log {}", path.display()))
}

/// Runs the logs command.
pub async fn run(args: &LogsArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli).await?;
    let log = open_log(&config)?;

    match args.action.as_ref().unwrap_or(&LogsAction::List) {
        LogsAction::List => {
            let entries = log.recent_logs(args.limit)?;
            emit(cli, &entries, |f| f.format_logs(&entries))
        }
        LogsAction::Sessions => {
            let sessions = log.recent_sessions(args.limit)?;
            emit(cli, &sessions, |f| f.format_sessions(&sessions))
        }
        LogsAction::Export { csv, output, .. } => {
            let body = if *csv {
                log.export_csv()?
            } else {
                serde_json::to_string_pretty(&log.export_json()?)?
            };
            match output {
                Some(path) => {
                    tokio::fs::write(path, body)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    if !cli.quiet {
                        eprintln!("Exported to {}", path.display());
                    }
                }
                None => println!("{body}"),
            }
            Ok(())
        }
    }
}
