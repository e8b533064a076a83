// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Fiscorelay CLI - relay payment notifications into Fiscozen invoices.
//!
//! # Examples
//!
//! ```bash
//! # Check credentials
//! FISCOZEN_EMAIL=me@example.com FISCOZEN_PASSWORD=... fiscorelay login
//!
//! # Search provider customers
//! fiscorelay search "Acme Srl"
//!
//! # Turn a notification into an invoice
//! echo "Stripe payout: €250,00" | fiscorelay process -
//!
//! # Check a VAT number
//! fiscorelay lookup vat IT12345678901
//!
//! # Run the HTTP surface for the web frontend
//! fiscorelay serve
//!
//! # Export saved sessions
//! fiscorelay logs export --csv
//! ```

mod commands;
mod context;
mod output;
mod server;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use fiscorelay_providers::fiscozen::FiscozenError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{client, config, invoice, login, logs, lookup, process, search, serve};

// ============================================================================
// CLI Definition
// ============================================================================

/// Fiscorelay CLI - relay payment notifications into Fiscozen invoices.
#[derive(Parser)]
#[command(name = "fiscorelay")]
#[command(about = "Relay payment notifications into Fiscozen invoices")]
#[command(long_about = r#"
Fiscorelay logs into Fiscozen the way its web app does (CSRF cookie,
session cookie), finds or creates the customer and submits invoices.

Provider sessions live in memory only: every command that talks to the
provider logs in first, using --email/--password or FISCOZEN_EMAIL and
FISCOZEN_PASSWORD.

Examples:
  fiscorelay login                     # Check credentials
  fiscorelay search "Acme Srl"         # Search customers
  fiscorelay process notification.txt  # Extract, resolve and invoice
  fiscorelay lookup cap 20121          # Postal code lookup
  fiscorelay serve                     # HTTP surface on 127.0.0.1:3001
"#)]
#[command(version)]
#[command(author = "Fiscorelay Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the user config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Log in and print the session marker.
    Login(login::LoginArgs),

    /// Search provider customers by name.
    #[command(visible_alias = "s")]
    Search(search::SearchArgs),

    /// Create a provider customer, or link to an existing one.
    Client(client::ClientArgs),

    /// Submit an invoice.
    #[command(visible_alias = "i")]
    Invoice(invoice::InvoiceArgs),

    /// Extract a transaction from text, resolve the client and invoice it.
    #[command(visible_alias = "p")]
    Process(process::ProcessArgs),

    /// VAT number and postal code lookups.
    Lookup(lookup::LookupArgs),

    /// Show the session log and export saved sessions.
    Logs(logs::LogsArgs),

    /// Serve the HTTP API.
    Serve(serve::ServeArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Login failed or session missing.
    AuthFailed = 2,
    /// The provider rejected the request.
    Rejected = 3,
    /// Timeout.
    Timeout = 4,
}

impl ExitCode {
    /// Picks the exit code for a command failure.
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FiscozenError>() {
            Some(e) if e.is_auth_failure() => ExitCode::AuthFailed,
            Some(
                FiscozenError::InvalidCredentials
                | FiscozenError::CsrfUnavailable
                | FiscozenError::AuthenticationRejected { .. },
            ) => ExitCode::AuthFailed,
            Some(e) if e.provider_status().is_some() => ExitCode::Rejected,
            Some(FiscozenError::Timeout(_)) => ExitCode::Timeout,
            _ => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("fiscorelay=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fiscorelay=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `serve` is a long-running process and always logs at info or above.
    let verbose = cli.verbose || matches!(cli.command, Commands::Serve(_));
    setup_logging(verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Login(args) => login::run(args, &cli).await,
        Commands::Search(args) => search::run(args, &cli).await,
        Commands::Client(args) => client::run(args, &cli).await,
        Commands::Invoice(args) => invoice::run(args, &cli).await,
        Commands::Process(args) => process::run(args, &cli).await,
        Commands::Lookup(args) => lookup::run(args, &cli).await,
        Commands::Logs(args) => logs::run(args, &cli).await,
        Commands::Serve(args) => serve::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
