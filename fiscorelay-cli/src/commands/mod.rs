//! CLI command implementations.

pub mod client;
pub mod config;
pub mod invoice;
pub mod login;
pub mod logs;
pub mod lookup;
pub mod process;
pub mod search;
pub mod serve;

use clap::Args;
use fiscorelay_providers::fiscozen::Credentials;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Provider credentials shared by every command that logs in.
#[derive(Args, Clone, Default)]
pub struct CredentialArgs {
    /// Fiscozen account e-mail.
    #[arg(long, env = "FISCOZEN_EMAIL")]
    pub email: Option<String>,

    /// Fiscozen account password.
    #[arg(long, env = "FISCOZEN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl CredentialArgs {
    /// Returns the credentials; missing fields stay empty and are rejected
    /// by the login itself.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.email.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
        )
    }
}

/// Prints `value` in the selected format.
///
/// `text` renders the human-readable form.
pub fn emit<T: serde::Serialize>(
    cli: &Cli,
    value: &T,
    text: impl FnOnce(&TextFormatter) -> String,
) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", text(&TextFormatter::new(!cli.no_color)));
            }
        }
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(value)?),
    }
    Ok(())
}
