//! Wiring from configuration to a ready workflow.

use std::sync::Arc;

use anyhow::{Context, Result};
use fiscorelay_providers::fiscozen::{FanoutSink, LoginOutcome, TracingSink, Workflow};
use fiscorelay_store::{Config, SessionLog};
use tracing::debug;

use crate::commands::CredentialArgs;
use crate::Cli;

/// Everything a command needs.
pub struct AppContext {
    /// Effective configuration.
    pub config: Config,
    /// Session log, also receiving every workflow event.
    pub log: Arc<SessionLog>,
    /// Workflow for the default caller.
    pub workflow: Workflow,
}

impl AppContext {
    /// Loads the configuration and builds the workflow.
    pub async fn load(cli: &Cli) -> Result<Self> {
        let config = load_config(cli).await?;
        Self::from_config(config)
    }

    /// Builds the context from an already loaded configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let log_path = config.session_log_path();
        let log = Arc::new(
            SessionLog::open(&log_path)
                .with_context(|| format!("Failed to open session log {}", log_path.display()))?,
        );
        Self::with_log(config, log)
    }

    /// Builds the context around an existing session log.
    pub fn with_log(config: Config, log: Arc<SessionLog>) -> Result<Self> {
        let sink = FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(log.clone());
        let workflow = Workflow::builder(config.to_settings())
            .with_sink(Arc::new(sink))
            .build()?;

        debug!(base_url = %config.provider.base_url, "Workflow ready");
        Ok(Self {
            config,
            log,
            workflow,
        })
    }

    /// Logs in with the given credentials.
    pub async fn login(&self, credentials: &CredentialArgs) -> Result<LoginOutcome> {
        Ok(self.workflow.login(credentials.credentials()).await?)
    }
}

/// Loads the configuration file named on the command line, or the default
/// one, and applies environment overrides.
pub async fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_from(&path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(config.with_env_overrides()?)
}
