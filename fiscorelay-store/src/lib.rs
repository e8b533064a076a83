// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Fiscorelay Store
//!
//! Local state for Fiscorelay.
//!
//! This crate provides:
//!
//! - **Config**: The JSON configuration file, with environment overrides
//! - **SessionLog**: SQLite log of workflow events and saved sessions
//! - **Persistence**: File I/O helpers for JSON data
//!
//! Provider sessions themselves are never persisted; they live in memory
//! for the lifetime of the process.
//!
//! ## Usage
//!
//! ```ignore
//! use fiscorelay_store::{Config, SessionLog};
//!
//! let config = Config::load().await?.with_env_overrides()?;
//! let log = SessionLog::open(&config.session_log_path())?;
//!
//! let workflow = Workflow::builder(config.to_settings())
//!     .with_sink(Arc::new(log))
//!     .build()?;
//! ```

pub mod config;
pub mod error;
pub mod persistence;
pub mod session_log;

pub use config::{Config, GeneralConfig, ProviderConfig, ServerConfig};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, default_data_dir, default_session_log_path,
    ensure_dir, load_json, load_json_or_default, save_json,
};
pub use session_log::{LogEntry, SessionLog, SessionRecord, SessionSummary, StoredSession};
