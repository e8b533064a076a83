// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Fiscorelay Fetch
//!
//! Outbound HTTP plumbing for talking to a browser-oriented provider API.
//!
//! This crate knows nothing about a specific provider. It includes:
//!
//! - [`http::HttpClient`] - HTTP client with tracing, a base URL and a
//!   domain allowlist
//! - [`cookies::CookieHeader`] - `Set-Cookie` collection and `Cookie`
//!   header assembly
//! - [`retry::RetryStrategy`] - Bounded, jittered retry for transient
//!   transport failures
//! - [`probe::LandingProbe`] - Ordered probing of candidate landing pages
//!
//! ## Example
//!
//! ```ignore
//! use fiscorelay_fetch::{HttpClient, LandingProbe, RetryStrategy};
//!
//! let http = HttpClient::new()?.with_base_url("https://app.example.com")?;
//! let probe = LandingProbe::new(vec!["/".into(), "/login/".into()])
//!     .with_retry(RetryStrategy::no_retry());
//!
//! let hit = probe.run(&http).await?;
//! println!("{} set {} cookies", hit.path, hit.set_cookies.len());
//! ```

// Core modules
pub mod cookies;
pub mod error;
pub mod http;
pub mod probe;
pub mod retry;

// Re-export key types at crate root
pub use cookies::{cookie_pair, find_cookie_value, set_cookie_headers, CookieHeader};
pub use error::{HttpError, ProbeError};
pub use http::{HttpClient, ResponseExt};
pub use probe::{LandingHit, LandingProbe, ProbeAttempt};
pub use retry::RetryStrategy;
