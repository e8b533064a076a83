//! HTTP client with tracing, a base URL, and a domain allowlist.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Relative paths resolved against a provider base URL
//! - Domain allowlist for security
//! - Per-request header maps for cookie/CSRF attachment

use reqwest::{header::HeaderMap, Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for Fiscorelay.
const USER_AGENT: &str = concat!("Fiscorelay/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing, base URL and domain allowlist.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    base_url: Option<Url>,
    allowed_domains: Option<Vec<String>>,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// The timeout bounds every request made through this client.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self {
            inner: client,
            base_url: None,
            allowed_domains: None,
        })
    }

    /// Sets the base URL relative paths are resolved against.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, HttpError> {
        let parsed = Url::parse(base_url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
        self.base_url = Some(parsed);
        Ok(self)
    }

    /// Restricts requests to the given domains (and their subdomains).
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Restricts requests to the hosts of the given URLs.
    pub fn with_allowed_hosts_of(self, urls: &[&str]) -> Result<Self, HttpError> {
        let hosts = urls
            .iter()
            .map(|raw| {
                let parsed = Url::parse(raw).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
                parsed
                    .host_str()
                    .map(ToString::to_string)
                    .ok_or_else(|| HttpError::InvalidUrl(format!("No host in {raw}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.with_allowed_domains(hosts))
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolves a path against the base URL.
    ///
    /// Absolute URLs are returned unchanged.
    pub fn url(&self, path_or_url: &str) -> Result<String, HttpError> {
        if let Ok(absolute) = Url::parse(path_or_url) {
            return Ok(absolute.to_string());
        }

        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| HttpError::InvalidUrl(format!("No base URL for {path_or_url}")))?;

        base.join(path_or_url)
            .map(|u| u.to_string())
            .map_err(|e| HttpError::InvalidUrl(e.to_string()))
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let Some(ref allowed) = self.allowed_domains else {
            return Ok(()); // No restrictions
        };

        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        // Check if host matches any allowed domain
        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }

    /// Performs a GET request.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        self.get_with_headers(url, HeaderMap::new()).await
    }

    /// Performs a GET request with custom headers.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Response, HttpError> {
        let url = self.url(url)?;
        self.is_domain_allowed(&url)?;
        debug!("GET request with headers");

        let response = self.inner.get(&url).headers(headers).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a GET request with a query string and custom headers.
    #[instrument(skip(self, query, headers), fields(url = %url))]
    pub async fn get_query_with_headers<Q: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &Q,
        headers: HeaderMap,
    ) -> Result<Response, HttpError> {
        let url = self.url(url)?;
        self.is_domain_allowed(&url)?;
        debug!("GET request with query");

        let response = self
            .inner
            .get(&url)
            .query(query)
            .headers(headers)
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a POST request with a JSON body and custom headers.
    #[instrument(skip(self, body, headers), fields(url = %url))]
    pub async fn post_json_with_headers<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: HeaderMap,
    ) -> Result<Response, HttpError> {
        let url = self.url(url)?;
        self.is_domain_allowed(&url)?;
        debug!("POST request with JSON");

        let response = self
            .inner
            .post(&url)
            .json(body)
            .headers(headers)
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Check if the response indicates an expired or missing session.
    fn is_unauthorized(&self) -> bool;
}

impl ResponseExt for Response {
    fn is_unauthorized(&self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_allowlist() {
        let client = HttpClient::new().unwrap().with_allowed_domains(vec![
            "app.fiscozen.it".to_string(),
            "europa.eu".to_string(),
        ]);

        // Allowed domains
        assert!(client.is_domain_allowed("https://app.fiscozen.it/api/v1/customers/").is_ok());

        // Subdomain matching
        assert!(client.is_domain_allowed("https://ec.europa.eu/taxation_customs").is_ok());

        // Not allowed
        assert!(client.is_domain_allowed("https://evil.com/steal").is_err());
    }

    #[test]
    fn test_allowed_hosts_of_urls() {
        let client = HttpClient::new()
            .unwrap()
            .with_allowed_hosts_of(&[
                "https://app.fiscozen.it",
                "http://127.0.0.1:8080/api",
            ])
            .unwrap();

        assert!(client.is_domain_allowed("https://app.fiscozen.it/api/v1/auth/login/").is_ok());
        assert!(client.is_domain_allowed("http://127.0.0.1:9999/other").is_ok());
        assert!(matches!(
            client.is_domain_allowed("https://fiscozen.it/"),
            Err(HttpError::DomainNotAllowed(_))
        ));
    }

    #[test]
    fn test_allowed_hosts_of_rejects_bad_urls() {
        let result = HttpClient::new().unwrap().with_allowed_hosts_of(&["not a url"]);
        assert!(matches!(result, Err(HttpError::InvalidUrl(_))));
    }

    #[test]
    fn test_no_domain_restrictions() {
        let client = HttpClient::new().unwrap();

        // All domains allowed when no restrictions
        assert!(client.is_domain_allowed("https://any.domain.com").is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new()
            .unwrap()
            .with_allowed_domains(vec!["example.com".to_string()]);

        // Completely invalid URL
        assert!(client.is_domain_allowed("not-a-valid-url").is_err());
    }

    #[test]
    fn test_relative_paths_join_base() {
        let client = HttpClient::new()
            .unwrap()
            .with_base_url("https://app.fiscozen.it")
            .unwrap();

        assert_eq!(
            client.url("/api/v1/customers/").unwrap(),
            "https://app.fiscozen.it/api/v1/customers/"
        );
        assert_eq!(
            client.url("https://api.zippopotam.us/IT/20121").unwrap(),
            "https://api.zippopotam.us/IT/20121"
        );
    }

    #[test]
    fn test_relative_path_without_base() {
        let client = HttpClient::new().unwrap();
        assert!(matches!(
            client.url("/login/"),
            Err(HttpError::InvalidUrl(_))
        ));
    }
}
