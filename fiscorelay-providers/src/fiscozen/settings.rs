//! Fiscozen connection settings.

use std::time::Duration;

use fiscorelay_core::DEFAULT_SESSION_TTL_HOURS;
use fiscorelay_fetch::{HttpClient, HttpError, RetryStrategy};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, ORIGIN, REFERER,
    USER_AGENT,
};

use super::error::FiscozenError;

// ============================================================================
// Constants
// ============================================================================

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://app.fiscozen.it";

/// Unauthenticated pages that may hand out the CSRF cookie, in probe order.
pub const DEFAULT_LANDING_PATHS: &[&str] = &["/", "/auth/login/", "/login/", "/accounts/login/"];

/// Login endpoint.
pub const LOGIN_ENDPOINT: &str = "/api/v1/auth/login/";

/// Customer collection endpoint (search and create).
pub const CUSTOMERS_ENDPOINT: &str = "/api/v1/customers/";

/// Invoice collection endpoint.
pub const INVOICES_ENDPOINT: &str = "/api/v1/invoices/";

/// Page the provider expects customer creation to come from.
pub const CUSTOMERS_PAGE: &str = "/app/clienti";

/// Page the provider expects invoice creation to come from.
pub const NEW_INVOICE_PAGE: &str = "/app/fatture/nuova";

/// EU VIES VAT check service.
pub const DEFAULT_VIES_URL: &str = "https://ec.europa.eu/taxation_customs/vies/services/checkVatService";

/// Postal code lookup service for Italy.
pub const DEFAULT_LOCATION_URL: &str = "https://api.zippopotam.us/IT";

/// Browser user agent the provider's bot detection accepts.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Accept-Language sent with every provider request.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "it-IT,it;q=0.9,en;q=0.8";

/// CSRF header name expected by the provider.
pub const CSRF_HEADER: &str = "x-csrftoken";

/// Marker header for XHR requests.
const REQUESTED_WITH: &str = "x-requested-with";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_JSON: &str = "application/json, text/plain, */*";

// ============================================================================
// Settings
// ============================================================================

/// Everything the Fiscozen integration needs to reach the provider.
#[derive(Debug, Clone)]
pub struct FiscozenSettings {
    /// Provider base URL, without trailing slash.
    pub base_url: String,
    /// Landing pages probed for the CSRF cookie.
    pub landing_paths: Vec<String>,
    /// User-Agent header.
    pub user_agent: String,
    /// Accept-Language header.
    pub accept_language: String,
    /// Transport timeout for a single request.
    pub timeout: Duration,
    /// Lifetime of an established session.
    pub session_ttl: chrono::Duration,
    /// Attempts per landing candidate on transient failures.
    pub landing_retry_attempts: u32,
    /// Base backoff between landing attempts.
    pub landing_retry_base: Duration,
    /// Deadline for one workflow step.
    pub step_timeout: Duration,
    /// VIES service URL.
    pub vies_url: String,
    /// Postal code lookup base URL.
    pub location_url: String,
}

impl Default for FiscozenSettings {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl FiscozenSettings {
    /// Creates settings for the given base URL with default tuning.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            landing_paths: DEFAULT_LANDING_PATHS.iter().map(ToString::to_string).collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(30),
            session_ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            landing_retry_attempts: 1,
            landing_retry_base: Duration::from_millis(250),
            step_timeout: Duration::from_secs(60),
            vies_url: DEFAULT_VIES_URL.to_string(),
            location_url: DEFAULT_LOCATION_URL.to_string(),
        }
    }

    /// Returns the Origin header value.
    pub fn origin(&self) -> &str {
        &self.base_url
    }

    /// Returns the Referer for a page on the provider; `None` means the root.
    pub fn referer(&self, page: Option<&str>) -> String {
        match page {
            Some(page) => format!("{}{}", self.base_url, page),
            None => format!("{}/", self.base_url),
        }
    }

    /// Returns the retry policy for the landing probe.
    pub fn landing_retry(&self) -> RetryStrategy {
        RetryStrategy::new(self.landing_retry_attempts).with_base_delay(self.landing_retry_base)
    }

    /// Builds the HTTP client bound to the provider base URL.
    ///
    /// Only the provider host is reachable through it.
    pub fn http_client(&self) -> Result<HttpClient, FiscozenError> {
        Ok(HttpClient::with_timeout(self.timeout)?
            .with_base_url(&self.base_url)?
            .with_allowed_hosts_of(&[&self.base_url])?)
    }

    /// Builds the HTTP client for the VIES and postal code services.
    pub fn lookup_http_client(&self) -> Result<HttpClient, FiscozenError> {
        Ok(HttpClient::with_timeout(self.timeout)?
            .with_allowed_hosts_of(&[&self.vies_url, &self.location_url])?)
    }

    /// Headers for fetching an HTML landing page.
    pub fn landing_headers(&self) -> Result<HeaderMap, FiscozenError> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, USER_AGENT, &self.user_agent)?;
        insert(&mut headers, ACCEPT, ACCEPT_HTML)?;
        insert(&mut headers, ACCEPT_LANGUAGE, &self.accept_language)?;
        Ok(headers)
    }

    /// Headers the provider's API expects from its own web app.
    pub fn api_headers(&self, page: Option<&str>) -> Result<HeaderMap, FiscozenError> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, REFERER, &self.referer(page))?;
        insert(&mut headers, ORIGIN, self.origin())?;
        insert(&mut headers, USER_AGENT, &self.user_agent)?;
        insert(&mut headers, ACCEPT, ACCEPT_JSON)?;
        insert(&mut headers, ACCEPT_LANGUAGE, &self.accept_language)?;
        Ok(headers)
    }

    /// Headers for an XHR call from the provider's web app: the API
    /// headers plus cookies, the CSRF token when there is one, and
    /// `X-Requested-With`.
    pub fn xhr_headers(
        &self,
        page: Option<&str>,
        cookie_header: &str,
        csrf_token: Option<&str>,
    ) -> Result<HeaderMap, FiscozenError> {
        let mut headers = self.api_headers(page)?;
        insert(&mut headers, COOKIE, cookie_header)?;
        if let Some(token) = csrf_token.filter(|t| !t.is_empty()) {
            insert(&mut headers, HeaderName::from_static(CSRF_HEADER), token)?;
        }
        insert(&mut headers, HeaderName::from_static(REQUESTED_WITH), "XMLHttpRequest")?;
        Ok(headers)
    }
}

/// Inserts a header, rejecting values that cannot go on the wire.
fn insert(
    headers: &mut HeaderMap,
    name: HeaderName,
    value: &str,
) -> Result<(), FiscozenError> {
    let value = HeaderValue::from_str(value)
        .map_err(|_| HttpError::InvalidHeader(name.as_str().to_string()))?;
    headers.insert(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = FiscozenSettings::default();
        assert_eq!(settings.base_url, "https://app.fiscozen.it");
        assert_eq!(settings.landing_paths.len(), 4);
        assert_eq!(settings.landing_paths[0], "/");
        assert_eq!(settings.session_ttl, chrono::Duration::hours(24));
        assert_eq!(settings.landing_retry().max_attempts, 1);
    }

    #[test]
    fn test_referer_and_origin_follow_base_url() {
        let settings = FiscozenSettings::new("http://127.0.0.1:8080/");
        assert_eq!(settings.origin(), "http://127.0.0.1:8080");
        assert_eq!(settings.referer(None), "http://127.0.0.1:8080/");
        assert_eq!(
            settings.referer(Some(NEW_INVOICE_PAGE)),
            "http://127.0.0.1:8080/app/fatture/nuova"
        );
    }

    #[test]
    fn test_api_headers() {
        let settings = FiscozenSettings::default();
        let headers = settings.api_headers(Some(CUSTOMERS_PAGE)).unwrap();
        assert_eq!(headers[REFERER], "https://app.fiscozen.it/app/clienti");
        assert_eq!(headers[ORIGIN], "https://app.fiscozen.it");
        assert_eq!(headers[ACCEPT_LANGUAGE], DEFAULT_ACCEPT_LANGUAGE);
    }

    #[test]
    fn test_xhr_headers() {
        let settings = FiscozenSettings::default();
        let headers = settings
            .xhr_headers(None, "csrftoken=abc; sessionid=s1", Some("abc"))
            .unwrap();
        assert_eq!(headers[COOKIE], "csrftoken=abc; sessionid=s1");
        assert_eq!(headers[CSRF_HEADER], "abc");
        assert_eq!(headers[REQUESTED_WITH], "XMLHttpRequest");
        assert_eq!(headers[ORIGIN], "https://app.fiscozen.it");

        let without_token = settings.xhr_headers(None, "sessionid=s1", Some("")).unwrap();
        assert!(!without_token.contains_key(CSRF_HEADER));
        assert_eq!(without_token[REQUESTED_WITH], "XMLHttpRequest");
    }

    #[tokio::test]
    async fn test_provider_client_stays_on_the_provider_host() {
        let settings = FiscozenSettings::default();
        let http = settings.http_client().unwrap();
        assert!(matches!(
            http.get("https://evil.example.com/steal").await,
            Err(HttpError::DomainNotAllowed(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_client_reaches_only_lookup_services() {
        let settings = FiscozenSettings::default();
        let http = settings.lookup_http_client().unwrap();
        assert!(matches!(
            http.get("https://app.fiscozen.it/api/v1/customers/").await,
            Err(HttpError::DomainNotAllowed(_))
        ));
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let mut settings = FiscozenSettings::default();
        settings.user_agent = "bad\nagent".to_string();
        assert!(matches!(
            settings.landing_headers(),
            Err(FiscozenError::HttpError(_))
        ));
    }
}
