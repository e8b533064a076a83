//! Pass-through lookups used while filling in client records.
//!
//! Neither lookup needs a provider session:
//!
//! - VAT numbers are checked against the EU VIES service
//! - Italian postal codes are resolved to municipality and province

use std::sync::LazyLock;

use fiscorelay_core::{EventSink, WorkflowEvent};
use fiscorelay_fetch::HttpClient;
use regex::Regex;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::error::FiscozenError;

/// Italian VAT number, with or without the `IT` prefix.
static VAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:IT)?([0-9]{11})$").expect("Invalid regex"));

/// Italian postal code.
static CAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}$").expect("Invalid regex"));

// ============================================================================
// Results
// ============================================================================

/// Outcome of a VAT check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VatValidation {
    /// True iff VIES reported the number as valid.
    pub valid: bool,
    /// Raw VIES answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Why the check could not be completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VatValidation {
    fn failed(error: &str) -> Self {
        Self {
            valid: false,
            details: None,
            error: Some(error.to_string()),
        }
    }
}

/// Municipality and province for a postal code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Municipality.
    pub comune: String,
    /// Province.
    pub provincia: String,
    /// Why the lookup could not be completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct ZippopotamResponse {
    #[serde(default)]
    places: Vec<ZippopotamPlace>,
}

#[derive(Deserialize)]
struct ZippopotamPlace {
    #[serde(rename = "place name", default)]
    place_name: String,
    #[serde(default)]
    state: String,
}

/// Returns the 11 digits of an Italian VAT number, if well formed.
pub fn normalize_vat(vat: &str) -> Option<String> {
    let compact: String = vat.chars().filter(|c| !c.is_whitespace()).collect();
    VAT_RE
        .captures(&compact.to_uppercase())
        .map(|caps| caps[1].to_string())
}

// ============================================================================
// Lookup Client
// ============================================================================

/// Client for the VIES and postal code services.
#[derive(Debug, Clone)]
pub struct LookupClient {
    http: HttpClient,
    vies_url: String,
    location_url: String,
}

impl LookupClient {
    /// Creates a lookup client.
    pub fn new(http: HttpClient, vies_url: impl Into<String>, location_url: impl Into<String>) -> Self {
        Self {
            http,
            vies_url: vies_url.into(),
            location_url: location_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Checks an Italian VAT number.
    ///
    /// Malformed numbers are answered without a network call; service
    /// failures yield `valid: false` with an error note.
    #[instrument(skip(self, sink))]
    pub async fn validate_vat(&self, vat: &str, sink: &dyn EventSink) -> Result<VatValidation, FiscozenError> {
        if vat.trim().is_empty() {
            return Err(FiscozenError::InvalidInput("VAT number required".to_string()));
        }

        let Some(digits) = normalize_vat(vat) else {
            debug!("Malformed VAT number");
            return Ok(VatValidation::failed("Invalid VAT format"));
        };

        let validation = match self.query_vies(&digits).await {
            Ok(details) => VatValidation {
                valid: details.get("valid").and_then(Value::as_bool) == Some(true),
                details: Some(details),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "VAT validation service failed");
                VatValidation::failed("Validation service unavailable")
            }
        };

        sink.observe(&WorkflowEvent::LookupCompleted {
            kind: "vat".to_string(),
            key: digits,
            ok: validation.error.is_none(),
        });
        Ok(validation)
    }

    async fn query_vies(&self, digits: &str) -> Result<Value, FiscozenError> {
        let query = [("countryCode", "IT"), ("vatNumber", digits)];
        let response = self
            .http
            .get_query_with_headers(&self.vies_url, &query, HeaderMap::new())
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FiscozenError::LookupFailed(format!("VIES answered {status}")));
        }
        Ok(response.json().await?)
    }

    /// Resolves an Italian postal code.
    ///
    /// Codes that are not five digits are rejected; service failures yield
    /// empty fields with an error note.
    #[instrument(skip(self, sink))]
    pub async fn lookup_location(&self, cap: &str, sink: &dyn EventSink) -> Result<Location, FiscozenError> {
        if !CAP_RE.is_match(cap) {
            return Err(FiscozenError::InvalidInput("Valid CAP required".to_string()));
        }

        let location = match self.query_location(cap).await {
            Ok(location) => location,
            Err(e) => {
                warn!(error = %e, "Location service failed");
                Location {
                    error: Some("Location service unavailable".to_string()),
                    ..Location::default()
                }
            }
        };

        sink.observe(&WorkflowEvent::LookupCompleted {
            kind: "location".to_string(),
            key: cap.to_string(),
            ok: location.error.is_none(),
        });
        Ok(location)
    }

    async fn query_location(&self, cap: &str) -> Result<Location, FiscozenError> {
        let url = format!("{}/{cap}", self.location_url);
        let response = self.http.get(&url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FiscozenError::LookupFailed(format!("location service answered {status}")));
        }

        let body: ZippopotamResponse = response.json().await?;
        let place = body.places.into_iter().next();
        Ok(Location {
            comune: place.as_ref().map(|p| p.place_name.clone()).unwrap_or_default(),
            provincia: place.map(|p| p.state).unwrap_or_default(),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_vat() {
        assert_eq!(normalize_vat("12345678901").as_deref(), Some("12345678901"));
        assert_eq!(normalize_vat("IT12345678901").as_deref(), Some("12345678901"));
        assert_eq!(normalize_vat("it 123 456 789 01").as_deref(), Some("12345678901"));
        assert_eq!(normalize_vat("1234567890"), None);
        assert_eq!(normalize_vat("FR12345678901"), None);
    }

    #[test]
    fn test_cap_pattern() {
        assert!(CAP_RE.is_match("20121"));
        assert!(!CAP_RE.is_match("2012"));
        assert!(!CAP_RE.is_match("20121a"));
    }

    #[test]
    fn test_zippopotam_shape() {
        let json = r#"{"post code":"20121","places":[{"place name":"Milano","state":"Lombardia","state abbreviation":"MI"}]}"#;
        let body: ZippopotamResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.places[0].place_name, "Milano");
        assert_eq!(body.places[0].state, "Lombardia");
    }
}
