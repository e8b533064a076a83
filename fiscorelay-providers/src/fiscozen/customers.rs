//! Customer resolution.
//!
//! A client becomes usable on an invoice once it carries a provider customer
//! id. Resolution walks `Searching → {Found, NotFound} → Resolved`:
//!
//! - a client that already has an id is resolved without any network call
//! - otherwise the provider is searched by legal name and the first match wins
//! - with no match the customer is created, and the new id is used

use fiscorelay_core::{ClientRecord, ResolutionSource, SearchResult, WorkflowEvent};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::AuthenticatedClient;
use super::error::FiscozenError;
use super::parser::{parse_created_customer, parse_search_response};
use super::settings::{CUSTOMERS_ENDPOINT, CUSTOMERS_PAGE};

/// Page size used for customer searches.
pub const SEARCH_PAGE_SIZE: u32 = 25;

/// Country sent with every created customer.
const CUSTOMER_COUNTRY: &str = "Italia";

/// Customer type sent with every created customer.
const CUSTOMER_TYPE: &str = "Società";

// ============================================================================
// Resolution State
// ============================================================================

/// A step of customer resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    /// A search is in flight.
    Searching,
    /// The search returned matches.
    Found {
        /// Number of matches.
        matches: usize,
    },
    /// The search returned nothing.
    NotFound,
    /// The client is linked to a provider id.
    Resolved {
        /// Provider customer id.
        customer_id: String,
        /// How the id was obtained.
        source: ResolutionSource,
    },
}

/// A resolved client and how it got there.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The client, with `provider_customer_id` set.
    pub client: ClientRecord,
    /// How the id was obtained.
    pub source: ResolutionSource,
    /// States visited, in order.
    pub trail: Vec<ResolutionState>,
}

impl Resolution {
    /// Returns the provider customer id.
    pub fn customer_id(&self) -> &str {
        self.client.provider_customer_id.as_deref().unwrap_or_default()
    }
}

// ============================================================================
// Create Payload
// ============================================================================

/// Customer as the provider's create endpoint expects it.
#[derive(Debug, Serialize)]
pub struct CreateCustomerPayload<'a> {
    country: &'static str,
    customer_type: &'static str,
    vat_number: &'a str,
    fiscal_code: &'a str,
    company_name: &'a str,
    postcode: &'a str,
    municipality: &'a str,
    address: &'a str,
    contact_person: &'a str,
    email: &'a str,
    phone: &'a str,
    destination_code: &'a str,
    pec: &'a str,
}

impl<'a> From<&'a ClientRecord> for CreateCustomerPayload<'a> {
    fn from(client: &'a ClientRecord) -> Self {
        Self {
            country: CUSTOMER_COUNTRY,
            customer_type: CUSTOMER_TYPE,
            vat_number: &client.tax_id,
            // The provider wants a fiscal code; companies use their VAT number.
            fiscal_code: &client.tax_id,
            company_name: &client.legal_name,
            postcode: &client.postal_code,
            municipality: &client.municipality,
            address: &client.address,
            contact_person: &client.contact_person,
            email: &client.email,
            phone: &client.phone,
            destination_code: &client.recipient_code,
            pec: &client.certified_email,
        }
    }
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    search: &'a str,
    page: u32,
    page_size: u32,
}

// ============================================================================
// Customer Resolver
// ============================================================================

/// Searches, creates and resolves provider customers.
#[derive(Debug, Clone, Copy)]
pub struct CustomerResolver<'a> {
    client: &'a AuthenticatedClient,
}

impl<'a> CustomerResolver<'a> {
    /// Creates a resolver over an authenticated client.
    pub fn new(client: &'a AuthenticatedClient) -> Self {
        Self { client }
    }

    /// Searches customers by name.
    ///
    /// An empty result is a valid answer. `tax_id` is only recorded; the
    /// provider's search matches on names.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn search(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Vec<SearchResult>, FiscozenError> {
        if name.trim().is_empty() {
            return Err(FiscozenError::InvalidInput("Company name required".to_string()));
        }

        let query = SearchQuery {
            search: name,
            page: 1,
            page_size: SEARCH_PAGE_SIZE,
        };
        let response = self.client.get(CUSTOMERS_ENDPOINT, &query, None).await?;

        if !response.is_success() {
            warn!(status = response.status, "Customer search rejected");
            return Err(FiscozenError::ApiError {
                status: response.status,
                body: response.body,
            });
        }

        let results = parse_search_response(&response.body)?;
        debug!(results = results.len(), tax_id = ?tax_id, "Customer search completed");

        self.client.sink().observe(&WorkflowEvent::CustomerSearched {
            query: name.to_string(),
            results: results.len(),
        });
        Ok(results)
    }

    /// Creates a customer and returns its provider id.
    #[instrument(skip(self, client), fields(legal_name = %client.legal_name))]
    pub async fn create(&self, client: &ClientRecord) -> Result<String, FiscozenError> {
        if !client.has_legal_name() {
            return Err(FiscozenError::MissingClient);
        }

        let payload = CreateCustomerPayload::from(client);
        let response = match self
            .client
            .post(CUSTOMERS_ENDPOINT, &payload, Some(CUSTOMERS_PAGE))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.report_creation_failure(client, None, &e.to_string());
                return Err(e);
            }
        };

        if !response.is_success() {
            self.report_creation_failure(client, Some(response.status), &response.message());
            return Err(FiscozenError::ClientCreationFailed {
                status: response.status,
                body: response.body,
            });
        }

        let id = parse_created_customer(&response.body)?;
        info!(customer_id = %id, "Customer created");
        self.client.sink().observe(&WorkflowEvent::CustomerResolved {
            customer_id: id.clone(),
            legal_name: client.legal_name.clone(),
            source: ResolutionSource::Created,
        });
        Ok(id)
    }

    /// Returns the first customer matching the client's legal name.
    pub async fn find_existing(
        &self,
        client: &ClientRecord,
    ) -> Result<Option<SearchResult>, FiscozenError> {
        let results = self.search(&client.legal_name, client.tax_id()).await?;
        first_usable(results)
    }

    /// Links `client` to a provider customer, creating one if needed.
    ///
    /// Never creates when the search has at least one match, and makes no
    /// network call when the client already carries an id.
    #[instrument(skip(self, client), fields(legal_name = %client.legal_name))]
    pub async fn resolve_or_create(
        &self,
        client: ClientRecord,
    ) -> Result<Resolution, FiscozenError> {
        if client.is_resolved() {
            let customer_id = client.provider_customer_id.clone().unwrap_or_default();
            debug!(customer_id = %customer_id, "Client already resolved");
            return Ok(Resolution {
                client,
                source: ResolutionSource::Existing,
                trail: vec![ResolutionState::Resolved {
                    customer_id,
                    source: ResolutionSource::Existing,
                }],
            });
        }

        if !client.has_legal_name() {
            return Err(FiscozenError::MissingClient);
        }

        let mut trail = vec![ResolutionState::Searching];
        let results = self.search(&client.legal_name, client.tax_id()).await?;

        let matches = results.len();
        let (client, source) = if let Some(first) = first_usable(results)? {
            trail.push(ResolutionState::Found { matches });
            let resolved = first.merge_into(client);
            self.client.sink().observe(&WorkflowEvent::CustomerResolved {
                customer_id: first.provider_customer_id.clone(),
                legal_name: resolved.legal_name.clone(),
                source: ResolutionSource::Search,
            });
            (resolved, ResolutionSource::Search)
        } else {
            trail.push(ResolutionState::NotFound);
            let id = self.create(&client).await?;
            (client.with_provider_id(id), ResolutionSource::Created)
        };

        let customer_id = client.provider_customer_id.clone().unwrap_or_default();
        info!(customer_id = %customer_id, source = source.as_str(), "Customer resolved");
        trail.push(ResolutionState::Resolved {
            customer_id,
            source,
        });

        Ok(Resolution {
            client,
            source,
            trail,
        })
    }

    fn report_creation_failure(&self, client: &ClientRecord, status: Option<u16>, error: &str) {
        warn!(status = ?status, error = %error, "Customer creation failed");
        self.client.sink().observe(&WorkflowEvent::CustomerCreationFailed {
            legal_name: client.legal_name.clone(),
            status,
            error: error.to_string(),
        });
    }
}

/// First match carrying an id. Matches without one cannot be invoiced, and
/// a non-empty answer where none has an id is not a "no match".
fn first_usable(results: Vec<SearchResult>) -> Result<Option<SearchResult>, FiscozenError> {
    let matches = results.len();
    match results
        .into_iter()
        .find(|r| !r.provider_customer_id.is_empty())
    {
        Some(found) => Ok(Some(found)),
        None if matches == 0 => Ok(None),
        None => Err(FiscozenError::UnrecognizedResponseShape(format!(
            "customer search: {matches} match(es) without an id"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(id: &str) -> SearchResult {
        SearchResult {
            provider_customer_id: id.to_string(),
            legal_name: "Acme Srl".to_string(),
            ..SearchResult::default()
        }
    }

    #[test]
    fn test_first_usable_skips_matches_without_id() {
        let first = first_usable(vec![found(""), found("9")]).unwrap().unwrap();
        assert_eq!(first.provider_customer_id, "9");
        assert!(first_usable(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn test_first_usable_rejects_only_idless_matches() {
        let err = first_usable(vec![found(""), found("")]).unwrap_err();
        assert!(matches!(err, FiscozenError::UnrecognizedResponseShape(_)));
    }

    #[test]
    fn test_create_payload_mapping() {
        let client = ClientRecord {
            legal_name: "Acme Srl".to_string(),
            tax_id: "12345678901".to_string(),
            postal_code: "20121".to_string(),
            municipality: "Milano".to_string(),
            recipient_code: "M5UXCR1".to_string(),
            certified_email: "acme@pec.it".to_string(),
            ..ClientRecord::default()
        };

        let value = serde_json::to_value(CreateCustomerPayload::from(&client)).unwrap();
        assert_eq!(value["country"], "Italia");
        assert_eq!(value["customer_type"], "Società");
        assert_eq!(value["company_name"], "Acme Srl");
        assert_eq!(value["vat_number"], "12345678901");
        assert_eq!(value["fiscal_code"], "12345678901");
        assert_eq!(value["postcode"], "20121");
        assert_eq!(value["destination_code"], "M5UXCR1");
        assert_eq!(value["pec"], "acme@pec.it");
    }
}
