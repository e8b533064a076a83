//! Client-related types.
//!
//! The wire names follow the presentation layer's Italian vocabulary
//! (`ragioneSociale`, `partitaIVA`, ...). English aliases are accepted on
//! input so programmatic callers can use either spelling.

use serde::{Deserialize, Serialize};

// ============================================================================
// Client Record
// ============================================================================

/// A customer as known locally.
///
/// `provider_customer_id` stays `None` until the record has been confirmed
/// to exist on the provider, either by search or by creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Company legal name.
    #[serde(rename = "ragioneSociale", alias = "legalName", default)]
    pub legal_name: String,
    /// VAT number or fiscal code.
    #[serde(rename = "partitaIVA", alias = "taxId", default)]
    pub tax_id: String,
    /// Street address.
    #[serde(rename = "indirizzo", alias = "address", default)]
    pub address: String,
    /// Postal code (CAP).
    #[serde(rename = "cap", alias = "postalCode", default)]
    pub postal_code: String,
    /// Municipality (comune).
    #[serde(rename = "comune", alias = "municipality", default)]
    pub municipality: String,
    /// Province code.
    #[serde(rename = "provincia", alias = "province", default)]
    pub province: String,
    /// SDI recipient code.
    #[serde(rename = "codiceDestinatario", alias = "recipientCode", default)]
    pub recipient_code: String,
    /// Certified e-mail (PEC).
    #[serde(rename = "pec", alias = "certifiedEmail", default)]
    pub certified_email: String,
    /// Contact e-mail.
    #[serde(default)]
    pub email: String,
    /// Phone number.
    #[serde(rename = "telefono", alias = "phone", default)]
    pub phone: String,
    /// Contact person.
    #[serde(rename = "referente", alias = "contactPerson", default)]
    pub contact_person: String,
    /// Provider-side customer id, once resolved.
    #[serde(
        rename = "id",
        alias = "providerCustomerId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provider_customer_id: Option<String>,
}

impl ClientRecord {
    /// Creates a record with only a legal name.
    pub fn named(legal_name: impl Into<String>) -> Self {
        Self {
            legal_name: legal_name.into(),
            ..Self::default()
        }
    }

    /// Returns true if the record carries a non-blank legal name.
    pub fn has_legal_name(&self) -> bool {
        !self.legal_name.trim().is_empty()
    }

    /// Returns true if the provider customer id is known.
    pub fn is_resolved(&self) -> bool {
        self.provider_customer_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }

    /// Returns the tax id, if one is set.
    pub fn tax_id(&self) -> Option<&str> {
        let tax_id = self.tax_id.trim();
        (!tax_id.is_empty()).then_some(tax_id)
    }

    /// Returns a copy of this record linked to a provider customer id.
    pub fn with_provider_id(mut self, id: impl Into<String>) -> Self {
        self.provider_customer_id = Some(id.into());
        self
    }
}

// ============================================================================
// Search Result
// ============================================================================

/// Read projection of a provider-side customer.
///
/// Never persisted beyond the request that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider customer id.
    #[serde(rename = "id")]
    pub provider_customer_id: String,
    /// Company legal name.
    #[serde(rename = "ragioneSociale")]
    pub legal_name: String,
    /// VAT number or fiscal code.
    #[serde(rename = "partitaIVA")]
    pub tax_id: String,
    /// Municipality.
    #[serde(rename = "comune")]
    pub municipality: String,
    /// Province.
    #[serde(rename = "provincia")]
    pub province: String,
    /// Street address.
    #[serde(rename = "indirizzo")]
    pub address: String,
    /// Contact e-mail.
    pub email: String,
    /// Phone number.
    #[serde(rename = "telefono")]
    pub phone: String,
}

impl SearchResult {
    /// Merges this provider-side view into a local record, keeping local
    /// values where the provider has none.
    pub fn merge_into(&self, mut client: ClientRecord) -> ClientRecord {
        fn fill(target: &mut String, source: &str) {
            if target.trim().is_empty() && !source.is_empty() {
                *target = source.to_string();
            }
        }

        fill(&mut client.legal_name, &self.legal_name);
        fill(&mut client.tax_id, &self.tax_id);
        fill(&mut client.municipality, &self.municipality);
        fill(&mut client.province, &self.province);
        fill(&mut client.address, &self.address);
        fill(&mut client.email, &self.email);
        fill(&mut client.phone, &self.phone);
        client.provider_customer_id = Some(self.provider_customer_id.clone());
        client
    }
}

// ============================================================================
// Tests
// ============================================================================
