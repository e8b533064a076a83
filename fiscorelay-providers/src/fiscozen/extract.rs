//! Pattern-based transaction extractor.
//!
//! Used when no language model is configured. It recognizes:
//!
//! - an amount with its currency (`$`/USD, `£`/GBP, `€`/EUR/euro)
//! - an Italian VAT number after `p.iva`, `partita iva` or `vat`
//! - a date in `YYYY-MM-DD` or `DD/MM/YYYY` form
//! - well-known payment processors and SaaS vendors as the counterparty

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use fiscorelay_core::{
    ClientRecord, CoreError, Extraction, LineItem, TransactionData, TransactionExtractor,
};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

/// Counterparty name when no known vendor is mentioned.
pub const UNKNOWN_CLIENT: &str = "Cliente da identificare";

/// Longest description kept from the text.
const MAX_DESCRIPTION: usize = 100;

// ============================================================================
// Regex Patterns
// ============================================================================

static USD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$\s*(\d+(?:[.,]\d{1,2})?)|(\d+(?:[.,]\d{1,2})?)\s*(?:\$|usd\b)")
        .expect("Invalid regex")
});

static GBP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)£\s*(\d+(?:[.,]\d{1,2})?)|(\d+(?:[.,]\d{1,2})?)\s*(?:£|gbp\b)")
        .expect("Invalid regex")
});

static EUR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:€|\beur\b|\beuro\b)\s*(\d+(?:[.,]\d{1,2})?)|(\d+(?:[.,]\d{1,2})?)\s*(?:€|eur\b|euro\b)")
        .expect("Invalid regex")
});

static VAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:p\.?\s?iva|partita iva|vat)\s*:?\s*(?:IT)?(\d{11})").expect("Invalid regex")
});

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("Invalid regex"));

static EU_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("Invalid regex"));

static VENDOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(stripe|paypal|google|apple|microsoft|amazon|meta|facebook|netflix|spotify|adobe|salesforce|zoom|slack|github|gitlab|aws|azure|digital ocean|heroku|vercel|netlify)(?:\s+(?:inc|ltd|srl|spa)\b\.?)?",
    )
    .expect("Invalid regex")
});

// ============================================================================
// Helpers
// ============================================================================

fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', ".")).ok()
}

/// Returns the first amount captured by either alternative of `re`.
fn capture_amount(re: &Regex, text: &str) -> Option<Decimal> {
    let caps = re.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| parse_amount(m.as_str()))
}

/// Finds the amount and currency, preferring USD, then GBP, then EUR.
pub fn find_amount(text: &str) -> Option<(Decimal, &'static str)> {
    [(&*USD_RE, "USD"), (&*GBP_RE, "GBP"), (&*EUR_RE, "EUR")]
        .into_iter()
        .find_map(|(re, currency)| capture_amount(re, text).map(|amount| (amount, currency)))
}

/// Finds an Italian VAT number.
pub fn find_vat(text: &str) -> Option<String> {
    VAT_RE.captures(text).map(|caps| caps[1].to_string())
}

/// Finds a payment date.
pub fn find_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE_RE.captures(text) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        if date.is_some() {
            return date;
        }
    }
    let caps = EU_DATE_RE.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps[3].parse().ok()?,
        caps[2].parse().ok()?,
        caps[1].parse().ok()?,
    )
}

/// Finds a well-known vendor name.
pub fn find_vendor(text: &str) -> Option<String> {
    VENDOR_RE.find(text).map(|m| m.as_str().trim().to_string())
}

fn describe(text: &str) -> String {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    line.chars().take(MAX_DESCRIPTION).collect()
}

// ============================================================================
// Regex Extractor
// ============================================================================

/// Extractor built on regular expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexExtractor;

impl RegexExtractor {
    /// Creates the extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extracts synchronously.
    pub fn extract_text(&self, text: &str) -> Result<Extraction, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::Extraction("empty text".to_string()));
        }

        let (amount, currency) = find_amount(text)
            .ok_or_else(|| CoreError::Extraction("no amount found".to_string()))?;
        let description = describe(text);

        let client = ClientRecord {
            legal_name: find_vendor(text).unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
            tax_id: find_vat(text).unwrap_or_default(),
            ..ClientRecord::default()
        };

        debug!(
            amount = %amount,
            currency,
            client = %client.legal_name,
            "Regex extraction completed"
        );

        Ok(Extraction {
            transaction: TransactionData {
                amount,
                currency: currency.to_string(),
                services: vec![LineItem::new(description.clone(), amount)],
                date: find_date(text),
                description,
                original_text: text.to_string(),
            },
            client,
        })
    }
}

impl TransactionExtractor for RegexExtractor {
    fn name(&self) -> &str {
        "regex"
    }

    async fn extract(&self, text: &str) -> Result<Extraction, CoreError> {
        self.extract_text(text)
    }
}
