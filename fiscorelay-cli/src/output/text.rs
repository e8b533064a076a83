//! Text output formatting with colors.

use fiscorelay_core::{
    truncate_secret, Extraction, InvoiceReceipt, SearchResult,
};
use fiscorelay_providers::fiscozen::{Location, LoginOutcome, ProcessOutcome, Resolution, VatValidation};
use fiscorelay_store::{LogEntry, SessionSummary};
use rust_decimal::Decimal;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Widest name shown in tables.
const NAME_WIDTH: usize = 32;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a successful login.
    pub fn format_login(&self, outcome: &LoginOutcome) -> String {
        [
            format!("{} ({})", self.green("Logged in"), outcome.method.as_str()),
            format!("Session: {}", self.dim(&truncate_secret(&outcome.token))),
            format!(
                "Expires: {}",
                outcome.expires_at.format("%Y-%m-%d %H:%M UTC")
            ),
        ]
        .join("\n")
    }

    /// Formats customer search results.
    pub fn format_search_results(&self, query: &str, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return format!("No customers match {}", self.bold(query));
        }

        let mut lines = vec![
            format!(
                "{:<10} {:<width$} {:<16} {}",
                self.bold("ID"),
                self.bold("Ragione Sociale"),
                self.bold("Partita IVA"),
                self.bold("Comune"),
                width = NAME_WIDTH
            ),
            "─".repeat(72),
        ];
        for result in results {
            let location = match (result.municipality.as_str(), result.province.as_str()) {
                ("", _) => String::new(),
                (comune, "") => comune.to_string(),
                (comune, provincia) => format!("{comune} ({provincia})"),
            };
            lines.push(format!(
                "{:<10} {:<width$} {:<16} {}",
                result.provider_customer_id,
                clip(&result.legal_name, NAME_WIDTH),
                result.tax_id,
                location,
                width = NAME_WIDTH
            ));
        }
        lines.push(self.dim(&format!("{} result(s)", results.len())));
        lines.join("\n")
    }

    /// Formats a customer resolution.
    pub fn format_resolution(&self, resolution: &Resolution) -> String {
        format!(
            "{} → {} ({})",
            self.bold(&resolution.client.legal_name),
            self.cyan(resolution.customer_id()),
            resolution.source.as_str()
        )
    }

    /// Formats a created invoice.
    pub fn format_receipt(&self, receipt: &InvoiceReceipt) -> String {
        match &receipt.invoice_number {
            Some(number) => format!(
                "{} {} (id {})",
                self.green("Invoice created:"),
                self.bold(number),
                receipt.id
            ),
            None => format!("{} id {}", self.green("Invoice created:"), receipt.id),
        }
    }

    /// Formats an extraction.
    pub fn format_extraction(&self, extraction: &Extraction) -> String {
        let tx = &extraction.transaction;
        let mut lines = vec![
            format!("Amount:  {}", self.bold(&money(tx.amount, &tx.currency))),
            format!("Client:  {}", extraction.client.legal_name),
        ];
        if let Some(tax_id) = extraction.client.tax_id() {
            lines.push(format!("VAT:     {tax_id}"));
        }
        if let Some(date) = tx.date {
            lines.push(format!("Date:    {date}"));
        }
        if !tx.description.is_empty() {
            lines.push(format!("Service: {}", self.dim(&tx.description)));
        }
        lines.join("\n")
    }

    /// Formats a completed pipeline run.
    pub fn format_process(&self, outcome: &ProcessOutcome) -> String {
        let customer = outcome
            .client
            .provider_customer_id
            .as_deref()
            .unwrap_or_default();
        [
            self.format_extraction(&outcome.extraction),
            format!(
                "Customer: {} ({})",
                self.cyan(customer),
                outcome.resolution.as_str()
            ),
            self.format_receipt(&outcome.receipt),
        ]
        .join("\n")
    }

    /// Formats a VAT check.
    pub fn format_vat(&self, vat: &str, validation: &VatValidation) -> String {
        if let Some(error) = &validation.error {
            return format!("{vat}: {} ({error})", self.yellow("not verified"));
        }
        let name = validation
            .details
            .as_ref()
            .and_then(|d| d.get("name"))
            .and_then(|n| n.as_str())
            .filter(|n| !n.trim().is_empty() && *n != "---");
        let status = if validation.valid {
            self.green("valid")
        } else {
            self.red("invalid")
        };
        match name {
            Some(name) => format!("{vat}: {status} - {name}"),
            None => format!("{vat}: {status}"),
        }
    }

    /// Formats a postal code lookup.
    pub fn format_location(&self, cap: &str, location: &Location) -> String {
        if let Some(error) = &location.error {
            return format!("{cap}: {} ({error})", self.yellow("not found"));
        }
        format!("{cap}: {} ({})", self.bold(&location.comune), location.provincia)
    }

    /// Formats session log entries, newest first.
    pub fn format_logs(&self, entries: &[LogEntry]) -> String {
        if entries.is_empty() {
            return self.dim("No log entries");
        }
        entries
            .iter()
            .map(|entry| {
                let level = match entry.level.as_str() {
                    "error" => self.red("ERROR"),
                    "warn" => self.yellow("WARN "),
                    _ => self.green("INFO "),
                };
                let data = entry
                    .data
                    .as_ref()
                    .filter(|d| !d.is_null())
                    .map(|d| format!(" {}", self.dim(&d.to_string())))
                    .unwrap_or_default();
                format!("{} {level} {}{data}", self.dim(&entry.timestamp), entry.message)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats saved sessions.
    pub fn format_sessions(&self, sessions: &[SessionSummary]) -> String {
        if sessions.is_empty() {
            return self.dim("No saved sessions");
        }
        let mut lines = vec![format!(
            "{:<36} {:<23} {:<width$} {:<10} {}",
            self.bold("ID"),
            self.bold("Timestamp"),
            self.bold("Ragione Sociale"),
            self.bold("Status"),
            self.bold("Client"),
            width = NAME_WIDTH
        )];
        for session in sessions {
            lines.push(format!(
                "{:<36} {:<23} {:<width$} {:<10} {}",
                session.id,
                session.timestamp,
                clip(session.ragione_sociale.as_deref().unwrap_or_default(), NAME_WIDTH),
                session.status.as_deref().unwrap_or_default(),
                session.created_client_id.as_deref().unwrap_or("−"),
                width = NAME_WIDTH
            ));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Formats an amount with two decimals and its currency.
pub fn money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {currency}", amount.round_dp(2))
}

/// Shortens `text` to `width` characters.
fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}
