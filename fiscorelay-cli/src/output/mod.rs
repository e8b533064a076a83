//! Output formatting for CLI.

mod json;
mod text;

pub use json::{JsonFormatter, ReceiptOutput, ResolutionOutput};
pub use text::TextFormatter;
