use std::fmt::Write as _;

use chrono::Utc;

use super::format::format_currency;
use super::{InvoiceError, InvoiceRenderer, RenderedDocument, TaxInvoice};

const RULE_WIDTH: usize = 64;
const LABEL_WIDTH: usize = 34;

/// Fixed-width plain text layout: title, vehicle header, one
/// `label : value` row per line and a signature block at the foot.
#[derive(Debug, Clone)]
pub struct PlainTextRenderer {
    currency: String,
}

impl PlainTextRenderer {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    fn layout(&self, invoice: &TaxInvoice) -> Result<String, std::fmt::Error> {
        let rule = "-".repeat(RULE_WIDTH);
        let mut out = String::new();

        writeln!(out, "{:^width$}", invoice.title, width = RULE_WIDTH)?;
        writeln!(out, "{rule}")?;
        writeln!(out, "{}", invoice.heading)?;
        writeln!(out, "Chassis No: {}", invoice.chassis_no)?;
        writeln!(out, "{rule}")?;

        for line in &invoice.lines {
            let value = format!("{} {}", self.currency, format_currency(line.value));
            if line.emphasized {
                writeln!(out)?;
                writeln!(
                    out,
                    "{:<width$}: {}",
                    line.label.to_uppercase(),
                    value,
                    width = LABEL_WIDTH
                )?;
            } else {
                writeln!(out, "{:<width$}: {}", line.label, value, width = LABEL_WIDTH)?;
            }
        }

        writeln!(out)?;
        writeln!(out)?;
        writeln!(out, "..............................")?;
        writeln!(out, "{}", invoice.signature)?;
        Ok(out)
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new("LKR")
    }
}

impl InvoiceRenderer for PlainTextRenderer {
    fn render(&self, invoice: &TaxInvoice) -> Result<RenderedDocument, InvoiceError> {
        let text = self
            .layout(invoice)
            .map_err(|e| InvoiceError::Io(std::io::Error::other(e)))?;

        Ok(RenderedDocument {
            file_name: format!(
                "Tax-Invoice-{}-{}.txt",
                invoice.chassis_no,
                Utc::now().timestamp_millis()
            ),
            content: text.into_bytes(),
        })
    }
}
