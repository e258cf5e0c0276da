//! Tax payment invoice for a saved record.
//!
//! [`TaxInvoice`] fixes the exact line set and order; an [`InvoiceRenderer`]
//! decides how it looks on the page.

mod format;
mod text;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

pub use format::format_currency;
pub use text::PlainTextRenderer;

use crate::calculations::common::round_whole;
use crate::models::{TaxRecord, Vehicle};

pub const INVOICE_TITLE: &str = "Tax Payment";
pub const SIGNATURE_LABEL: &str = "Authorized Signature";

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("record for '{record}' does not belong to vehicle '{vehicle}'")]
    VehicleMismatch { record: String, vehicle: String },

    #[error("failed to write invoice: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLine {
    pub label: &'static str,
    pub value: Decimal,
    /// Set on the final sold-price line only.
    pub emphasized: bool,
}

impl InvoiceLine {
    fn plain(label: &'static str, value: Decimal) -> Self {
        Self {
            label,
            value: round_whole(value),
            emphasized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxInvoice {
    pub title: &'static str,
    /// "Maker Model"
    pub heading: String,
    pub chassis_no: String,
    pub lines: Vec<InvoiceLine>,
    pub signature: &'static str,
}

impl TaxInvoice {
    /// Builds the invoice lines from a saved record.
    ///
    /// Raw totals and inputs are rounded for display; derived figures are
    /// whole already.
    pub fn from_record(vehicle: &Vehicle, record: &TaxRecord) -> Result<Self, InvoiceError> {
        if vehicle.chassis_no != record.chassis_no {
            return Err(InvoiceError::VehicleMismatch {
                record: record.chassis_no.clone(),
                vehicle: vehicle.chassis_no.clone(),
            });
        }

        let lines = vec![
            InvoiceLine::plain("Total Cost", record.total_cost),
            InvoiceLine::plain("Transfer Amount", record.transfer_amount),
            InvoiceLine::plain(
                "Total Cost Without Transfer",
                record.total_cost_excluding_transfer,
            ),
            InvoiceLine::plain("Expected Profit", record.expected_profit),
            InvoiceLine::plain("Cost with Profit", record.cost_with_profit),
            InvoiceLine::plain("Levy (1.25%)", record.levy),
            InvoiceLine::plain("Cost with Profit + Levy", record.cost_with_profit_and_levy),
            InvoiceLine::plain("VAT to be Paid (18/118)", record.vat_obligation),
            InvoiceLine::plain("Paid VAT", record.paid_vat),
            InvoiceLine::plain("VAT Difference", record.vat_difference),
            InvoiceLine {
                emphasized: true,
                ..InvoiceLine::plain("Sold Price", record.sold_price)
            },
        ];

        Ok(Self {
            title: INVOICE_TITLE,
            heading: vehicle.display_name(),
            chassis_no: vehicle.chassis_no.clone(),
            lines,
            signature: SIGNATURE_LABEL,
        })
    }

    pub fn sold_price(&self) -> Option<Decimal> {
        self.lines.iter().find(|l| l.emphasized).map(|l| l.value)
    }
}

/// Output of a renderer: a suggested file name and the document bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Turns an invoice into a printable document.
pub trait InvoiceRenderer: Send + Sync {
    fn render(&self, invoice: &TaxInvoice) -> Result<RenderedDocument, InvoiceError>;
}
