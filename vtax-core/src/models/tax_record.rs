use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::{CostBasis, TaxBreakdown};

/// Persisted tax figures for one vehicle.
///
/// Every derived field is a function of `total_cost_excluding_transfer`,
/// `expected_profit` and `paid_vat`. `paid_vat` is stored exactly as
/// entered; only the cascade rounds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRecord {
    pub id: i64,
    pub chassis_no: String,

    // Cost basis
    pub total_cost: Decimal,
    pub transfer_amount: Decimal,
    pub total_cost_excluding_transfer: Decimal,

    // User-provided values
    pub expected_profit: Decimal,
    pub paid_vat: Decimal,

    // Calculated values (whole currency units)
    pub cost_with_profit: Decimal,
    pub levy: Decimal,
    pub cost_with_profit_and_levy: Decimal,
    pub vat_obligation: Decimal,
    pub vat_difference: Decimal,
    pub sold_price: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaxRecord {
    /// The derived portion of the record.
    pub fn breakdown(&self) -> TaxBreakdown {
        TaxBreakdown {
            cost_with_profit: self.cost_with_profit,
            levy: self.levy,
            cost_with_profit_and_levy: self.cost_with_profit_and_levy,
            vat_obligation: self.vat_obligation,
            vat_difference: self.vat_difference,
            sold_price: self.sold_price,
        }
    }

    pub fn cost_basis(&self) -> CostBasis {
        CostBasis {
            total_cost: self.total_cost,
            transfer_amount: self.transfer_amount,
            total_cost_excluding_transfer: self.total_cost_excluding_transfer,
        }
    }
}

/// For upserting records (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxRecord {
    pub chassis_no: String,
    pub total_cost: Decimal,
    pub transfer_amount: Decimal,
    pub total_cost_excluding_transfer: Decimal,
    pub expected_profit: Decimal,
    pub paid_vat: Decimal,
    pub cost_with_profit: Decimal,
    pub levy: Decimal,
    pub cost_with_profit_and_levy: Decimal,
    pub vat_obligation: Decimal,
    pub vat_difference: Decimal,
    pub sold_price: Decimal,
}

impl NewTaxRecord {
    pub fn new(
        chassis_no: impl Into<String>,
        basis: &CostBasis,
        expected_profit: Decimal,
        paid_vat: Decimal,
        breakdown: &TaxBreakdown,
    ) -> Self {
        Self {
            chassis_no: chassis_no.into(),
            total_cost: basis.total_cost,
            transfer_amount: basis.transfer_amount,
            total_cost_excluding_transfer: basis.total_cost_excluding_transfer,
            expected_profit,
            paid_vat,
            cost_with_profit: breakdown.cost_with_profit,
            levy: breakdown.levy,
            cost_with_profit_and_levy: breakdown.cost_with_profit_and_levy,
            vat_obligation: breakdown.vat_obligation,
            vat_difference: breakdown.vat_difference,
            sold_price: breakdown.sold_price,
        }
    }

    /// Attach storage identity and timestamps.
    pub fn into_record(
        self,
        id: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> TaxRecord {
        TaxRecord {
            id,
            chassis_no: self.chassis_no,
            total_cost: self.total_cost,
            transfer_amount: self.transfer_amount,
            total_cost_excluding_transfer: self.total_cost_excluding_transfer,
            expected_profit: self.expected_profit,
            paid_vat: self.paid_vat,
            cost_with_profit: self.cost_with_profit,
            levy: self.levy,
            cost_with_profit_and_levy: self.cost_with_profit_and_levy,
            vat_obligation: self.vat_obligation,
            vat_difference: self.vat_difference,
            sold_price: self.sold_price,
            created_at,
            updated_at,
        }
    }
}
