//! Levy and VAT cascade for a used-vehicle sale.
//!
//! The cascade derives the sold price of a vehicle from its profit-bearing
//! cost, the profit the dealer expects and any VAT already paid.
//!
//! # Cascade Structure
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Cost with profit (cost excluding transfer + expected profit) |
//! | 2    | Levy (step 1 × 1.25%) |
//! | 3    | Cost with profit and levy (step 1 + step 2) |
//! | 4    | VAT obligation (step 3 × 18 / 118) |
//! | 5    | VAT difference (step 4 − paid VAT) |
//! | 6    | Sold price (step 3 + step 5) |
//!
//! Each step is rounded to a whole currency unit before the next one reads
//! it. Paid VAT is rounded when it enters step 5.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use vtax_core::calculations::{CascadeInputs, TaxCascade};
//!
//! let input = CascadeInputs {
//!     cost_excluding_transfer: Some(dec!(1000000)),
//!     expected_profit: Some(dec!(150000)),
//!     paid_vat: None,
//! };
//!
//! let result = TaxCascade::new().calculate(&input).unwrap();
//!
//! assert_eq!(result.levy, dec!(14375));
//! assert_eq!(result.vat_obligation, dec!(177617));
//! assert_eq!(result.sold_price, dec!(1341992));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::round_whole;

/// Service-charge levy applied to cost with profit (1.25%).
pub const LEVY_RATE: Decimal = Decimal::from_parts(125, 0, 0, false, 4);

/// Statutory VAT rate in percent. The obligation is backed out of a
/// VAT-inclusive amount as `amount × 18 / 118`.
pub const VAT_RATE_PERCENT: Decimal = Decimal::from_parts(18, 0, 0, false, 0);

/// Largest magnitude accepted for any input or derived figure (10^15).
/// Raw inputs are stored as REAL, which is exact for whole amounts up to
/// 2^53, and derived figures as 64-bit INTEGER.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Errors that withhold a cascade result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CascadeError {
    /// The vehicle's cost excluding transfer is not known.
    #[error("cost excluding transfer is required")]
    MissingCostBasis,

    /// The expected profit has not been entered or is not a number.
    #[error("expected profit is required")]
    MissingExpectedProfit,

    /// An input or a derived figure is beyond [`MAX_AMOUNT`].
    #[error("amount is outside the supported range")]
    Overflow,
}

/// Input values for the cascade.
///
/// `cost_excluding_transfer` and `expected_profit` are required. A missing
/// `paid_vat` counts as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeInputs {
    pub cost_excluding_transfer: Option<Decimal>,
    pub expected_profit: Option<Decimal>,
    pub paid_vat: Option<Decimal>,
}

impl CascadeInputs {
    pub fn is_complete(&self) -> bool {
        self.cost_excluding_transfer.is_some() && self.expected_profit.is_some()
    }

    /// Paid VAT as stored: unrounded, zero when absent.
    pub fn paid_vat_or_zero(&self) -> Decimal {
        self.paid_vat.unwrap_or_default()
    }
}

/// Every derived figure of the cascade, each in whole currency units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub cost_with_profit: Decimal,
    pub levy: Decimal,
    pub cost_with_profit_and_levy: Decimal,
    pub vat_obligation: Decimal,
    pub vat_difference: Decimal,
    pub sold_price: Decimal,
}

/// Calculator for the levy/VAT cascade.
///
/// Stateless; the same inputs always yield the same breakdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxCascade;

impl TaxCascade {
    pub fn new() -> Self {
        Self
    }

    /// Runs the full cascade.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError`] if the cost basis or the expected profit is
    /// missing, or if any input or stage leaves the range of [`MAX_AMOUNT`].
    /// No partial breakdown is ever produced.
    pub fn calculate(&self, input: &CascadeInputs) -> Result<TaxBreakdown, CascadeError> {
        let cost = input
            .cost_excluding_transfer
            .ok_or(CascadeError::MissingCostBasis)
            .and_then(in_range)?;
        let expected_profit = input
            .expected_profit
            .ok_or(CascadeError::MissingExpectedProfit)
            .and_then(in_range)?;
        let paid_vat = in_range(input.paid_vat_or_zero())?;

        let cost_with_profit = self.cost_with_profit(cost, expected_profit)?;
        let levy = self.levy(cost_with_profit)?;
        let cost_with_profit_and_levy = self.cost_with_profit_and_levy(cost_with_profit, levy)?;
        let vat_obligation = self.vat_obligation(cost_with_profit_and_levy)?;
        let vat_difference = self.vat_difference(vat_obligation, paid_vat)?;
        let sold_price = self.sold_price(cost_with_profit_and_levy, vat_difference)?;

        Ok(TaxBreakdown {
            cost_with_profit,
            levy,
            cost_with_profit_and_levy,
            vat_obligation,
            vat_difference,
            sold_price,
        })
    }

    /// Step 1. A negative profit (planned loss) passes through as is.
    fn cost_with_profit(
        &self,
        cost: Decimal,
        expected_profit: Decimal,
    ) -> Result<Decimal, CascadeError> {
        whole(cost.checked_add(expected_profit))
    }

    /// Step 2.
    fn levy(
        &self,
        cost_with_profit: Decimal,
    ) -> Result<Decimal, CascadeError> {
        whole(cost_with_profit.checked_mul(LEVY_RATE))
    }

    /// Step 3.
    fn cost_with_profit_and_levy(
        &self,
        cost_with_profit: Decimal,
        levy: Decimal,
    ) -> Result<Decimal, CascadeError> {
        whole(cost_with_profit.checked_add(levy))
    }

    /// Step 4. Multiply before dividing so the quotient is exact for whole
    /// inputs up to the division.
    fn vat_obligation(
        &self,
        cost_with_profit_and_levy: Decimal,
    ) -> Result<Decimal, CascadeError> {
        let inclusive = Decimal::ONE_HUNDRED + VAT_RATE_PERCENT;
        whole(
            cost_with_profit_and_levy
                .checked_mul(VAT_RATE_PERCENT)
                .and_then(|v| v.checked_div(inclusive)),
        )
    }

    /// Step 5.
    fn vat_difference(
        &self,
        vat_obligation: Decimal,
        paid_vat: Decimal,
    ) -> Result<Decimal, CascadeError> {
        whole(vat_obligation.checked_sub(round_whole(paid_vat)))
    }

    /// Step 6.
    fn sold_price(
        &self,
        cost_with_profit_and_levy: Decimal,
        vat_difference: Decimal,
    ) -> Result<Decimal, CascadeError> {
        whole(cost_with_profit_and_levy.checked_add(vat_difference))
    }
}

fn in_range(value: Decimal) -> Result<Decimal, CascadeError> {
    if value.abs() <= MAX_AMOUNT {
        Ok(value)
    } else {
        Err(CascadeError::Overflow)
    }
}

/// Rounds a stage result, rejecting overflow and out-of-range figures.
fn whole(value: Option<Decimal>) -> Result<Decimal, CascadeError> {
    value
        .ok_or(CascadeError::Overflow)
        .and_then(in_range)
        .map(round_whole)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::common::is_whole;

    fn inputs(
        cost: Decimal,
        profit: Decimal,
        paid_vat: Option<Decimal>,
    ) -> CascadeInputs {
        CascadeInputs {
            cost_excluding_transfer: Some(cost),
            expected_profit: Some(profit),
            paid_vat,
        }
    }

    // =========================================================================
    // full cascade
    // =========================================================================

    #[test]
    fn calculate_reference_scenario_without_paid_vat() {
        let result = TaxCascade::new()
            .calculate(&inputs(dec!(1000000), dec!(150000), Some(dec!(0))))
            .unwrap();

        assert_eq!(
            result,
            TaxBreakdown {
                cost_with_profit: dec!(1150000),
                levy: dec!(14375),
                cost_with_profit_and_levy: dec!(1164375),
                // 1,164,375 × 18 / 118 = 177,616.525…
                vat_obligation: dec!(177617),
                vat_difference: dec!(177617),
                sold_price: dec!(1341992),
            }
        );
    }

    #[test]
    fn calculate_paid_vat_equal_to_obligation_cancels_difference() {
        let result = TaxCascade::new()
            .calculate(&inputs(dec!(1000000), dec!(150000), Some(dec!(177617))))
            .unwrap();

        assert_eq!(result.vat_difference, dec!(0));
        assert_eq!(result.sold_price, dec!(1164375));
    }

    #[test]
    fn calculate_overpaid_vat_reduces_sold_price() {
        let result = TaxCascade::new()
            .calculate(&inputs(dec!(1000000), dec!(150000), Some(dec!(177683))))
            .unwrap();

        assert_eq!(result.vat_difference, dec!(-66));
        assert_eq!(result.sold_price, dec!(1164309));
    }

    #[test]
    fn calculate_missing_paid_vat_counts_as_zero() {
        let cascade = TaxCascade::new();

        let without = cascade
            .calculate(&inputs(dec!(1000000), dec!(150000), None))
            .unwrap();
        let with_zero = cascade
            .calculate(&inputs(dec!(1000000), dec!(150000), Some(dec!(0))))
            .unwrap();

        assert_eq!(without, with_zero);
    }

    #[test]
    fn calculate_is_deterministic() {
        let cascade = TaxCascade::new();
        let input = inputs(dec!(2345678.91), dec!(123456.78), Some(dec!(4567.5)));

        let first = cascade.calculate(&input).unwrap();
        let second = cascade.calculate(&input).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn calculate_every_field_is_whole_for_fractional_inputs() {
        let cascade = TaxCascade::new();
        let samples = [
            (dec!(0), dec!(0), None),
            (dec!(998010.5125), dec!(75000.25), Some(dec!(1000.49))),
            (dec!(5987500), dec!(-250000.75), Some(dec!(0.5))),
            (dec!(123.456), dec!(7.89), Some(dec!(-3.3))),
            (dec!(99999999.99), dec!(1), None),
        ];

        for (cost, profit, paid_vat) in samples {
            let r = cascade.calculate(&inputs(cost, profit, paid_vat)).unwrap();
            for value in [
                r.cost_with_profit,
                r.levy,
                r.cost_with_profit_and_levy,
                r.vat_obligation,
                r.vat_difference,
                r.sold_price,
            ] {
                assert!(is_whole(value), "{value} is not whole for cost {cost}");
            }
        }
    }

    #[test]
    fn calculate_uses_rounded_levy_for_vat() {
        // levy = 1,000,035 × 0.0125 = 12,500.4375 → 12,500
        // rounded operand:   1,012,535   × 18 / 118 = 154,454.49 → 154,454
        // unrounded operand: 1,012,535.4375 × 18 / 118 = 154,454.56 → 154,455
        let result = TaxCascade::new()
            .calculate(&inputs(dec!(1000035), dec!(0), None))
            .unwrap();

        assert_eq!(result.levy, dec!(12500));
        assert_eq!(result.cost_with_profit_and_levy, dec!(1012535));
        assert_eq!(result.vat_obligation, dec!(154454));
    }

    #[test]
    fn calculate_negative_profit_is_not_clamped() {
        let result = TaxCascade::new()
            .calculate(&inputs(dec!(1000000), dec!(-100000), None))
            .unwrap();

        assert_eq!(result.cost_with_profit, dec!(900000));
        assert_eq!(result.levy, dec!(11250));
        assert_eq!(result.cost_with_profit_and_levy, dec!(911250));
    }

    // =========================================================================
    // missing inputs
    // =========================================================================

    #[test]
    fn calculate_without_profit_is_withheld() {
        let input = CascadeInputs {
            cost_excluding_transfer: Some(dec!(1000000)),
            expected_profit: None,
            paid_vat: Some(dec!(100)),
        };

        assert_eq!(
            TaxCascade::new().calculate(&input),
            Err(CascadeError::MissingExpectedProfit)
        );
    }

    #[test]
    fn calculate_without_cost_is_withheld() {
        let input = CascadeInputs {
            cost_excluding_transfer: None,
            expected_profit: Some(dec!(150000)),
            paid_vat: None,
        };

        assert_eq!(
            TaxCascade::new().calculate(&input),
            Err(CascadeError::MissingCostBasis)
        );
    }

    // =========================================================================
    // out-of-range amounts
    // =========================================================================

    #[test]
    fn calculate_with_maximal_profit_is_withheld() {
        let result = TaxCascade::new().calculate(&inputs(dec!(1000000), Decimal::MAX, None));

        assert_eq!(result, Err(CascadeError::Overflow));
    }

    #[test]
    fn calculate_rejects_each_oversized_input() {
        let cascade = TaxCascade::new();
        let huge = dec!(100000000000000000000);

        for input in [
            inputs(huge, dec!(0), None),
            inputs(dec!(1000000), huge, None),
            inputs(dec!(1000000), dec!(0), Some(-huge)),
            inputs(Decimal::MIN, Decimal::MIN, Some(Decimal::MAX)),
        ] {
            assert_eq!(cascade.calculate(&input), Err(CascadeError::Overflow));
        }
    }

    #[test]
    fn calculate_rejects_derived_figure_beyond_limit() {
        // Both inputs are in range, but cost with profit is not.
        let result = TaxCascade::new().calculate(&inputs(MAX_AMOUNT, MAX_AMOUNT, None));

        assert_eq!(result, Err(CascadeError::Overflow));
    }

    #[test]
    fn calculate_accepts_amounts_near_limit() {
        let result = TaxCascade::new()
            .calculate(&inputs(dec!(500000000000000), dec!(0), None))
            .unwrap();

        assert_eq!(result.levy, dec!(6250000000000));
        assert!(result.sold_price <= MAX_AMOUNT);
    }

    // =========================================================================
    // individual steps
    // =========================================================================

    #[test]
    fn levy_rounds_midpoint_up() {
        // 1,000,040 × 0.0125 = 12,500.5
        assert_eq!(TaxCascade::new().levy(dec!(1000040)), Ok(dec!(12501)));
    }

    #[test]
    fn vat_obligation_backs_out_eighteen_percent() {
        assert_eq!(TaxCascade::new().vat_obligation(dec!(118)), Ok(dec!(18)));
        assert_eq!(TaxCascade::new().vat_obligation(dec!(1180000)), Ok(dec!(180000)));
    }

    #[test]
    fn vat_difference_rounds_paid_vat_first() {
        assert_eq!(
            TaxCascade::new().vat_difference(dec!(1000), dec!(99.5)),
            Ok(dec!(900))
        );
        assert_eq!(
            TaxCascade::new().vat_difference(dec!(1000), dec!(99.49)),
            Ok(dec!(901))
        );
    }

    #[test]
    fn inputs_completeness() {
        assert!(inputs(dec!(1), dec!(2), None).is_complete());
        assert!(!CascadeInputs::default().is_complete());
    }
}
