//! Common utility functions for tax calculations.
//!
//! Every stage of the cascade is kept in whole currency units, so the
//! rounding helper here is the single place that decides how a fractional
//! amount becomes a whole one.

use rust_decimal::Decimal;

/// Rounds a decimal value to the nearest whole unit.
///
/// Midpoints round toward positive infinity, so `2.5` becomes `3` while
/// `-2.5` becomes `-2`. Stored records were produced with this rule and
/// recomputation has to reproduce them to the unit.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use vtax_core::calculations::common::round_whole;
///
/// assert_eq!(round_whole(dec!(14374.49)), dec!(14374));
/// assert_eq!(round_whole(dec!(12500.5)), dec!(12501));
/// assert_eq!(round_whole(dec!(-12500.5)), dec!(-12500));
/// assert_eq!(round_whole(dec!(-12500.51)), dec!(-12501));
/// ```
pub fn round_whole(value: Decimal) -> Decimal {
    // Only a value within 0.5 of Decimal::MAX can overflow here, and such a
    // value is already whole.
    match value.checked_add(Decimal::new(5, 1)) {
        Some(shifted) => shifted.floor(),
        None => value.floor(),
    }
}

/// Returns `true` when the value carries no fractional part.
pub fn is_whole(value: Decimal) -> bool {
    value.fract().is_zero()
}
