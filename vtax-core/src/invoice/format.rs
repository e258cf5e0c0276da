use rust_decimal::Decimal;

use crate::calculations::common::round_whole;

/// Formats an amount as whole currency units with `,` thousands separators.
///
/// ```
/// use rust_decimal_macros::dec;
/// use vtax_core::invoice::format_currency;
///
/// assert_eq!(format_currency(dec!(1341992)), "1,341,992");
/// assert_eq!(format_currency(dec!(-66)), "-66");
/// ```
pub fn format_currency(value: Decimal) -> String {
    let whole = round_whole(value);
    let digits = whole.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if whole.is_sign_negative() && !whole.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}
