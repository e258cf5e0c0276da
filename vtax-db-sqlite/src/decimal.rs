use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};
use vtax_core::RepositoryError;

/// Get a decimal value from a row, accepting INTEGER or REAL storage.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    let type_name = value_ref.type_info().name().to_string();
    match type_name.as_str() {
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get INTEGER from '{}': {}", column, e))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{}': {}", column, e))
            })?;
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {} to Decimal: {}", val, e))
            })
        }
        "NULL" => Ok(Decimal::ZERO),
        other => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            other, column
        ))),
    }
}

/// Like [`get_decimal`], but NULL maps to `None`.
pub fn get_optional_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    if value_ref.is_null() {
        return Ok(None);
    }

    get_decimal(row, column).map(Some)
}

/// Raw amounts are stored as REAL.
pub fn decimal_to_f64(d: Decimal) -> Result<f64, RepositoryError> {
    d.to_f64()
        .ok_or_else(|| RepositoryError::Database(format!("Cannot store {} as REAL", d)))
}

/// Derived amounts are whole currency units and are stored as INTEGER.
/// Fractions and values outside the INTEGER range are rejected, never
/// truncated.
pub fn decimal_to_i64(d: Decimal) -> Result<i64, RepositoryError> {
    if !d.fract().is_zero() {
        return Err(RepositoryError::Database(format!(
            "Cannot store {} as INTEGER: not a whole amount",
            d
        )));
    }
    d.to_i64().ok_or_else(|| {
        RepositoryError::Database(format!("Cannot store {} as INTEGER: out of range", d))
    })
}
