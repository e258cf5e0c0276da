//! Tax derivations for a single stock vehicle.
//!
//! [`cost_basis`] turns a vehicle snapshot into the figures that seed the
//! cascade, and [`cascade`] derives levy, VAT and sold price from them.

pub mod cascade;
pub mod common;
pub mod cost_basis;

pub use cascade::{CascadeError, CascadeInputs, TaxBreakdown, TaxCascade, LEVY_RATE, MAX_AMOUNT, VAT_RATE_PERCENT};
pub use cost_basis::{resolve_cost_basis, CostBasis};
