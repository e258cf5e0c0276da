mod expense;
mod tax_record;
mod vehicle;

pub use expense::{Expense, NewExpense, Role};
pub use tax_record::{NewTaxRecord, TaxRecord};
pub use vehicle::{LocalCosts, Vehicle, VehicleCandidate, VehicleStatus};
