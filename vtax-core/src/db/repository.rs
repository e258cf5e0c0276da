use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Expense, NewExpense, NewTaxRecord, Role, TaxRecord, Vehicle};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// One tax record per vehicle, keyed by chassis number.
#[async_trait]
pub trait TaxRecordStore: Send + Sync {
    /// Insert the record, or replace the existing one for the same chassis.
    /// Must be atomic: writing the same record twice leaves one row.
    async fn upsert_tax_record(&self, record: NewTaxRecord) -> Result<TaxRecord, RepositoryError>;

    async fn get_tax_record(&self, chassis_no: &str) -> Result<TaxRecord, RepositoryError>;

    /// Removes the record only; the vehicle is untouched.
    async fn delete_tax_record(&self, chassis_no: &str) -> Result<(), RepositoryError>;

    /// Subset of `chassis_nos` that already have a record, in one round trip.
    async fn find_tax_records(
        &self,
        chassis_nos: &[String],
    ) -> Result<HashSet<String>, RepositoryError>;
}

/// Read side of the vehicle stock.
#[async_trait]
pub trait VehicleSearchGateway: Send + Sync {
    /// Case-insensitive substring match on chassis number.
    async fn search_vehicles(&self, partial_chassis: &str) -> Result<Vec<Vehicle>, RepositoryError>;

    /// Available vehicles, newest first.
    async fn list_available_vehicles(&self, limit: u32) -> Result<Vec<Vehicle>, RepositoryError>;
}

/// Write side of the vehicle stock, used by importers.
#[async_trait]
pub trait VehicleCatalog: Send + Sync {
    async fn upsert_vehicle(&self, vehicle: &Vehicle) -> Result<(), RepositoryError>;

    async fn get_vehicle(&self, chassis_no: &str) -> Result<Vehicle, RepositoryError>;
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, RepositoryError>;

    async fn delete_expense(&self, id: i64) -> Result<(), RepositoryError>;

    /// Expenses dated within `from..=to` that `viewer` may see, ordered by
    /// date then creation time, both ascending.
    async fn list_expenses(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        viewer: Role,
    ) -> Result<Vec<Expense>, RepositoryError>;
}
