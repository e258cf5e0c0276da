//! Process-local backend.
//!
//! Keeps every table in a single mutex-guarded struct. Useful for tests and
//! for dry runs from the command line (`backend = "memory"`).

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::factory::{DbConfig, Repositories, RepositoryFactory};
use super::repository::{
    ExpenseRepository, RepositoryError, TaxRecordStore, VehicleCatalog, VehicleSearchGateway,
};
use crate::models::{Expense, NewExpense, NewTaxRecord, Role, TaxRecord, Vehicle, VehicleStatus};

#[derive(Default)]
struct Tables {
    vehicles: BTreeMap<String, Vehicle>,
    tax_records: BTreeMap<String, TaxRecord>,
    expenses: Vec<Expense>,
    next_tax_record_id: i64,
    next_expense_id: i64,
}

#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TaxRecordStore for MemoryRepository {
    async fn upsert_tax_record(&self, record: NewTaxRecord) -> Result<TaxRecord, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.vehicles.contains_key(&record.chassis_no) {
            return Err(RepositoryError::Database(format!(
                "no vehicle with chassis '{}'",
                record.chassis_no
            )));
        }

        let now = Utc::now();
        let existing = tables
            .tax_records
            .get(&record.chassis_no)
            .map(|r| (r.id, r.created_at));
        let (id, created_at) = match existing {
            Some(existing) => existing,
            None => {
                tables.next_tax_record_id += 1;
                (tables.next_tax_record_id, now)
            }
        };

        let stored = record.into_record(id, created_at, now);
        tables
            .tax_records
            .insert(stored.chassis_no.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_tax_record(&self, chassis_no: &str) -> Result<TaxRecord, RepositoryError> {
        self.tables()?
            .tax_records
            .get(chassis_no)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_tax_record(&self, chassis_no: &str) -> Result<(), RepositoryError> {
        self.tables()?
            .tax_records
            .remove(chassis_no)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_tax_records(
        &self,
        chassis_nos: &[String],
    ) -> Result<HashSet<String>, RepositoryError> {
        let tables = self.tables()?;
        Ok(chassis_nos
            .iter()
            .filter(|c| tables.tax_records.contains_key(c.as_str()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VehicleSearchGateway for MemoryRepository {
    async fn search_vehicles(&self, partial_chassis: &str) -> Result<Vec<Vehicle>, RepositoryError> {
        let needle = partial_chassis.to_lowercase();
        Ok(self
            .tables()?
            .vehicles
            .values()
            .filter(|v| v.chassis_no.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn list_available_vehicles(&self, limit: u32) -> Result<Vec<Vehicle>, RepositoryError> {
        let mut available: Vec<Vehicle> = self
            .tables()?
            .vehicles
            .values()
            .filter(|v| v.status == VehicleStatus::Available)
            .cloned()
            .collect();
        available.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        available.truncate(limit as usize);
        Ok(available)
    }
}

#[async_trait]
impl VehicleCatalog for MemoryRepository {
    async fn upsert_vehicle(&self, vehicle: &Vehicle) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let mut stored = vehicle.clone();
        if let Some(existing) = tables.vehicles.get(&vehicle.chassis_no) {
            stored.created_at = existing.created_at;
        }
        tables.vehicles.insert(stored.chassis_no.clone(), stored);
        Ok(())
    }

    async fn get_vehicle(&self, chassis_no: &str) -> Result<Vehicle, RepositoryError> {
        self.tables()?
            .vehicles
            .get(chassis_no)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl ExpenseRepository for MemoryRepository {
    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, RepositoryError> {
        let mut tables = self.tables()?;
        tables.next_expense_id += 1;
        let stored = Expense {
            id: tables.next_expense_id,
            expense_date: expense.expense_date,
            description: expense.description,
            amount: expense.amount,
            created_by: expense.created_by,
            created_by_role: expense.created_by_role,
            created_at: Utc::now(),
        };
        tables.expenses.push(stored.clone());
        Ok(stored)
    }

    async fn delete_expense(&self, id: i64) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let before = tables.expenses.len();
        tables.expenses.retain(|e| e.id != id);
        if tables.expenses.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_expenses(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        viewer: Role,
    ) -> Result<Vec<Expense>, RepositoryError> {
        let mut rows: Vec<Expense> = self
            .tables()?
            .expenses
            .iter()
            .filter(|e| e.expense_date >= from && e.expense_date <= to)
            .filter(|e| viewer.can_view(e.created_by_role))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.expense_date, a.created_at, a.id).cmp(&(b.expense_date, b.created_at, b.id))
        });
        Ok(rows)
    }
}

/// [`RepositoryFactory`] for the in-memory backend. Every `create` call
/// yields a fresh, empty store.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, _config: &DbConfig) -> Result<Repositories, RepositoryError> {
        Ok(Repositories::from_backend(Arc::new(MemoryRepository::new())))
    }
}
