use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;
use vtax_core::db::{ExpenseRepository, VehicleCatalog};
use vtax_core::{
    Expense, LocalCosts, NewExpense, NewTaxRecord, RepositoryError, Role, TaxRecord,
    TaxRecordStore, Vehicle, VehicleSearchGateway, VehicleStatus,
};

use crate::decimal::{decimal_to_f64, decimal_to_i64, get_decimal, get_optional_decimal};

const VEHICLE_COLUMNS: &str = "chassis_no, maker, model, status, final_total_cost,
    foreign_total_cost, local_tax, local_clearance, local_transport,
    local_extra1, local_extra2, local_extra3, transfer_amount_foreign,
    transfer_rate, created_at";

const TAX_RECORD_COLUMNS: &str = "id, chassis_no, total_cost, transfer_amount,
    total_cost_excluding_transfer, expected_profit, paid_vat, cost_with_profit,
    levy, cost_with_profit_and_levy, vat_obligation, vat_difference, sold_price,
    created_at, updated_at";

const EXPENSE_COLUMNS: &str =
    "id, expense_date, description, amount, created_by, created_by_role, created_at";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open a database from a bare file path, `:memory:`, or a `sqlite:` URL.
    /// Files are created when missing.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let in_memory = matches!(connection_string, ":memory:" | "sqlite::memory:");
        let url = if connection_string.starts_with("sqlite:") {
            connection_string.to_string()
        } else {
            format!("sqlite:{}", connection_string)
        };

        let options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("Invalid database location: {}", connection_string))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to ":memory:" is a separate database, so keep one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", connection_string))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    row.try_get::<DateTime<Utc>, _>(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

/// `%` and `_` in user input match literally.
fn like_pattern(partial: &str) -> String {
    let mut escaped = String::with_capacity(partial.len() + 2);
    escaped.push('%');
    for ch in partial.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn row_to_vehicle(row: &SqliteRow) -> Result<Vehicle, RepositoryError> {
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(Vehicle {
        chassis_no: row.try_get("chassis_no").map_err(db_err)?,
        maker: row.try_get("maker").map_err(db_err)?,
        model: row.try_get("model").map_err(db_err)?,
        status: VehicleStatus::parse(&status).ok_or_else(|| {
            RepositoryError::Database(format!("Unknown vehicle status '{}'", status))
        })?,
        final_total_cost: get_optional_decimal(row, "final_total_cost")?,
        foreign_total_cost: get_optional_decimal(row, "foreign_total_cost")?,
        local_costs: LocalCosts {
            tax: get_optional_decimal(row, "local_tax")?,
            clearance: get_optional_decimal(row, "local_clearance")?,
            transport: get_optional_decimal(row, "local_transport")?,
            extra1: get_optional_decimal(row, "local_extra1")?,
            extra2: get_optional_decimal(row, "local_extra2")?,
            extra3: get_optional_decimal(row, "local_extra3")?,
        },
        transfer_amount_foreign: get_optional_decimal(row, "transfer_amount_foreign")?,
        transfer_rate: get_optional_decimal(row, "transfer_rate")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

fn row_to_tax_record(row: &SqliteRow) -> Result<TaxRecord, RepositoryError> {
    Ok(TaxRecord {
        id: row.try_get("id").map_err(db_err)?,
        chassis_no: row.try_get("chassis_no").map_err(db_err)?,
        total_cost: get_decimal(row, "total_cost")?,
        transfer_amount: get_decimal(row, "transfer_amount")?,
        total_cost_excluding_transfer: get_decimal(row, "total_cost_excluding_transfer")?,
        expected_profit: get_decimal(row, "expected_profit")?,
        paid_vat: get_decimal(row, "paid_vat")?,
        cost_with_profit: get_decimal(row, "cost_with_profit")?,
        levy: get_decimal(row, "levy")?,
        cost_with_profit_and_levy: get_decimal(row, "cost_with_profit_and_levy")?,
        vat_obligation: get_decimal(row, "vat_obligation")?,
        vat_difference: get_decimal(row, "vat_difference")?,
        sold_price: get_decimal(row, "sold_price")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn row_to_expense(row: &SqliteRow) -> Result<Expense, RepositoryError> {
    let role: String = row.try_get("created_by_role").map_err(db_err)?;
    Ok(Expense {
        id: row.try_get("id").map_err(db_err)?,
        expense_date: row.try_get::<NaiveDate, _>("expense_date").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        amount: get_decimal(row, "amount")?,
        created_by: row.try_get("created_by").map_err(db_err)?,
        created_by_role: Role::parse(&role)
            .ok_or_else(|| RepositoryError::Database(format!("Unknown role '{}'", role)))?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl TaxRecordStore for SqliteRepository {
    async fn upsert_tax_record(
        &self,
        record: NewTaxRecord,
    ) -> Result<TaxRecord, RepositoryError> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO tax_records (
                chassis_no, total_cost, transfer_amount, total_cost_excluding_transfer,
                expected_profit, paid_vat, cost_with_profit, levy,
                cost_with_profit_and_levy, vat_obligation, vat_difference, sold_price,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (chassis_no) DO UPDATE SET
                total_cost = excluded.total_cost,
                transfer_amount = excluded.transfer_amount,
                total_cost_excluding_transfer = excluded.total_cost_excluding_transfer,
                expected_profit = excluded.expected_profit,
                paid_vat = excluded.paid_vat,
                cost_with_profit = excluded.cost_with_profit,
                levy = excluded.levy,
                cost_with_profit_and_levy = excluded.cost_with_profit_and_levy,
                vat_obligation = excluded.vat_obligation,
                vat_difference = excluded.vat_difference,
                sold_price = excluded.sold_price,
                updated_at = excluded.updated_at",
        )
        .bind(&record.chassis_no)
        .bind(decimal_to_f64(record.total_cost)?)
        .bind(decimal_to_f64(record.transfer_amount)?)
        .bind(decimal_to_f64(record.total_cost_excluding_transfer)?)
        .bind(decimal_to_f64(record.expected_profit)?)
        .bind(decimal_to_f64(record.paid_vat)?)
        .bind(decimal_to_i64(record.cost_with_profit)?)
        .bind(decimal_to_i64(record.levy)?)
        .bind(decimal_to_i64(record.cost_with_profit_and_levy)?)
        .bind(decimal_to_i64(record.vat_obligation)?)
        .bind(decimal_to_i64(record.vat_difference)?)
        .bind(decimal_to_i64(record.sold_price)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        debug!(chassis = %record.chassis_no, "tax record upserted");
        self.get_tax_record(&record.chassis_no).await
    }

    async fn get_tax_record(
        &self,
        chassis_no: &str,
    ) -> Result<TaxRecord, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tax_records WHERE chassis_no = ?",
            TAX_RECORD_COLUMNS
        ))
        .bind(chassis_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_tax_record(&row)
    }

    async fn delete_tax_record(
        &self,
        chassis_no: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_records WHERE chassis_no = ?")
            .bind(chassis_no)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn find_tax_records(
        &self,
        chassis_nos: &[String],
    ) -> Result<HashSet<String>, RepositoryError> {
        if chassis_nos.is_empty() {
            return Ok(HashSet::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT chassis_no FROM tax_records WHERE chassis_no IN (");
        let mut separated = query.separated(", ");
        for chassis_no in chassis_nos {
            separated.push_bind(chassis_no.as_str());
        }
        separated.push_unseparated(")");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("chassis_no").map_err(db_err))
            .collect()
    }
}

#[async_trait]
impl VehicleSearchGateway for SqliteRepository {
    async fn search_vehicles(
        &self,
        partial_chassis: &str,
    ) -> Result<Vec<Vehicle>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM vehicles
             WHERE chassis_no LIKE ? ESCAPE '\\'
             ORDER BY chassis_no",
            VEHICLE_COLUMNS
        ))
        .bind(like_pattern(partial_chassis.trim()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_vehicle).collect()
    }

    async fn list_available_vehicles(
        &self,
        limit: u32,
    ) -> Result<Vec<Vehicle>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM vehicles
             WHERE status = 'available'
             ORDER BY created_at DESC
             LIMIT ?",
            VEHICLE_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_vehicle).collect()
    }
}

#[async_trait]
impl VehicleCatalog for SqliteRepository {
    async fn upsert_vehicle(
        &self,
        vehicle: &Vehicle,
    ) -> Result<(), RepositoryError> {
        let costs = &vehicle.local_costs;
        sqlx::query(&format!(
            "INSERT INTO vehicles ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (chassis_no) DO UPDATE SET
                maker = excluded.maker,
                model = excluded.model,
                status = excluded.status,
                final_total_cost = excluded.final_total_cost,
                foreign_total_cost = excluded.foreign_total_cost,
                local_tax = excluded.local_tax,
                local_clearance = excluded.local_clearance,
                local_transport = excluded.local_transport,
                local_extra1 = excluded.local_extra1,
                local_extra2 = excluded.local_extra2,
                local_extra3 = excluded.local_extra3,
                transfer_amount_foreign = excluded.transfer_amount_foreign,
                transfer_rate = excluded.transfer_rate",
            VEHICLE_COLUMNS
        ))
        .bind(&vehicle.chassis_no)
        .bind(&vehicle.maker)
        .bind(&vehicle.model)
        .bind(vehicle.status.as_str())
        .bind(vehicle.final_total_cost.map(decimal_to_f64).transpose()?)
        .bind(vehicle.foreign_total_cost.map(decimal_to_f64).transpose()?)
        .bind(costs.tax.map(decimal_to_f64).transpose()?)
        .bind(costs.clearance.map(decimal_to_f64).transpose()?)
        .bind(costs.transport.map(decimal_to_f64).transpose()?)
        .bind(costs.extra1.map(decimal_to_f64).transpose()?)
        .bind(costs.extra2.map(decimal_to_f64).transpose()?)
        .bind(costs.extra3.map(decimal_to_f64).transpose()?)
        .bind(vehicle.transfer_amount_foreign.map(decimal_to_f64).transpose()?)
        .bind(vehicle.transfer_rate.map(decimal_to_f64).transpose()?)
        .bind(vehicle.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_vehicle(
        &self,
        chassis_no: &str,
    ) -> Result<Vehicle, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM vehicles WHERE chassis_no = ?",
            VEHICLE_COLUMNS
        ))
        .bind(chassis_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_vehicle(&row)
    }
}

#[async_trait]
impl ExpenseRepository for SqliteRepository {
    async fn create_expense(
        &self,
        expense: NewExpense,
    ) -> Result<Expense, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO expenses (
                expense_date, description, amount, created_by, created_by_role, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(expense.expense_date)
        .bind(&expense.description)
        .bind(decimal_to_f64(expense.amount)?)
        .bind(&expense.created_by)
        .bind(expense.created_by_role.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query(&format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS))
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        row_to_expense(&row)
    }

    async fn delete_expense(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
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
        let rows = sqlx::query(&format!(
            "SELECT {} FROM expenses
             WHERE expense_date BETWEEN ? AND ?
               AND (? = 'admin' OR created_by_role <> 'admin')
             ORDER BY expense_date, created_at, id",
            EXPENSE_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .bind(viewer.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_expense).collect()
    }
}
