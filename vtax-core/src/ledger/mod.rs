//! Day-to-day dealership expenses and the monthly summary.

mod report;

use std::sync::Arc;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

pub use report::{CompanyHeader, MonthlyExpenseReport};

use crate::calculations::MAX_AMOUNT;
use crate::db::{ExpenseRepository, RepositoryError};
use crate::models::{Expense, NewExpense, Role};
use crate::utils::parse_decimal;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid expense: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] RepositoryError),
}

/// Who is recording or viewing expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUser {
    pub id: String,
    pub role: Role,
}

/// Expenses for a single day, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayExpenses {
    pub date: NaiveDate,
    pub expenses: Vec<Expense>,
}

impl DayExpenses {
    pub fn total(&self) -> Decimal {
        self.expenses
            .iter()
            .map(|e| e.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}

pub struct ExpenseLedger {
    repo: Arc<dyn ExpenseRepository>,
}

impl ExpenseLedger {
    pub fn new(repo: Arc<dyn ExpenseRepository>) -> Self {
        Self { repo }
    }

    /// Records an expense. The description is trimmed and must not be
    /// blank; the amount must be a positive number no larger than
    /// [`MAX_AMOUNT`].
    pub async fn add(
        &self,
        user: &LedgerUser,
        date: NaiveDate,
        description: &str,
        amount: &str,
    ) -> Result<Expense, LedgerError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::Validation("description is required".to_string()));
        }
        let amount = parse_decimal(amount)
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if amount > MAX_AMOUNT {
            return Err(LedgerError::Validation(format!(
                "amount must not exceed {MAX_AMOUNT}"
            )));
        }

        let expense = self
            .repo
            .create_expense(NewExpense {
                expense_date: date,
                description: description.to_string(),
                amount,
                created_by: user.id.clone(),
                created_by_role: user.role,
            })
            .await?;
        info!(id = expense.id, %amount, date = %date, "expense recorded");
        Ok(expense)
    }

    pub async fn for_day(
        &self,
        viewer: Role,
        date: NaiveDate,
    ) -> Result<DayExpenses, LedgerError> {
        let mut expenses = self.repo.list_expenses(date, date, viewer).await?;
        expenses.reverse();
        Ok(DayExpenses { date, expenses })
    }

    pub async fn delete(
        &self,
        id: i64,
    ) -> Result<(), LedgerError> {
        self.repo.delete_expense(id).await?;
        info!(id, "expense deleted");
        Ok(())
    }

    /// Every expense `viewer` may see from the first to the last day of the
    /// month, oldest first.
    pub async fn monthly_report(
        &self,
        viewer: Role,
        year: i32,
        month: u32,
    ) -> Result<MonthlyExpenseReport, LedgerError> {
        let (first, last) = month_bounds(year, month)?;
        let expenses = self.repo.list_expenses(first, last, viewer).await?;
        Ok(MonthlyExpenseReport::new(year, month, expenses))
    }
}

fn month_bounds(
    year: i32,
    month: u32,
) -> Result<(NaiveDate, NaiveDate), LedgerError> {
    let invalid = || LedgerError::Validation(format!("no such month: {year}-{month:02}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((first, last))
}
