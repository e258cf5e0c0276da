use std::fmt::Write as _;

use chrono::Month;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::invoice::format_currency;
use crate::models::Expense;

/// Letterhead printed at the top of generated documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompanyHeader {
    pub name: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyExpenseReport {
    pub year: i32,
    pub month: u32,
    pub expenses: Vec<Expense>,
    pub total: Decimal,
}

const WIDTH: usize = 72;

impl MonthlyExpenseReport {
    pub fn new(
        year: i32,
        month: u32,
        expenses: Vec<Expense>,
    ) -> Self {
        let total = expenses
            .iter()
            .map(|e| e.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add);
        Self {
            year,
            month,
            expenses,
            total,
        }
    }

    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map_or("", |m| m.name())
    }

    pub fn title(&self) -> String {
        format!("Monthly Expenses Report - {} {}", self.month_name(), self.year)
    }

    /// `Monthly-Expenses-MM-YYYY.txt`
    pub fn file_name(&self) -> String {
        format!("Monthly-Expenses-{:02}-{}.txt", self.month, self.year)
    }

    pub fn render_text(
        &self,
        header: &CompanyHeader,
        currency: &str,
    ) -> String {
        let mut out = String::new();
        for line in [&header.name, &header.address] {
            if !line.is_empty() {
                let _ = writeln!(out, "{line:^WIDTH$}");
            }
        }
        if !header.phone.is_empty() {
            let _ = writeln!(out, "{:^WIDTH$}", format!("Tel: {}", header.phone));
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{:^WIDTH$}", self.title());
        let _ = writeln!(out, "{}", "=".repeat(WIDTH));

        let amount_heading = format!("Amount ({currency})");
        let _ = writeln!(out, "{:<12}{:<44}{amount_heading:>16}", "Date", "Description");
        let _ = writeln!(out, "{}", "-".repeat(WIDTH));
        for expense in &self.expenses {
            let description: String = expense.description.chars().take(42).collect();
            let _ = writeln!(
                out,
                "{:<12}{description:<44}{:>16}",
                expense.expense_date.format("%Y-%m-%d").to_string(),
                format_currency(expense.amount)
            );
        }
        let _ = writeln!(out, "{}", "-".repeat(WIDTH));
        let _ = writeln!(
            out,
            "{:<12}{:<44}{:>16}",
            "",
            "Total Expenses:",
            format_currency(self.total)
        );
        out
    }
}
