use std::io::Write;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use vtax_core::invoice::format_currency;
use vtax_core::ledger::LedgerUser;

use crate::app::App;
use crate::cli::ExpensesArgs;

pub fn user(args: &ExpensesArgs) -> LedgerUser {
    LedgerUser {
        id: args.user.clone(),
        role: args.role,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn add(
    app: &App,
    user: &LedgerUser,
    date: Option<NaiveDate>,
    description: &str,
    amount: &str,
    out: &mut impl Write,
) -> Result<()> {
    let expense = app
        .ledger()
        .add(user, date.unwrap_or_else(today), description, amount)
        .await?;
    writeln!(
        out,
        "Recorded expense #{} on {}: {} {}",
        expense.id,
        expense.expense_date,
        app.config.invoice.currency,
        format_currency(expense.amount)
    )?;
    Ok(())
}

/// Lists one day's expenses, newest first, with the day's total.
pub async fn day(
    app: &App,
    user: &LedgerUser,
    date: Option<NaiveDate>,
    out: &mut impl Write,
) -> Result<()> {
    let day = app.ledger().for_day(user.role, date.unwrap_or_else(today)).await?;
    let currency = &app.config.invoice.currency;

    writeln!(out, "Expenses for {}", day.date.format("%Y-%m-%d"))?;
    if day.expenses.is_empty() {
        writeln!(out, "  none recorded")?;
        return Ok(());
    }
    for expense in &day.expenses {
        writeln!(
            out,
            "  #{:<6} {:<40} {currency} {:>12}",
            expense.id,
            expense.description,
            format_currency(expense.amount)
        )?;
    }
    writeln!(out, "  {:<47} {currency} {:>12}", "Total", format_currency(day.total()))?;
    Ok(())
}

pub async fn delete(
    app: &App,
    id: i64,
    out: &mut impl Write,
) -> Result<()> {
    app.ledger().delete(id).await?;
    writeln!(out, "Deleted expense #{id}")?;
    Ok(())
}

/// Writes the monthly report under the output directory.
pub async fn report(
    app: &App,
    user: &LedgerUser,
    year: i32,
    month: u32,
    out: &mut impl Write,
) -> Result<()> {
    let report = app.ledger().monthly_report(user.role, year, month).await?;
    let text = report.render_text(&app.config.company, &app.config.invoice.currency);
    let path = app.write_document(&report.file_name(), text.as_bytes()).await?;

    writeln!(
        out,
        "{}: {} expense(s), total {} {}",
        report.title(),
        report.expenses.len(),
        app.config.invoice.currency,
        format_currency(report.total)
    )?;
    writeln!(out, "Report written to {}", path.display())?;
    Ok(())
}
