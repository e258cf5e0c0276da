use std::io::Write;

use anyhow::{Context, Result, bail};
use vtax_core::invoice::format_currency;
use vtax_core::utils::parse_decimal;
use vtax_core::workflow::{InputField, WorkflowSnapshot};
use vtax_core::{TaxWorkflow, VehicleCandidate, WorkflowError};

use crate::app::App;
use crate::cli::ComputeArgs;

pub async fn search(
    app: &App,
    query: &str,
    out: &mut impl Write,
) -> Result<()> {
    let candidates = app.workflow().search(query).await?;
    print_candidates(&candidates, out)
}

pub async fn available(
    app: &App,
    out: &mut impl Write,
) -> Result<()> {
    let candidates = app.workflow().list_available().await?;
    print_candidates(&candidates, out)
}

/// Selects the vehicle, applies any given inputs and prints the figures.
/// Inputs not given on the command line come from the saved record.
pub async fn compute(
    app: &App,
    args: &ComputeArgs,
    out: &mut impl Write,
) -> Result<()> {
    let workflow = app.workflow();
    select_chassis(&workflow, &args.chassis).await?;

    for (field, value) in [
        (InputField::ExpectedProfit, &args.profit),
        (InputField::PaidVat, &args.paid_vat),
    ] {
        if let Some(value) = value {
            parse_decimal(value).with_context(|| format!("invalid {field}"))?;
            workflow.edit_input(field, value)?;
        }
    }

    let snapshot = workflow.snapshot();
    if !snapshot.can_save() {
        return Err(WorkflowError::MissingInput(InputField::ExpectedProfit).into());
    }
    print_figures(&snapshot, &app.config.invoice.currency, out)?;

    if args.save || args.invoice {
        let record = workflow.save().await?;
        writeln!(out, "Saved tax record for {}", record.chassis_no)?;
    }
    if args.invoice {
        write_invoice(app, &workflow, out).await?;
    }
    Ok(())
}

pub async fn show(
    app: &App,
    chassis: &str,
    out: &mut impl Write,
) -> Result<()> {
    let workflow = app.workflow();
    let snapshot = select_chassis(&workflow, chassis).await?;
    let Some(record) = &snapshot.saved_record else {
        bail!(WorkflowError::NotFound(snapshot.selected_chassis().unwrap_or(chassis).to_string()));
    };

    print_figures(&snapshot, &app.config.invoice.currency, out)?;
    writeln!(
        out,
        "Last saved {}",
        record.updated_at.format("%Y-%m-%d %H:%M UTC")
    )?;
    Ok(())
}

/// Removes the record; the vehicle stays in stock.
pub async fn delete(
    app: &App,
    chassis: &str,
    out: &mut impl Write,
) -> Result<()> {
    let workflow = app.workflow();
    load_saved(&workflow, chassis).await?;
    workflow.delete_record().await?;

    let snapshot = workflow.snapshot();
    writeln!(
        out,
        "Deleted tax record for {}",
        snapshot.selected_chassis().unwrap_or(chassis)
    )?;
    Ok(())
}

pub async fn invoice(
    app: &App,
    chassis: &str,
    out: &mut impl Write,
) -> Result<()> {
    let workflow = app.workflow();
    load_saved(&workflow, chassis).await?;
    write_invoice(app, &workflow, out).await
}

/// Finds the vehicle whose chassis number matches exactly (ignoring case)
/// and selects it.
async fn select_chassis(
    workflow: &TaxWorkflow,
    chassis: &str,
) -> Result<WorkflowSnapshot> {
    let candidates = workflow.search(chassis).await?;
    let wanted = chassis.trim();
    let Some(candidate) = candidates
        .into_iter()
        .find(|c| c.vehicle.chassis_no.eq_ignore_ascii_case(wanted))
    else {
        bail!("no vehicle with chassis number '{wanted}'");
    };
    Ok(workflow.select(candidate.vehicle).await?)
}

/// Selects the vehicle and brings its stored record to `Saved`.
///
/// Selecting a vehicle with a record lands in `Computed`; writing the same
/// inputs back is an idempotent upsert that confirms the stored figures.
/// If the vehicle's costs changed since the record was saved, the re-save
/// would replace the stored figures, so the command is refused instead.
async fn load_saved(
    workflow: &TaxWorkflow,
    chassis: &str,
) -> Result<()> {
    let snapshot = select_chassis(workflow, chassis).await?;
    let chassis = snapshot.selected_chassis().unwrap_or(chassis).to_string();
    let Some(record) = &snapshot.saved_record else {
        bail!(WorkflowError::NotFound(chassis));
    };
    let unchanged = snapshot.cost_basis.as_ref() == Some(&record.cost_basis())
        && snapshot.breakdown.as_ref() == Some(&record.breakdown());
    if !unchanged {
        bail!(
            "stored figures for '{chassis}' no longer match the vehicle's costs; \
             run `vtax tax compute {chassis} --save` to update them"
        );
    }
    workflow.save().await?;
    Ok(())
}

async fn write_invoice(
    app: &App,
    workflow: &TaxWorkflow,
    out: &mut impl Write,
) -> Result<()> {
    let document = workflow.render_invoice(&app.renderer())?;
    let path = app.write_document(&document.file_name, &document.content).await?;
    writeln!(out, "Invoice written to {}", path.display())?;
    Ok(())
}

fn print_candidates(
    candidates: &[VehicleCandidate],
    out: &mut impl Write,
) -> Result<()> {
    if candidates.is_empty() {
        writeln!(out, "No vehicles found")?;
        return Ok(());
    }
    for candidate in candidates {
        let vehicle = &candidate.vehicle;
        writeln!(
            out,
            "{:<18} {:<24} {:<10} {}",
            vehicle.chassis_no,
            vehicle.display_name(),
            vehicle.status.label(),
            if candidate.has_tax_record { "tax record" } else { "" }
        )?;
    }
    Ok(())
}

fn print_figures(
    snapshot: &WorkflowSnapshot,
    currency: &str,
    out: &mut impl Write,
) -> Result<()> {
    let (Some(vehicle), Some(basis), Some(breakdown)) =
        (&snapshot.vehicle, &snapshot.cost_basis, &snapshot.breakdown)
    else {
        return Ok(());
    };
    let inputs = &snapshot.inputs;

    writeln!(out, "{} ({})", vehicle.display_name(), vehicle.chassis_no)?;
    let rows = [
        ("Total Cost", basis.total_cost),
        ("Transfer Amount", basis.transfer_amount),
        ("Total Cost Without Transfer", basis.total_cost_excluding_transfer),
        ("Expected Profit", inputs.expected_profit.unwrap_or_default()),
        ("Cost with Profit", breakdown.cost_with_profit),
        ("Levy (1.25%)", breakdown.levy),
        ("Cost with Profit + Levy", breakdown.cost_with_profit_and_levy),
        ("VAT to be Paid (18/118)", breakdown.vat_obligation),
        ("Paid VAT", inputs.paid_vat_or_zero()),
        ("VAT Difference", breakdown.vat_difference),
        ("Sold Price", breakdown.sold_price),
    ];
    for (label, value) in rows {
        writeln!(out, "  {label:<30} {currency} {:>14}", format_currency(value))?;
    }
    Ok(())
}
