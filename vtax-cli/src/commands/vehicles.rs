use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use vtax_data::VehicleLoader;

use crate::app::App;

/// Reads a stock CSV and upserts every row. All-or-nothing: a bad row
/// aborts the import before anything is written.
pub async fn import(
    app: &App,
    file: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("cannot read '{}'", file.display()))?;
    let records = VehicleLoader::parse(bytes.as_slice())
        .with_context(|| format!("cannot parse '{}'", file.display()))?;
    let count = VehicleLoader::load(app.repos.catalog.as_ref(), &records).await?;

    writeln!(out, "Imported {count} vehicle(s) from {}", file.display())?;
    Ok(())
}
