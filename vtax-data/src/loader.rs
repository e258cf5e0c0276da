use std::io::Read;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use vtax_core::db::VehicleCatalog;
use vtax_core::{LocalCosts, RepositoryError, Vehicle, VehicleStatus};

/// Errors that can occur when importing vehicle stock.
#[derive(Debug, Error)]
pub enum VehicleLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Row {row}: chassis number is missing")]
    MissingChassis { row: usize },

    #[error("Row {row}: unknown status '{status}' (expected available or sold)")]
    InvalidStatus { row: usize, status: String },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for VehicleLoaderError {
    fn from(err: csv::Error) -> Self {
        VehicleLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of a stock export.
///
/// Headers follow the column names of the `vehicles` table. The dealer
/// system's own export names (`final_total_lkr`, `japan_total_lkr`,
/// `undial_amount_jpy`, ...) are accepted as aliases. Amount columns may be
/// blank and may carry `,` thousands separators.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VehicleRecord {
    pub chassis_no: String,
    #[serde(default)]
    pub maker: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(
        default,
        alias = "final_total_lkr",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub final_total_cost: Option<Decimal>,
    #[serde(
        default,
        alias = "japan_total_lkr",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub foreign_total_cost: Option<Decimal>,
    #[serde(default, alias = "tax_lkr", deserialize_with = "deserialize_optional_decimal")]
    pub local_tax: Option<Decimal>,
    #[serde(
        default,
        alias = "clearance_lkr",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub local_clearance: Option<Decimal>,
    #[serde(
        default,
        alias = "transport_lkr",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub local_transport: Option<Decimal>,
    #[serde(
        default,
        alias = "local_extra1_lkr",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub local_extra1: Option<Decimal>,
    #[serde(
        default,
        alias = "local_extra2_lkr",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub local_extra2: Option<Decimal>,
    #[serde(
        default,
        alias = "local_extra3_lkr",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub local_extra3: Option<Decimal>,
    #[serde(
        default,
        alias = "undial_amount_jpy",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub transfer_amount_foreign: Option<Decimal>,
    #[serde(
        default,
        alias = "undial_jpy_to_lkr_rate",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub transfer_rate: Option<Decimal>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .replace(',', "")
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl VehicleRecord {
    /// Validate the row and turn it into a [`Vehicle`]. `row` is the
    /// 1-based data row used in error messages; `now` stamps rows without a
    /// `created_at`.
    pub fn into_vehicle(
        self,
        row: usize,
        now: DateTime<Utc>,
    ) -> Result<Vehicle, VehicleLoaderError> {
        let chassis_no = self.chassis_no.trim().to_string();
        if chassis_no.is_empty() {
            return Err(VehicleLoaderError::MissingChassis { row });
        }

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => VehicleStatus::default(),
            Some(s) => VehicleStatus::parse(s).ok_or_else(|| VehicleLoaderError::InvalidStatus {
                row,
                status: s.to_string(),
            })?,
        };

        Ok(Vehicle {
            chassis_no,
            maker: self.maker.trim().to_string(),
            model: self.model.trim().to_string(),
            status,
            final_total_cost: self.final_total_cost,
            foreign_total_cost: self.foreign_total_cost,
            local_costs: LocalCosts {
                tax: self.local_tax,
                clearance: self.local_clearance,
                transport: self.local_transport,
                extra1: self.local_extra1,
                extra2: self.local_extra2,
                extra3: self.local_extra3,
            },
            transfer_amount_foreign: self.transfer_amount_foreign,
            transfer_rate: self.transfer_rate,
            created_at: self.created_at.unwrap_or(now),
        })
    }
}

/// Imports vehicle stock from CSV into any [`VehicleCatalog`] backend.
pub struct VehicleLoader;

impl VehicleLoader {
    /// Parse vehicle rows from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<VehicleRecord>, VehicleLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: VehicleRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Validate every row, then upsert them by chassis number.
    ///
    /// Nothing is written if any row is invalid. Re-importing the same file
    /// is idempotent; an existing vehicle keeps its original `created_at`.
    pub async fn load(
        catalog: &dyn VehicleCatalog,
        records: &[VehicleRecord],
    ) -> Result<usize, VehicleLoaderError> {
        let now = Utc::now();
        let vehicles = records
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, record)| record.into_vehicle(i + 1, now))
            .collect::<Result<Vec<_>, _>>()?;

        for vehicle in &vehicles {
            catalog.upsert_vehicle(vehicle).await?;
            debug!(chassis = %vehicle.chassis_no, "vehicle upserted");
        }

        info!(count = vehicles.len(), "vehicles imported");
        Ok(vehicles.len())
    }
}
