use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStatus {
    #[default]
    Available,
    Sold,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Sold => "sold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Some(Self::Available),
            "sold" => Some(Self::Sold),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Sold => "Sold",
        }
    }
}

/// Local-currency add-ons paid after the vehicle lands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCosts {
    pub tax: Option<Decimal>,
    pub clearance: Option<Decimal>,
    pub transport: Option<Decimal>,
    pub extra1: Option<Decimal>,
    pub extra2: Option<Decimal>,
    pub extra3: Option<Decimal>,
}

impl LocalCosts {
    /// Sum of every add-on, absent items counting as zero. Saturates at the
    /// `Decimal` bounds instead of overflowing.
    pub fn total(&self) -> Decimal {
        [
            self.tax,
            self.clearance,
            self.transport,
            self.extra1,
            self.extra2,
            self.extra3,
        ]
        .into_iter()
        .flatten()
        .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}

/// Read-only snapshot of a stock vehicle, keyed by chassis number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub chassis_no: String,
    pub maker: String,
    pub model: String,
    pub status: VehicleStatus,

    /// Final landed cost in local currency, when already settled.
    pub final_total_cost: Option<Decimal>,
    /// Purchase-side total, already expressed in local currency.
    pub foreign_total_cost: Option<Decimal>,
    pub local_costs: LocalCosts,

    // Pass-through transfer, held in the purchase currency
    pub transfer_amount_foreign: Option<Decimal>,
    pub transfer_rate: Option<Decimal>,

    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    /// "Maker Model" heading used on screens and invoices.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.maker, self.model)
    }
}

/// Search hit annotated with whether a tax record already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleCandidate {
    pub vehicle: Vehicle,
    pub has_tax_record: bool,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn local_costs_total_skips_missing_items() {
        let costs = LocalCosts {
            tax: Some(dec!(100000)),
            clearance: None,
            transport: Some(dec!(15000.50)),
            extra1: None,
            extra2: Some(dec!(2500)),
            extra3: None,
        };

        assert_eq!(costs.total(), dec!(117500.50));
    }

    #[test]
    fn local_costs_total_of_empty_is_zero() {
        assert_eq!(LocalCosts::default().total(), Decimal::ZERO);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(VehicleStatus::parse("Available"), Some(VehicleStatus::Available));
        assert_eq!(VehicleStatus::parse(" SOLD "), Some(VehicleStatus::Sold));
        assert_eq!(VehicleStatus::parse("reserved"), None);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [VehicleStatus::Available, VehicleStatus::Sold] {
            assert_eq!(VehicleStatus::parse(status.as_str()), Some(status));
        }
    }
}
