use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Vehicle;

/// Baseline figures that seed the tax cascade.
///
/// Nothing here is rounded; the cascade rounds at each of its own stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBasis {
    /// Landed cost in local currency.
    pub total_cost: Decimal,
    /// Pass-through transfer converted to local currency.
    pub transfer_amount: Decimal,
    /// `total_cost - transfer_amount`, the profit-bearing cost.
    pub total_cost_excluding_transfer: Decimal,
}

impl From<&Vehicle> for CostBasis {
    fn from(vehicle: &Vehicle) -> Self {
        resolve_cost_basis(vehicle)
    }
}

/// Derives the cost basis from a vehicle snapshot.
///
/// A recorded final total wins. Without one (or when it is zero) the total is
/// the purchase-side total plus every local add-on. The transfer is only
/// converted when both the amount and the rate are present and non-zero.
///
/// Arithmetic saturates at the `Decimal` bounds; such a basis is far outside
/// [`MAX_AMOUNT`](super::cascade::MAX_AMOUNT) and the cascade rejects it.
pub fn resolve_cost_basis(vehicle: &Vehicle) -> CostBasis {
    let total_cost = match non_zero(vehicle.final_total_cost) {
        Some(total) => total,
        None => vehicle
            .foreign_total_cost
            .unwrap_or_default()
            .saturating_add(vehicle.local_costs.total()),
    };

    let transfer_amount = match (
        non_zero(vehicle.transfer_amount_foreign),
        non_zero(vehicle.transfer_rate),
    ) {
        (Some(amount), Some(rate)) => amount.saturating_mul(rate),
        _ => Decimal::ZERO,
    };

    CostBasis {
        total_cost,
        transfer_amount,
        total_cost_excluding_transfer: total_cost.saturating_sub(transfer_amount),
    }
}

fn non_zero(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| !v.is_zero())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{LocalCosts, VehicleStatus};

    fn bare_vehicle() -> Vehicle {
        Vehicle {
            chassis_no: "NZE141-9012345".to_string(),
            maker: "Toyota".to_string(),
            model: "Axio".to_string(),
            status: VehicleStatus::Available,
            final_total_cost: None,
            foreign_total_cost: None,
            local_costs: LocalCosts::default(),
            transfer_amount_foreign: None,
            transfer_rate: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn final_total_takes_precedence_over_components() {
        let vehicle = Vehicle {
            final_total_cost: Some(dec!(6500000)),
            foreign_total_cost: Some(dec!(4000000)),
            local_costs: LocalCosts {
                tax: Some(dec!(1800000)),
                ..Default::default()
            },
            ..bare_vehicle()
        };

        let basis = resolve_cost_basis(&vehicle);

        assert_eq!(basis.total_cost, dec!(6500000));
    }

    #[test]
    fn total_is_derived_when_final_total_absent() {
        let vehicle = Vehicle {
            foreign_total_cost: Some(dec!(4000000)),
            local_costs: LocalCosts {
                tax: Some(dec!(1800000)),
                clearance: Some(dec!(85000)),
                transport: Some(dec!(40000)),
                extra1: Some(dec!(12000)),
                extra2: None,
                extra3: Some(dec!(3000)),
            },
            ..bare_vehicle()
        };

        let basis = resolve_cost_basis(&vehicle);

        assert_eq!(basis.total_cost, dec!(5940000));
    }

    #[test]
    fn zero_final_total_is_treated_as_absent() {
        let vehicle = Vehicle {
            final_total_cost: Some(dec!(0)),
            foreign_total_cost: Some(dec!(1000)),
            ..bare_vehicle()
        };

        assert_eq!(resolve_cost_basis(&vehicle).total_cost, dec!(1000));
    }

    #[test]
    fn transfer_is_converted_with_rate() {
        let vehicle = Vehicle {
            final_total_cost: Some(dec!(6500000)),
            transfer_amount_foreign: Some(dec!(250000)),
            transfer_rate: Some(dec!(2.05)),
            ..bare_vehicle()
        };

        let basis = resolve_cost_basis(&vehicle);

        assert_eq!(basis.transfer_amount, dec!(512500));
        assert_eq!(basis.total_cost_excluding_transfer, dec!(5987500));
    }

    #[test]
    fn transfer_is_not_rounded() {
        let vehicle = Vehicle {
            final_total_cost: Some(dec!(1000000)),
            transfer_amount_foreign: Some(dec!(1001)),
            transfer_rate: Some(dec!(1.9875)),
            ..bare_vehicle()
        };

        let basis = resolve_cost_basis(&vehicle);

        assert_eq!(basis.transfer_amount, dec!(1989.4875));
        assert_eq!(basis.total_cost_excluding_transfer, dec!(998010.5125));
    }

    #[test]
    fn transfer_without_rate_is_zero() {
        let vehicle = Vehicle {
            final_total_cost: Some(dec!(1000000)),
            transfer_amount_foreign: Some(dec!(250000)),
            transfer_rate: None,
            ..bare_vehicle()
        };

        let basis = resolve_cost_basis(&vehicle);

        assert_eq!(basis.transfer_amount, Decimal::ZERO);
        assert_eq!(basis.total_cost_excluding_transfer, dec!(1000000));
    }

    #[test]
    fn extreme_components_saturate_instead_of_panicking() {
        let vehicle = Vehicle {
            foreign_total_cost: Some(Decimal::MAX),
            local_costs: LocalCosts {
                tax: Some(Decimal::MAX),
                ..Default::default()
            },
            transfer_amount_foreign: Some(Decimal::MIN),
            transfer_rate: Some(dec!(2)),
            ..bare_vehicle()
        };

        let basis = resolve_cost_basis(&vehicle);

        assert_eq!(basis.total_cost, Decimal::MAX);
        assert_eq!(basis.transfer_amount, Decimal::MIN);
        assert_eq!(basis.total_cost_excluding_transfer, Decimal::MAX);
    }

    #[test]
    fn empty_vehicle_resolves_to_zero() {
        assert_eq!(resolve_cost_basis(&bare_vehicle()), CostBasis::default());
    }
}
