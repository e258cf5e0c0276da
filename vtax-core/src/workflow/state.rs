use std::fmt;

use serde::Serialize;

use crate::calculations::{CascadeInputs, CostBasis, TaxBreakdown};
use crate::models::{TaxRecord, Vehicle, VehicleCandidate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum WorkflowState {
    /// No vehicle selected.
    #[default]
    Idle,
    /// Vehicle chosen; the cascade has no output for the current inputs.
    Selected,
    /// The cascade has output for the current inputs, not yet persisted.
    Computed,
    /// The persisted record matches the current inputs.
    Saved,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Selected => "selected",
            Self::Computed => "computed",
            Self::Saved => "saved",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-editable cascade inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InputField {
    ExpectedProfit,
    PaidVat,
}

impl fmt::Display for InputField {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::ExpectedProfit => f.write_str("expected profit"),
            Self::PaidVat => f.write_str("paid VAT"),
        }
    }
}

/// The query that produced the current candidate list, re-run after writes
/// to refresh the "has record" annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CandidateQuery {
    Search(String),
    Available,
}

/// Immutable view of the session, republished after every action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub candidates: Vec<VehicleCandidate>,
    pub vehicle: Option<Vehicle>,
    pub cost_basis: Option<CostBasis>,
    pub inputs: CascadeInputs,
    /// Latest cascade output. Kept on screen when an edit leaves the inputs
    /// incomplete, in which case `state` is `Selected`.
    pub breakdown: Option<TaxBreakdown>,
    /// The stored record for the selected vehicle, if one exists.
    pub saved_record: Option<TaxRecord>,
}

impl WorkflowSnapshot {
    pub fn can_save(&self) -> bool {
        matches!(self.state, WorkflowState::Computed | WorkflowState::Saved)
            && self.inputs.expected_profit.is_some()
    }

    pub fn can_render(&self) -> bool {
        self.state == WorkflowState::Saved && self.saved_record.is_some()
    }

    pub fn selected_chassis(&self) -> Option<&str> {
        self.vehicle.as_ref().map(|v| v.chassis_no.as_str())
    }
}

/// Controller-private session: the published view plus bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub view: WorkflowSnapshot,
    pub last_query: Option<CandidateQuery>,
}

impl Session {
    /// Drop the working selection and show a fresh candidate list.
    pub fn reset_to_candidates(
        &mut self,
        query: CandidateQuery,
        candidates: Vec<VehicleCandidate>,
    ) {
        self.view = WorkflowSnapshot {
            candidates,
            ..WorkflowSnapshot::default()
        };
        self.last_query = Some(query);
    }
}
