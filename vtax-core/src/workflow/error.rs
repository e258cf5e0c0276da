use thiserror::Error;

use super::state::{InputField, WorkflowState};
use crate::calculations::CascadeError;
use crate::db::RepositoryError;
use crate::invoice::InvoiceError;

/// Failures of a single workflow action. None are fatal; the session keeps
/// its pre-call state unless noted otherwise on the action.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: WorkflowState,
    },

    #[error("no vehicle selected")]
    NoVehicleSelected,

    #[error("{0} is required")]
    MissingInput(InputField),

    #[error("cannot compute the figures: {0}")]
    Calculation(CascadeError),

    #[error("enter a chassis number to search")]
    EmptyQuery,

    #[error("another save or delete is still in progress")]
    Busy,

    #[error("selection changed while the request was in flight")]
    Superseded,

    #[error("no tax record exists for '{0}'")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    #[error("invoice error: {0}")]
    Render(#[from] InvoiceError),
}
