pub mod calculations;
pub mod db;
pub mod invoice;
pub mod ledger;
pub mod models;
pub mod utils;
pub mod workflow;

pub use calculations::{CascadeInputs, CostBasis, TaxBreakdown, TaxCascade};
pub use db::repository::{RepositoryError, TaxRecordStore, VehicleSearchGateway};
pub use models::*;
pub use workflow::{TaxWorkflow, WorkflowError, WorkflowState};
