//! Session workflow for working out and saving a vehicle's tax record.
//!
//! ```text
//! Idle ──select──▶ Selected ──edit (inputs complete)──▶ Computed ──save──▶ Saved
//!   ▲                 ▲  ▲                                 │  ▲            │
//!   │                 │  └──────edit (inputs incomplete)───┘  └──delete────┤
//!   └──search/list────┴─────────────────────────────────────── edit ───────┘
//! ```
//!
//! Any edit after a save drops back to `Computed`, so an invoice can only be
//! rendered for a record that matches what is on screen.

mod controller;
mod error;
mod state;

pub use controller::{DEFAULT_AVAILABLE_LIMIT, TaxWorkflow};
pub use error::WorkflowError;
pub use state::{CandidateQuery, InputField, WorkflowSnapshot, WorkflowState};
