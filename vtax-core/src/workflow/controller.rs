use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::error::WorkflowError;
use super::state::{CandidateQuery, InputField, Session, WorkflowSnapshot, WorkflowState};
use crate::calculations::{CascadeError, CascadeInputs, TaxCascade, resolve_cost_basis};
use crate::db::{Repositories, RepositoryError, TaxRecordStore, VehicleSearchGateway};
use crate::invoice::{InvoiceRenderer, RenderedDocument, TaxInvoice};
use crate::models::{NewTaxRecord, TaxRecord, Vehicle, VehicleCandidate};
use crate::utils::parse_optional_decimal;

/// Row cap for [`TaxWorkflow::list_available`].
pub const DEFAULT_AVAILABLE_LIMIT: u32 = 50;

/// Drives one user session: search, select, edit, save, delete, render.
///
/// All methods take `&self`; the session lock is never held across a store
/// call. A later `select` supersedes an earlier one still waiting on the
/// store, and only one save or delete may be in flight at a time.
pub struct TaxWorkflow {
    records: Arc<dyn TaxRecordStore>,
    vehicles: Arc<dyn VehicleSearchGateway>,
    cascade: TaxCascade,
    available_limit: u32,
    session: Mutex<Session>,
    generation: AtomicU64,
    write_in_flight: AtomicBool,
}

/// Clears the in-flight write flag when the save/delete finishes.
struct WriteGuard<'a>(&'a AtomicBool);

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TaxWorkflow {
    pub fn new(
        records: Arc<dyn TaxRecordStore>,
        vehicles: Arc<dyn VehicleSearchGateway>,
    ) -> Self {
        Self {
            records,
            vehicles,
            cascade: TaxCascade::new(),
            available_limit: DEFAULT_AVAILABLE_LIMIT,
            session: Mutex::new(Session::default()),
            generation: AtomicU64::new(0),
            write_in_flight: AtomicBool::new(false),
        }
    }

    pub fn from_repositories(repos: &Repositories) -> Self {
        Self::new(repos.tax_records.clone(), repos.vehicles.clone())
    }

    pub fn with_available_limit(
        mut self,
        limit: u32,
    ) -> Self {
        self.available_limit = limit;
        self
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.lock().view.clone()
    }

    /// Searches by partial chassis number and returns to `Idle`.
    ///
    /// The candidate list replaces the working selection: a successful
    /// search drops the selected vehicle, its inputs and any unsaved
    /// figures. Stored records are never touched. On a store failure the
    /// session is left as it was.
    pub async fn search(
        &self,
        query: &str,
    ) -> Result<Vec<VehicleCandidate>, WorkflowError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WorkflowError::EmptyQuery);
        }
        self.show_candidates(CandidateQuery::Search(query.to_string()))
            .await
    }

    /// Lists available vehicles, newest first, and returns to `Idle`.
    /// Drops the working selection the same way [`Self::search`] does.
    pub async fn list_available(&self) -> Result<Vec<VehicleCandidate>, WorkflowError> {
        self.show_candidates(CandidateQuery::Available).await
    }

    /// Makes `vehicle` the working selection.
    ///
    /// Inputs are re-seeded from the vehicle's cost basis. If the vehicle
    /// already has a record, its profit and paid VAT are loaded and the
    /// session lands in `Computed`; otherwise in `Selected`.
    pub async fn select(
        &self,
        vehicle: Vehicle,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(chassis = %vehicle.chassis_no, generation, "selecting vehicle");

        let existing = match self.records.get_tax_record(&vehicle.chassis_no).await {
            Ok(record) => Some(record),
            Err(RepositoryError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let mut session = self.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(chassis = %vehicle.chassis_no, "selection superseded");
            return Err(WorkflowError::Superseded);
        }

        let basis = resolve_cost_basis(&vehicle);
        let mut inputs = CascadeInputs {
            cost_excluding_transfer: Some(basis.total_cost_excluding_transfer),
            ..CascadeInputs::default()
        };
        let mut breakdown = None;
        let mut state = WorkflowState::Selected;

        if let Some(record) = &existing {
            inputs.expected_profit = Some(record.expected_profit);
            inputs.paid_vat = Some(record.paid_vat);
            if let Ok(computed) = self.cascade.calculate(&inputs) {
                if computed != record.breakdown() {
                    warn!(
                        chassis = %vehicle.chassis_no,
                        stored = %record.sold_price,
                        recomputed = %computed.sold_price,
                        "stored tax record differs from current vehicle costs"
                    );
                }
                breakdown = Some(computed);
                state = WorkflowState::Computed;
            }
        }

        session.view.vehicle = Some(vehicle);
        session.view.cost_basis = Some(basis);
        session.view.inputs = inputs;
        session.view.breakdown = breakdown;
        session.view.saved_record = existing;
        session.view.state = state;
        Ok(session.view.clone())
    }

    /// Sets one input from raw text and reruns the cascade.
    ///
    /// Unparseable or empty text clears the field. When the required inputs
    /// are complete the session moves to `Computed` (including from
    /// `Saved`); otherwise to `Selected`, keeping the last breakdown on
    /// screen.
    pub fn edit_input(
        &self,
        field: InputField,
        value: &str,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        let mut session = self.lock();
        if session.view.state == WorkflowState::Idle {
            return Err(WorkflowError::InvalidTransition {
                action: "edit inputs",
                state: WorkflowState::Idle,
            });
        }

        let parsed = parse_optional_decimal(value);
        match field {
            InputField::ExpectedProfit => session.view.inputs.expected_profit = parsed,
            InputField::PaidVat => session.view.inputs.paid_vat = parsed,
        }

        match self.cascade.calculate(&session.view.inputs) {
            Ok(breakdown) => {
                session.view.breakdown = Some(breakdown);
                session.view.state = WorkflowState::Computed;
            }
            Err(e) => {
                debug!(%e, "cascade withheld");
                session.view.state = WorkflowState::Selected;
            }
        }
        Ok(session.view.clone())
    }

    /// Persists the current figures and moves to `Saved`.
    ///
    /// The breakdown is recomputed from the current inputs so the stored row
    /// never disagrees with them. If the inputs or the selection change
    /// while the write is in flight, the record is still returned but the
    /// session does not move to `Saved`.
    pub async fn save(&self) -> Result<TaxRecord, WorkflowError> {
        let _write = self.begin_write()?;
        let generation = self.generation.load(Ordering::Acquire);

        let (record, inputs) = {
            let session = self.lock();
            let view = &session.view;
            let vehicle = view.vehicle.as_ref().ok_or(WorkflowError::NoVehicleSelected)?;
            if !matches!(view.state, WorkflowState::Computed | WorkflowState::Saved) {
                return match view.inputs.expected_profit {
                    None => Err(WorkflowError::MissingInput(InputField::ExpectedProfit)),
                    Some(_) => Err(WorkflowError::InvalidTransition {
                        action: "save",
                        state: view.state,
                    }),
                };
            }
            let basis = view.cost_basis.clone().unwrap_or_default();
            let breakdown = self.cascade.calculate(&view.inputs).map_err(|e| match e {
                CascadeError::MissingCostBasis => WorkflowError::NoVehicleSelected,
                CascadeError::MissingExpectedProfit => {
                    WorkflowError::MissingInput(InputField::ExpectedProfit)
                }
                e @ CascadeError::Overflow => WorkflowError::Calculation(e),
            })?;
            let expected_profit = view
                .inputs
                .expected_profit
                .ok_or(WorkflowError::MissingInput(InputField::ExpectedProfit))?;
            let record = NewTaxRecord::new(
                vehicle.chassis_no.clone(),
                &basis,
                expected_profit,
                view.inputs.paid_vat_or_zero(),
                &breakdown,
            );
            (record, view.inputs.clone())
        };

        let stored = self.records.upsert_tax_record(record).await?;
        info!(
            chassis = %stored.chassis_no,
            sold_price = %stored.sold_price,
            "tax record saved"
        );

        {
            let mut session = self.lock();
            let current = self.generation.load(Ordering::Acquire) == generation
                && session.view.inputs == inputs;
            if current {
                session.view.saved_record = Some(stored.clone());
                session.view.state = WorkflowState::Saved;
            } else {
                debug!(chassis = %stored.chassis_no, "session moved on during save");
            }
        }

        self.refresh_candidates().await;
        Ok(stored)
    }

    /// Removes the stored record for the selected vehicle and returns to
    /// `Computed`. The vehicle itself is untouched.
    pub async fn delete_record(&self) -> Result<(), WorkflowError> {
        let _write = self.begin_write()?;
        let generation = self.generation.load(Ordering::Acquire);

        let chassis_no = {
            let session = self.lock();
            let view = &session.view;
            let vehicle = view.vehicle.as_ref().ok_or(WorkflowError::NoVehicleSelected)?;
            if view.state != WorkflowState::Saved {
                return Err(WorkflowError::InvalidTransition {
                    action: "delete the record",
                    state: view.state,
                });
            }
            vehicle.chassis_no.clone()
        };

        let existed = match self.records.delete_tax_record(&chassis_no).await {
            Ok(()) => true,
            Err(RepositoryError::NotFound) => false,
            Err(e) => return Err(e.into()),
        };

        {
            // The row is gone either way; the session must stop claiming it.
            let mut session = self.lock();
            if self.generation.load(Ordering::Acquire) == generation {
                session.view.saved_record = None;
                session.view.state = WorkflowState::Computed;
            }
        }
        self.refresh_candidates().await;

        if existed {
            info!(chassis = %chassis_no, "tax record deleted");
            Ok(())
        } else {
            warn!(chassis = %chassis_no, "tax record was already gone");
            Err(WorkflowError::NotFound(chassis_no))
        }
    }

    /// Builds the invoice for the saved record and hands it to `renderer`.
    /// Only available in `Saved`; the session state does not change.
    pub fn render_invoice(
        &self,
        renderer: &dyn InvoiceRenderer,
    ) -> Result<RenderedDocument, WorkflowError> {
        let invoice = {
            let session = self.lock();
            let view = &session.view;
            if view.state != WorkflowState::Saved {
                return Err(WorkflowError::InvalidTransition {
                    action: "render an invoice",
                    state: view.state,
                });
            }
            let vehicle = view.vehicle.as_ref().ok_or(WorkflowError::NoVehicleSelected)?;
            let record = view
                .saved_record
                .as_ref()
                .ok_or_else(|| WorkflowError::NotFound(vehicle.chassis_no.clone()))?;
            TaxInvoice::from_record(vehicle, record)?
        };

        let document = renderer.render(&invoice)?;
        info!(file = %document.file_name, "invoice rendered");
        Ok(document)
    }

    async fn show_candidates(
        &self,
        query: CandidateQuery,
    ) -> Result<Vec<VehicleCandidate>, WorkflowError> {
        let candidates = self.fetch_candidates(&query).await?;
        debug!(?query, count = candidates.len(), "candidates loaded");

        // Abandon any select still waiting on the store.
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.lock()
            .reset_to_candidates(query, candidates.clone());
        Ok(candidates)
    }

    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<VehicleCandidate>, RepositoryError> {
        let vehicles = match query {
            CandidateQuery::Search(text) => self.vehicles.search_vehicles(text).await?,
            CandidateQuery::Available => {
                self.vehicles
                    .list_available_vehicles(self.available_limit)
                    .await?
            }
        };

        let chassis_nos: Vec<String> = vehicles.iter().map(|v| v.chassis_no.clone()).collect();
        let with_records = if chassis_nos.is_empty() {
            Default::default()
        } else {
            self.records.find_tax_records(&chassis_nos).await?
        };

        Ok(vehicles
            .into_iter()
            .map(|vehicle| VehicleCandidate {
                has_tax_record: with_records.contains(&vehicle.chassis_no),
                vehicle,
            })
            .collect())
    }

    /// Re-runs the last query after a write. Keeps the current state; a
    /// failure only leaves the annotations stale.
    async fn refresh_candidates(&self) {
        let Some(query) = self.lock().last_query.clone() else {
            return;
        };
        match self.fetch_candidates(&query).await {
            Ok(candidates) => self.lock().view.candidates = candidates,
            Err(e) => warn!(%e, ?query, "failed to refresh candidates"),
        }
    }

    fn begin_write(&self) -> Result<WriteGuard<'_>, WorkflowError> {
        self.write_in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| WorkflowError::Busy)?;
        Ok(WriteGuard(&self.write_in_flight))
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
