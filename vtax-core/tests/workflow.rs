//! End-to-end session tests against the in-memory backend.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vtax_core::db::{
    DbConfig, MemoryRepository, MemoryRepositoryFactory, RepositoryRegistry, VehicleCatalog,
};
use vtax_core::invoice::PlainTextRenderer;
use vtax_core::workflow::{InputField, TaxWorkflow, WorkflowError, WorkflowState};
use vtax_core::{
    LocalCosts, NewTaxRecord, RepositoryError, TaxRecord, TaxRecordStore, Vehicle, VehicleStatus,
};

/// Initializes tracing subscriber so workflow logs show up on failure.
fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}

fn vehicle(
    chassis_no: &str,
    foreign: Decimal,
    local_tax: Decimal,
) -> Vehicle {
    Vehicle {
        chassis_no: chassis_no.to_string(),
        maker: "Toyota".to_string(),
        model: "Vitz".to_string(),
        status: VehicleStatus::Available,
        final_total_cost: None,
        foreign_total_cost: Some(foreign),
        local_costs: LocalCosts {
            tax: Some(local_tax),
            ..LocalCosts::default()
        },
        transfer_amount_foreign: None,
        transfer_rate: None,
        created_at: Utc::now(),
    }
}

async fn memory_workflow(vehicles: &[Vehicle]) -> (TaxWorkflow, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    for v in vehicles {
        repo.upsert_vehicle(v).await.unwrap();
    }
    (TaxWorkflow::new(repo.clone(), repo.clone()), repo)
}

// =========================================================================
// Reference scenario
// =========================================================================

#[tokio::test]
async fn reference_vehicle_from_search_to_invoice() {
    let _guard = init_test_tracing();
    let ksp = vehicle("KSP130-2045", dec!(1_000_000), dec!(150_000));
    let (workflow, repo) = memory_workflow(&[ksp.clone()]).await;

    let candidates = workflow.search("ksp130").await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert!(!candidates[0].has_tax_record);

    let selected = workflow.select(candidates[0].vehicle.clone()).await.unwrap();
    assert_eq!(selected.state, WorkflowState::Selected);

    let snap = workflow
        .edit_input(InputField::ExpectedProfit, "0")
        .unwrap();
    let breakdown = snap.breakdown.unwrap();
    assert_eq!(breakdown.cost_with_profit, dec!(1_150_000));
    assert_eq!(breakdown.levy, dec!(14_375));
    assert_eq!(breakdown.cost_with_profit_and_levy, dec!(1_164_375));
    assert_eq!(breakdown.vat_obligation, dec!(177_617));
    assert_eq!(breakdown.vat_difference, dec!(177_617));
    assert_eq!(breakdown.sold_price, dec!(1_341_992));

    let snap = workflow
        .edit_input(InputField::PaidVat, "177617")
        .unwrap();
    assert_eq!(snap.breakdown.as_ref().unwrap().vat_difference, dec!(0));
    assert_eq!(snap.breakdown.as_ref().unwrap().sold_price, dec!(1_164_375));

    let stored = workflow.save().await.unwrap();
    assert_eq!(repo.get_tax_record("KSP130-2045").await.unwrap(), stored);
    assert!(workflow.snapshot().candidates[0].has_tax_record);

    let document = workflow
        .render_invoice(&PlainTextRenderer::default())
        .unwrap();
    let text = String::from_utf8(document.content).unwrap();
    assert!(text.contains("Chassis No: KSP130-2045"));
    assert!(text.contains("1,164,375"));
}

#[tokio::test]
async fn overpaid_vat_lowers_sold_price() {
    let (workflow, _) =
        memory_workflow(&[vehicle("KSP130-2045", dec!(1_000_000), dec!(150_000))]).await;
    workflow
        .select(vehicle("KSP130-2045", dec!(1_000_000), dec!(150_000)))
        .await
        .unwrap();
    workflow
        .edit_input(InputField::ExpectedProfit, "0")
        .unwrap();

    let snap = workflow
        .edit_input(InputField::PaidVat, "177683")
        .unwrap();

    let breakdown = snap.breakdown.unwrap();
    assert_eq!(breakdown.vat_difference, dec!(-66));
    assert_eq!(breakdown.sold_price, dec!(1_164_309));
}

#[tokio::test]
async fn reselecting_saved_vehicle_recomputes_identical_figures() {
    let v = vehicle("NHP10-7788", dec!(2_345_678.4), dec!(98_765.55));
    let (workflow, _) = memory_workflow(&[v.clone()]).await;
    workflow.select(v.clone()).await.unwrap();
    workflow
        .edit_input(InputField::ExpectedProfit, "125,000.75")
        .unwrap();
    workflow
        .edit_input(InputField::PaidVat, "10000.5")
        .unwrap();
    let stored = workflow.save().await.unwrap();

    workflow.list_available().await.unwrap();
    let snap = workflow.select(v).await.unwrap();

    assert_eq!(snap.state, WorkflowState::Computed);
    assert_eq!(snap.breakdown, Some(stored.breakdown()));
    assert_eq!(snap.inputs.paid_vat, Some(dec!(10000.5)));
}

#[tokio::test]
async fn saving_twice_keeps_a_single_record() {
    let v = vehicle("GP5-1100", dec!(800_000), dec!(60_000));
    let (workflow, repo) = memory_workflow(&[v.clone()]).await;
    workflow.select(v).await.unwrap();
    workflow
        .edit_input(InputField::ExpectedProfit, "50000")
        .unwrap();

    let first = workflow.save().await.unwrap();
    let second = workflow.save().await.unwrap();

    assert_eq!(first.id, second.id);
    let found = repo
        .find_tax_records(&["GP5-1100".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}

// =========================================================================
// Store failures
// =========================================================================

/// Delegates to a memory store but fails every write while `broken` is set.
struct FlakyStore {
    inner: Arc<MemoryRepository>,
    broken: AtomicBool,
}

#[async_trait]
impl TaxRecordStore for FlakyStore {
    async fn upsert_tax_record(
        &self,
        record: NewTaxRecord,
    ) -> Result<TaxRecord, RepositoryError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection("connection reset".to_string()));
        }
        self.inner.upsert_tax_record(record).await
    }

    async fn get_tax_record(&self, chassis_no: &str) -> Result<TaxRecord, RepositoryError> {
        self.inner.get_tax_record(chassis_no).await
    }

    async fn delete_tax_record(&self, chassis_no: &str) -> Result<(), RepositoryError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection("connection reset".to_string()));
        }
        self.inner.delete_tax_record(chassis_no).await
    }

    async fn find_tax_records(
        &self,
        chassis_nos: &[String],
    ) -> Result<HashSet<String>, RepositoryError> {
        self.inner.find_tax_records(chassis_nos).await
    }
}

async fn flaky_workflow(v: &Vehicle) -> (TaxWorkflow, Arc<FlakyStore>) {
    let repo = Arc::new(MemoryRepository::new());
    repo.upsert_vehicle(v).await.unwrap();
    let store = Arc::new(FlakyStore {
        inner: repo.clone(),
        broken: AtomicBool::new(false),
    });
    (TaxWorkflow::new(store.clone(), repo), store)
}

#[tokio::test]
async fn failed_save_stays_computed() {
    let v = vehicle("ZVW30-0001", dec!(1_500_000), dec!(0));
    let (workflow, store) = flaky_workflow(&v).await;
    workflow.select(v).await.unwrap();
    workflow
        .edit_input(InputField::ExpectedProfit, "10000")
        .unwrap();
    store.broken.store(true, Ordering::SeqCst);

    let err = workflow.save().await.unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Store(RepositoryError::Connection(_))
    ));
    let snap = workflow.snapshot();
    assert_eq!(snap.state, WorkflowState::Computed);
    assert_eq!(snap.saved_record, None);
}

#[tokio::test]
async fn failed_delete_stays_saved() {
    let v = vehicle("ZVW30-0002", dec!(1_500_000), dec!(0));
    let (workflow, store) = flaky_workflow(&v).await;
    workflow.select(v).await.unwrap();
    workflow
        .edit_input(InputField::ExpectedProfit, "10000")
        .unwrap();
    workflow.save().await.unwrap();
    store.broken.store(true, Ordering::SeqCst);

    assert!(workflow.delete_record().await.is_err());

    let snap = workflow.snapshot();
    assert_eq!(snap.state, WorkflowState::Saved);
    assert!(snap.saved_record.is_some());
}

// =========================================================================
// Backend registry
// =========================================================================

#[tokio::test]
async fn workflow_runs_on_registry_built_backend() {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(MemoryRepositoryFactory));
    let repos = registry
        .create(&DbConfig {
            backend: "memory".to_string(),
            connection_string: String::new(),
        })
        .await
        .unwrap();
    let v = vehicle("AXVH70-5500", dec!(3_000_000), dec!(400_000));
    repos.catalog.upsert_vehicle(&v).await.unwrap();

    let workflow = TaxWorkflow::from_repositories(&repos);
    let candidates = workflow.list_available().await.unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].vehicle.chassis_no, "AXVH70-5500");
}
