//! Integration tests for stock import using the SQLite backend.

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;
use vtax_core::calculations::resolve_cost_basis;
use vtax_core::db::VehicleCatalog;
use vtax_core::{VehicleSearchGateway, VehicleStatus};
use vtax_data::{VehicleLoader, VehicleLoaderError};
use vtax_db_sqlite::SqliteRepository;

const TEST_CSV: &str = include_str!("../test-data/vehicles.csv");

async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");
    repo
}

#[tokio::test]
async fn test_load_fixture() {
    let repo = setup_test_db().await;
    let records = VehicleLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");

    let loaded = VehicleLoader::load(&repo, &records)
        .await
        .expect("Failed to load vehicles");

    assert_eq!(loaded, 4);
    let sold = repo.get_vehicle("GP5-1100").await.unwrap();
    assert_eq!(sold.status, VehicleStatus::Sold);
    assert_eq!(sold.final_total_cost, Some(dec!(2450000)));
    let mixed_case = repo.get_vehicle("ZRE142-3000").await.unwrap();
    assert_eq!(mixed_case.status, VehicleStatus::Available);
}

#[tokio::test]
async fn test_available_listing_after_import() {
    let repo = setup_test_db().await;
    let records = VehicleLoader::parse(TEST_CSV.as_bytes()).unwrap();
    VehicleLoader::load(&repo, &records).await.unwrap();

    let available = repo.list_available_vehicles(50).await.unwrap();

    let chassis: Vec<&str> = available.iter().map(|v| v.chassis_no.as_str()).collect();
    assert_eq!(chassis, vec!["NHP10-7788", "ZRE142-3000", "KSP130-2045"]);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let repo = setup_test_db().await;
    let records = VehicleLoader::parse(TEST_CSV.as_bytes()).unwrap();
    VehicleLoader::load(&repo, &records).await.unwrap();
    let before = repo.get_vehicle("KSP130-2045").await.unwrap();

    VehicleLoader::load(&repo, &records).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 4);
    assert_eq!(repo.get_vehicle("KSP130-2045").await.unwrap(), before);
}

#[tokio::test]
async fn test_imported_costs_resolve() {
    let repo = setup_test_db().await;
    let records = VehicleLoader::parse(TEST_CSV.as_bytes()).unwrap();
    VehicleLoader::load(&repo, &records).await.unwrap();

    let reference = resolve_cost_basis(&repo.get_vehicle("KSP130-2045").await.unwrap());
    assert_eq!(reference.total_cost_excluding_transfer, dec!(1150000));

    // Zero final total falls back to the component sum.
    let zero_final = resolve_cost_basis(&repo.get_vehicle("ZRE142-3000").await.unwrap());
    assert_eq!(zero_final.total_cost, dec!(2027500));

    let with_transfer = resolve_cost_basis(&repo.get_vehicle("NHP10-7788").await.unwrap());
    assert_eq!(with_transfer.transfer_amount.round_dp(4), dec!(1989.4875));
    assert_eq!(
        with_transfer.total_cost_excluding_transfer.round_dp(4),
        dec!(2462954.4625)
    );
}

#[tokio::test]
async fn test_invalid_row_writes_nothing() {
    let repo = setup_test_db().await;
    let csv = "chassis_no,maker,model,status\nA-1,Toyota,Vitz,available\nB-2,Toyota,Vitz,leased";
    let records = VehicleLoader::parse(csv.as_bytes()).unwrap();

    let result = VehicleLoader::load(&repo, &records).await;

    assert!(matches!(
        result,
        Err(VehicleLoaderError::InvalidStatus { row: 2, .. })
    ));
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}
