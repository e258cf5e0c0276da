use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vtax_core::db::{DbConfig, Repositories, RepositoryError, RepositoryFactory};

use crate::repository::SqliteRepository;

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`vtax_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use vtax_core::db::RepositoryRegistry;
/// use vtax_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and bring
    /// its schema up to date.
    ///
    /// Accepted values are a bare file path (`"dealer.db"`, created if
    /// missing), `":memory:"`, or a full `sqlite:` URL.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Repositories, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{:#}", e)))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;
        info!(database = %config.connection_string, "sqlite backend ready");
        Ok(Repositories::from_backend(Arc::new(repo)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use vtax_core::db::{DbConfig, RepositoryFactory};
    use vtax_core::{LocalCosts, Vehicle, VehicleStatus};

    use super::SqliteRepositoryFactory;

    fn memory_config() -> DbConfig {
        DbConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteRepositoryFactory.backend_name(), "sqlite");
    }

    /// Factory → migrated in-memory database, reachable through every
    /// handle of the bundle.
    #[tokio::test]
    async fn creates_migrated_in_memory_repositories() {
        let repos = SqliteRepositoryFactory
            .create(&memory_config())
            .await
            .expect("failed to create in-memory repositories");

        let vehicle = Vehicle {
            chassis_no: "ZRE142-3000".to_string(),
            maker: "Toyota".to_string(),
            model: "Axio".to_string(),
            status: VehicleStatus::Available,
            final_total_cost: None,
            foreign_total_cost: None,
            local_costs: LocalCosts::default(),
            transfer_amount_foreign: None,
            transfer_rate: None,
            created_at: Utc::now(),
        };
        repos.catalog.upsert_vehicle(&vehicle).await.unwrap();

        let found = repos.vehicles.search_vehicles("zre142").await.unwrap();
        assert_eq!(found.len(), 1);
        let flagged = repos
            .tax_records
            .find_tax_records(&[vehicle.chassis_no.clone()])
            .await
            .unwrap();
        assert!(flagged.is_empty());
    }

    #[tokio::test]
    async fn unreachable_path_is_a_connection_error() {
        let config = DbConfig {
            backend: "sqlite".to_string(),
            connection_string: "/nonexistent-dir/sub/dealer.db".to_string(),
        };

        let result = SqliteRepositoryFactory.create(&config).await;

        assert!(matches!(
            result,
            Err(vtax_core::RepositoryError::Connection(_))
        ));
    }
}
