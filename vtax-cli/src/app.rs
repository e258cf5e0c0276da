use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use vtax_core::TaxWorkflow;
use vtax_core::db::{MemoryRepositoryFactory, Repositories, RepositoryRegistry};
use vtax_core::invoice::PlainTextRenderer;
use vtax_core::ledger::ExpenseLedger;
use vtax_db_sqlite::SqliteRepositoryFactory;

use crate::config::AppConfig;

/// Every backend this binary can talk to.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(MemoryRepositoryFactory));
    registry
}

/// Opened stores plus the configuration they were opened with.
pub struct App {
    pub config: AppConfig,
    pub repos: Repositories,
}

impl App {
    pub async fn open(config: AppConfig) -> Result<Self> {
        debug!(backend = %config.database.backend, "opening stores");
        let repos = build_registry()
            .create(&config.database)
            .await
            .with_context(|| format!("cannot open '{}' backend", config.database.backend))?;
        Ok(Self { config, repos })
    }

    pub fn workflow(&self) -> TaxWorkflow {
        TaxWorkflow::from_repositories(&self.repos)
            .with_available_limit(self.config.search.available_limit)
    }

    pub fn ledger(&self) -> ExpenseLedger {
        ExpenseLedger::new(self.repos.expenses.clone())
    }

    pub fn renderer(&self) -> PlainTextRenderer {
        PlainTextRenderer::new(self.config.invoice.currency.clone())
    }

    /// Writes a generated document under the configured output directory
    /// and returns its path.
    pub async fn write_document(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf> {
        let dir: &Path = &self.config.invoice.output_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("cannot create '{}'", dir.display()))?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("cannot write '{}'", path.display()))?;
        info!(path = %path.display(), "document written");
        Ok(path)
    }
}
