//! `vtax.toml` configuration.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "dealer.db"
//!
//! [invoice]
//! output_dir = "invoices"
//! currency = "LKR"
//!
//! [company]
//! name = "Lanka Auto Traders"
//! address = "12 Main Street, Colombo"
//! phone = "011 000 0000"
//!
//! [search]
//! available_limit = 50
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use vtax_core::db::DbConfig;
use vtax_core::ledger::CompanyHeader;
use vtax_core::workflow::DEFAULT_AVAILABLE_LIMIT;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "vtax.toml";

/// Database file used when neither the config nor `--db` names one.
pub const DEFAULT_DATABASE_FILE: &str = "vtax.db";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub invoice: InvoiceConfig,
    pub company: CompanyHeader,
    pub search: SearchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DbConfig {
                backend: "sqlite".to_string(),
                connection_string: DEFAULT_DATABASE_FILE.to_string(),
            },
            invoice: InvoiceConfig::default(),
            company: CompanyHeader::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvoiceConfig {
    /// Where invoices and reports are written.
    pub output_dir: PathBuf,
    pub currency: String,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            currency: "LKR".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub available_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            available_limit: DEFAULT_AVAILABLE_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid configuration")
    }

    /// Reads `path` if given (it must exist), else `vtax.toml` in the
    /// working directory if present, else defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !tokio::fs::try_exists(&default).await.unwrap_or(false) {
                    debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        debug!(path = %path.display(), "configuration loaded");
        Self::from_toml_str(&raw).with_context(|| format!("in '{}'", path.display()))
    }

    /// Command-line flags win over the file.
    pub fn apply_overrides(
        &mut self,
        backend: Option<String>,
        db: Option<String>,
    ) {
        if let Some(backend) = backend {
            self.database.backend = backend;
        }
        if let Some(db) = db {
            self.database.connection_string = db;
        }
    }
}
