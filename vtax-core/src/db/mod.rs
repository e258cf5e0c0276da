pub mod factory;
pub mod memory;
pub mod repository;

pub use factory::{DbConfig, Repositories, RepositoryFactory, RepositoryRegistry};
pub use memory::{MemoryRepository, MemoryRepositoryFactory};
pub use repository::{
    ExpenseRepository, RepositoryError, TaxRecordStore, VehicleCatalog, VehicleSearchGateway,
};
