pub mod catalog;
pub mod manager;
pub mod models;
pub mod repository;

pub use catalog::{PgServiceCatalog, ServiceCatalog};
pub use manager::{DatabaseError, DatabaseManager};
pub use models::{ListOptions, ListResult, SubService, SubServiceInput};
pub use repository::{PgSubServiceRepository, SubServiceStore};
