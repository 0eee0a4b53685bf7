use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Read-only view of the parent API catalog.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn exists(&self, service_id: Uuid) -> Result<bool, DatabaseError>;

    /// Owner of a live service; `None` when the service is missing.
    async fn owner_id(&self, service_id: Uuid) -> Result<Option<Uuid>, DatabaseError>;
}

pub struct PgServiceCatalog {
    pool: PgPool,
}

impl PgServiceCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceCatalog for PgServiceCatalog {
    async fn exists(&self, service_id: Uuid) -> Result<bool, DatabaseError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM service WHERE service_id = $1 AND delete_time = 0)")
                .bind(service_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn owner_id(&self, service_id: Uuid) -> Result<Option<Uuid>, DatabaseError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT owner_id FROM service WHERE service_id = $1 AND delete_time = 0")
                .bind(service_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(owner,)| owner))
    }
}
