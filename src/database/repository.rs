use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{ListOptions, SubService};

/// Persistence contract for sub-services.
///
/// Implementations must enforce `(service_id, name)` uniqueness themselves and
/// report a violation as `DatabaseError::AlreadyExists`; the `is_repeat`
/// pre-check and the write are not atomic.
#[async_trait]
pub trait SubServiceStore: Send + Sync {
    /// Succeeds iff no other sub-service shares the candidate's parent and name.
    async fn is_repeat(&self, candidate: &SubService) -> Result<(), DatabaseError>;

    async fn create(&self, model: &SubService) -> Result<SubService, DatabaseError>;

    async fn get(&self, id: Uuid) -> Result<SubService, DatabaseError>;

    async fn get_service_id(&self, id: Uuid) -> Result<Uuid, DatabaseError>;

    /// Writes `name`, `detail`, `row_filter_clause` and `auth_scope_id` only.
    async fn update(&self, model: &SubService) -> Result<SubService, DatabaseError>;

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// One page plus the total count matching `opts.service_id`.
    async fn list(&self, opts: &ListOptions) -> Result<(Vec<SubService>, i64), DatabaseError>;

    /// Every sub-service of a parent, unpaged, in list order.
    async fn list_all(&self, service_id: Uuid) -> Result<Vec<SubService>, DatabaseError>;

    /// Ids under a parent; all ids when `service_id` is `None`.
    async fn list_id(&self, service_id: Option<Uuid>) -> Result<Vec<Uuid>, DatabaseError>;

    /// Parent id to child ids, with an entry for every requested parent.
    async fn list_sub_services(&self, service_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

const COLUMNS: &str = "id, name, service_id, auth_scope_id, detail, row_filter_clause, created_at, updated_at";

pub struct PgSubServiceRepository {
    pool: PgPool,
}

impl PgSubServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn not_found(id: Uuid) -> DatabaseError {
        DatabaseError::NotFound(format!("sub-service {}", id))
    }
}

#[async_trait]
impl SubServiceStore for PgSubServiceRepository {
    async fn is_repeat(&self, candidate: &SubService) -> Result<(), DatabaseError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM sub_service WHERE service_id = $1 AND name = $2 AND id <> $3)",
        )
        .bind(candidate.service_id)
        .bind(&candidate.name)
        .bind(candidate.id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            return Err(DatabaseError::AlreadyExists(candidate.name.clone()));
        }
        Ok(())
    }

    async fn create(&self, model: &SubService) -> Result<SubService, DatabaseError> {
        let sql = format!(
            "INSERT INTO sub_service (id, name, service_id, auth_scope_id, detail, row_filter_clause, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, now(), now())
             RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, SubService>(&sql)
            .bind(model.id)
            .bind(&model.name)
            .bind(model.service_id)
            .bind(model.auth_scope_id)
            .bind(&model.detail)
            .bind(&model.row_filter_clause)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify(e, model.name.clone()))
    }

    async fn get(&self, id: Uuid) -> Result<SubService, DatabaseError> {
        let sql = format!("SELECT {} FROM sub_service WHERE id = $1", COLUMNS);
        sqlx::query_as::<_, SubService>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    async fn get_service_id(&self, id: Uuid) -> Result<Uuid, DatabaseError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT service_id FROM sub_service WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(service_id,)| service_id).ok_or_else(|| Self::not_found(id))
    }

    async fn update(&self, model: &SubService) -> Result<SubService, DatabaseError> {
        let sql = format!(
            "UPDATE sub_service
             SET name = $2, detail = $3, row_filter_clause = $4, auth_scope_id = $5, updated_at = now()
             WHERE id = $1
             RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, SubService>(&sql)
            .bind(model.id)
            .bind(&model.name)
            .bind(&model.detail)
            .bind(&model.row_filter_clause)
            .bind(model.auth_scope_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::classify(e, model.name.clone()))?
            .ok_or_else(|| Self::not_found(model.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM sub_service WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn list(&self, opts: &ListOptions) -> Result<(Vec<SubService>, i64), DatabaseError> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sub_service WHERE ($1::uuid IS NULL OR service_id = $1)")
                .bind(opts.service_id)
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT {} FROM sub_service
             WHERE ($1::uuid IS NULL OR service_id = $1)
             ORDER BY updated_at DESC, id ASC
             LIMIT $2 OFFSET $3",
            COLUMNS
        );
        let entries = sqlx::query_as::<_, SubService>(&sql)
            .bind(opts.service_id)
            .bind(opts.limit)
            .bind(opts.row_offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((entries, total))
    }

    async fn list_all(&self, service_id: Uuid) -> Result<Vec<SubService>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM sub_service WHERE service_id = $1 ORDER BY updated_at DESC, id ASC",
            COLUMNS
        );
        Ok(sqlx::query_as::<_, SubService>(&sql)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_id(&self, service_id: Option<Uuid>) -> Result<Vec<Uuid>, DatabaseError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM sub_service WHERE ($1::uuid IS NULL OR service_id = $1) ORDER BY updated_at DESC, id ASC",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list_sub_services(&self, service_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, DatabaseError> {
        let mut out: HashMap<Uuid, Vec<Uuid>> = service_ids.iter().map(|id| (*id, Vec::new())).collect();
        if service_ids.is_empty() {
            return Ok(out);
        }

        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT service_id, id FROM sub_service WHERE service_id = ANY($1) ORDER BY updated_at DESC, id ASC",
        )
        .bind(service_ids)
        .fetch_all(&self.pool)
        .await?;

        for (service_id, id) in rows {
            out.entry(service_id).or_default().push(id);
        }
        Ok(out)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
