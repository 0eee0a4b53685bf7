// handlers/internal/sub_service.rs - /api/data-application-service/internal/v1/*
//
// Callers here are trusted services; no subject is resolved and the
// ownership check is skipped.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::{SubService, SubServiceInput};
use crate::handlers::extract::{json_body, parse_uuid};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::validation::parse_service_ids;

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    #[serde(default)]
    pub service_id: String,
}

#[derive(Debug, Serialize)]
pub struct IdList {
    pub entries: Vec<Uuid>,
}

/// GET /internal/v1/services/:service_id/sub-service
pub async fn list_ids(State(state): State<AppState>, Path(service_id): Path<String>) -> ApiResult<IdList> {
    let service_id = parse_uuid("service_id", &service_id)?;
    let entries = state.sub_services.list_id(Some(service_id)).await?;
    Ok(ApiResponse::success(IdList { entries }))
}

/// GET /internal/v1/services/sub-service/batch?service_id=a,b,c
pub async fn batch(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
) -> ApiResult<HashMap<Uuid, Vec<Uuid>>> {
    let service_ids = parse_service_ids(&query.service_id)?;
    Ok(ApiResponse::success(state.sub_services.list_sub_services(&service_ids).await?))
}

/// POST /internal/v1/sub-service
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<SubServiceInput>, JsonRejection>,
) -> ApiResult<SubService> {
    let input = json_body(body)?;
    let created = state.sub_services.create(None, input, true).await?;
    state.audit("internal-create", None, created.id);
    Ok(ApiResponse::success(created))
}
