// handlers/public/sub_service.rs - /api/data-application-service/v1/sub-service[/:id]

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::{ListOptions, ListResult, SubService, SubServiceInput};
use crate::error::ApiError;
use crate::handlers::extract::{json_body, parse_int, parse_uuid};
use crate::middleware::{current_subject, ApiResponse, ApiResult};
use crate::policy::Subject;
use crate::services::FieldErrors;

/// Raw list query; parsed by hand so bad values come back as field errors.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub service_id: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub direction: String,
}

impl ListQuery {
    fn into_options(self) -> Result<ListOptions, FieldErrors> {
        let mut errs = FieldErrors::new();
        let defaults = ListOptions::default();

        let service_id = match self.service_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match uuid::Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errs.invalid("service_id", raw, "must be a UUID");
                    None
                }
            },
        };
        let offset = parse_int(&mut errs, "offset", self.offset.as_deref(), defaults.offset);
        let limit = parse_int(&mut errs, "limit", self.limit.as_deref(), defaults.limit);

        errs.into_result()?;
        Ok(ListOptions { service_id, offset, limit, sort: self.sort, direction: self.direction })
    }
}

/// POST /api/data-application-service/v1/sub-service
pub async fn create(
    State(state): State<AppState>,
    subject: Option<Extension<Subject>>,
    body: Result<Json<SubServiceInput>, JsonRejection>,
) -> ApiResult<SubService> {
    let subject = current_subject(subject);
    let input = json_body(body)?;

    let created = state.sub_services.create(subject.as_ref(), input, false).await?;
    state.audit("create", subject.as_ref(), created.id);
    Ok(ApiResponse::success(created))
}

/// GET /api/data-application-service/v1/sub-service
pub async fn list(
    State(state): State<AppState>,
    subject: Option<Extension<Subject>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<ListResult> {
    let subject = current_subject(subject);
    let Query(query) = query.map_err(|rejection| ApiError::invalid_field("query", rejection.body_text()))?;
    let opts = query.into_options()?;

    let result = state.sub_services.list(subject.as_ref(), &opts).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/data-application-service/v1/sub-service/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SubService> {
    let id = parse_uuid("id", &id)?;
    Ok(ApiResponse::success(state.sub_services.get(id).await?))
}

/// PUT /api/data-application-service/v1/sub-service/:id
pub async fn update(
    State(state): State<AppState>,
    subject: Option<Extension<Subject>>,
    Path(id): Path<String>,
    body: Result<Json<SubServiceInput>, JsonRejection>,
) -> ApiResult<SubService> {
    let subject = current_subject(subject);
    let id = parse_uuid("id", &id)?;
    let input = json_body(body)?;

    let updated = state.sub_services.update(subject.as_ref(), id, input).await?;
    state.audit("update", subject.as_ref(), updated.id);
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/data-application-service/v1/sub-service/:id
pub async fn delete(
    State(state): State<AppState>,
    subject: Option<Extension<Subject>>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let subject = current_subject(subject);
    let id = parse_uuid("id", &id)?;

    state.sub_services.delete(subject.as_ref(), id).await?;
    state.audit("delete", subject.as_ref(), id);
    Ok(ApiResponse::success(json!({ "id": id })))
}
