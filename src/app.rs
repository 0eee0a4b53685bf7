use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers;
use crate::middleware::subject_middleware;
use crate::policy::Subject;
use crate::services::SubServiceService;

pub const PUBLIC_PREFIX: &str = "/api/data-application-service/v1";
pub const INTERNAL_PREFIX: &str = "/api/data-application-service/internal/v1";

#[derive(Clone)]
pub struct AppState {
    pub sub_services: Arc<SubServiceService>,
    pub jwt_secret: Arc<str>,
    pub audit_logging: bool,
}

impl AppState {
    pub fn new(sub_services: Arc<SubServiceService>, jwt_secret: &str) -> Self {
        Self { sub_services, jwt_secret: Arc::from(jwt_secret), audit_logging: false }
    }

    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.audit_logging = enabled;
        self
    }

    /// Records a successful mutation when audit logging is on.
    pub fn audit(&self, action: &str, subject: Option<&Subject>, id: Uuid) {
        if self.audit_logging {
            tracing::info!(action, %id, subject = ?subject.map(|s| s.id), "sub-service audit");
        }
    }
}

/// Full router without process-level layers (CORS, body limit, tracing), which `main` adds.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest(PUBLIC_PREFIX, public_routes(state.clone()))
        .nest(INTERNAL_PREFIX, internal_routes())
        .with_state(state)
}

fn public_routes(state: AppState) -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route(
            "/sub-service",
            post(public::sub_service_create).get(public::sub_service_list),
        )
        .route(
            "/sub-service/:id",
            get(public::sub_service_get)
                .put(public::sub_service_update)
                .delete(public::sub_service_delete),
        )
        .route_layer(from_fn_with_state(state, subject_middleware))
}

fn internal_routes() -> Router<AppState> {
    use handlers::internal;

    Router::new()
        .route("/services/:service_id/sub-service", get(internal::sub_service_list_ids))
        .route("/services/sub-service/batch", get(internal::sub_service_batch))
        .route("/sub-service", post(internal::sub_service_create))
}
