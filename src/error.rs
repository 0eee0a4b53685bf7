// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::policy::PolicyError;
use crate::services::{FieldErrors, SubServiceError};

const CODE_PREFIX: &str = "DataApplicationService";

/// HTTP API error with status code, dotted error code and client-facing description
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    InvalidParameter { description: String, detail: FieldErrors },
    InvalidParameterJson(String),

    // 401 Unauthorized
    Unauthorized(String),
    NotServiceOwner(String),

    // 403 Forbidden
    PermissionNotAuthorized(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    AlreadyExists(String),

    // 500 Internal Server Error
    DatabaseError(String),
    InternalError(String),

    // 502 Bad Gateway (policy engine)
    AuthServiceError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameter { .. } | ApiError::InvalidParameterJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::NotServiceOwner(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionNotAuthorized(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::AuthServiceError(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Kind part of the dotted code.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidParameter { .. } => "InvalidParameter",
            ApiError::InvalidParameterJson(_) => "InvalidParameterJson",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::NotServiceOwner(_) => "NotServiceOwner",
            ApiError::PermissionNotAuthorized(_) => "PermissionNotAuthorized",
            ApiError::NotFound(_) => "NotFound",
            ApiError::AlreadyExists(_) => "AlreadyExists",
            ApiError::DatabaseError(_) => "DatabaseError",
            ApiError::InternalError(_) => "InternalError",
            ApiError::AuthServiceError(_) => "AuthServiceError",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
        }
    }

    pub fn error_code(&self) -> String {
        format!("{}.{}", CODE_PREFIX, self.kind())
    }

    pub fn description(&self) -> &'static str {
        match self {
            ApiError::InvalidParameter { .. } => "Invalid parameter",
            ApiError::InvalidParameterJson(_) => "Malformed request body",
            ApiError::Unauthorized(_) => "Authentication failed",
            ApiError::NotServiceOwner(_) => "Caller does not own the service",
            ApiError::PermissionNotAuthorized(_) => "Permission not authorized",
            ApiError::NotFound(_) => "Resource not found",
            ApiError::AlreadyExists(_) => "Sub-service name already exists under this service",
            ApiError::DatabaseError(_) => "Database error",
            ApiError::InternalError(_) => "Internal error",
            ApiError::AuthServiceError(_) => "Policy engine unavailable",
            ApiError::ServiceUnavailable(_) => "Service unavailable",
        }
    }

    pub fn to_json(&self) -> Value {
        let detail = match self {
            ApiError::InvalidParameter { detail, .. } => json!(detail),
            ApiError::InvalidParameterJson(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotServiceOwner(msg)
            | ApiError::PermissionNotAuthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::AlreadyExists(msg)
            | ApiError::DatabaseError(msg)
            | ApiError::InternalError(msg)
            | ApiError::AuthServiceError(msg)
            | ApiError::ServiceUnavailable(msg) => json!(msg),
        };
        let description = match self {
            ApiError::InvalidParameter { description, .. } => description.as_str(),
            _ => self.description(),
        };

        json!({
            "code": self.error_code(),
            "description": description,
            "detail": detail,
        })
    }
}

// Constructors
impl ApiError {
    pub fn invalid_parameter(detail: FieldErrors) -> Self {
        ApiError::InvalidParameter { description: "Invalid parameter".to_string(), detail }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::invalid_parameter(FieldErrors::single(field, message))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidParameterJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::InternalError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errs: FieldErrors) -> Self {
        ApiError::invalid_parameter(errs)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) | DatabaseError::ParentNotFound(msg) => ApiError::not_found(msg),
            DatabaseError::AlreadyExists(name) => ApiError::AlreadyExists(name),
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::DatabaseError(other.to_string())
            }
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        tracing::error!("Policy engine error: {}", err);
        ApiError::AuthServiceError(err.to_string())
    }
}

impl From<SubServiceError> for ApiError {
    fn from(err: SubServiceError) -> Self {
        match err {
            SubServiceError::InvalidParameter(errs) => ApiError::invalid_parameter(errs),
            SubServiceError::AlreadyExists(name) => ApiError::AlreadyExists(name),
            SubServiceError::NotFound(msg) => ApiError::not_found(msg),
            SubServiceError::NotServiceOwner(service_id) => {
                ApiError::NotServiceOwner(format!("not the owner of service {}", service_id))
            }
            SubServiceError::PermissionNotAuthorized(msg) => ApiError::PermissionNotAuthorized(msg),
            SubServiceError::Database(e) => e.into(),
            SubServiceError::Policy(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.to_json()["detail"])
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
