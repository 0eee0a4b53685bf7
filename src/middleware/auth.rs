use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::auth::decode_jwt;
use crate::error::ApiError;
use crate::policy::Subject;

/// Resolves the calling subject from a bearer JWT and stores it in the
/// request extensions. Requests without an Authorization header pass through
/// anonymously; a present but invalid token is rejected.
pub async fn subject_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_bearer(&headers) {
        Ok(Some(token)) => token,
        Ok(None) => return next.run(request).await,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    match decode_jwt(token, &state.jwt_secret) {
        Ok(claims) => {
            request.extensions_mut().insert(claims.subject());
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("Rejected bearer token: {}", e);
            ApiError::unauthorized(e.to_string()).into_response()
        }
    }
}

/// Subject resolved by `subject_middleware`, if any.
pub fn current_subject(request_subject: Option<axum::Extension<Subject>>) -> Option<Subject> {
    request_subject.map(|axum::Extension(subject)| subject)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, String> {
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth_str = value
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        Some(_) => Err("Empty JWT token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
