use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::FieldErrors;

/// Unwraps a JSON body, reporting malformed input as `InvalidParameterJson`.
pub fn json_body<T: DeserializeOwned>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| ApiError::invalid_json(rejection.body_text()))
}

pub fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        let mut errs = FieldErrors::new();
        errs.invalid(field, raw, "must be a UUID");
        errs.into()
    })
}

/// Parses an optional integer query parameter, keeping `default` when absent.
pub fn parse_int(errs: &mut FieldErrors, field: &str, raw: Option<&str>, default: i64) -> i64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            errs.invalid(field, s, "must be an integer");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_uuid_names_the_field() {
        let err = parse_uuid("id", "nope").unwrap_err();
        assert_eq!(err.to_json()["detail"][0]["field"], "id");
    }

    #[test]
    fn integers_fall_back_to_default() {
        let mut errs = FieldErrors::new();
        assert_eq!(parse_int(&mut errs, "limit", None, 10), 10);
        assert_eq!(parse_int(&mut errs, "limit", Some("25"), 10), 25);
        assert!(errs.is_empty());
        parse_int(&mut errs, "limit", Some("x"), 10);
        assert_eq!(errs.errors()[0].field, "limit");
    }
}
