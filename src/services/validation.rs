use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{ListOptions, SubService};
use crate::filter::FilterError;

pub const MAX_NAME_LENGTH: usize = 255;

/// Supported values for `ListOptions::sort`.
pub const SORT_IS_AUTHORIZED: &str = "is_authorized";
const SUPPORTED_SORTS: &[&str] = &[SORT_IS_AUTHORIZED];
const SUPPORTED_DIRECTIONS: &[&str] = &["asc", "desc"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Validation failures, collected rather than returned on the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errs = Self::new();
        errs.push(field, message);
        errs
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError { field: field.into(), message: message.into() });
    }

    pub fn required(&mut self, field: &str) {
        self.push(field, "Required value");
    }

    pub fn invalid(&mut self, field: &str, value: impl std::fmt::Display, detail: &str) {
        self.push(field, format!("Invalid value: \"{}\": {}", value, detail));
    }

    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| format!("{}: {}", e.field, e.message)).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl From<FilterError> for FieldErrors {
    fn from(err: FilterError) -> Self {
        FieldErrors::single(err.path().to_string(), err.to_string())
    }
}

pub fn validate_sub_service(model: &SubService) -> FieldErrors {
    let mut errs = FieldErrors::new();

    let name_len = model.name.chars().count();
    if model.name.is_empty() {
        errs.required("name");
    } else if name_len > MAX_NAME_LENGTH {
        errs.push("name", format!("Too long: may not be longer than {} characters, got {}", MAX_NAME_LENGTH, name_len));
    }

    if model.service_id.is_nil() {
        errs.required("service_id");
    }

    if model.detail.trim().is_empty() {
        errs.required("detail");
    }

    errs
}

/// All create checks plus immutability of the parent.
pub fn validate_sub_service_update(model: &SubService, previous: &SubService) -> FieldErrors {
    let mut errs = validate_sub_service(model);
    if model.service_id != previous.service_id {
        errs.invalid("service_id", model.service_id, "field is immutable");
    }
    errs
}

pub fn validate_list_options(opts: &ListOptions, max_page_size: u32) -> FieldErrors {
    let mut errs = FieldErrors::new();

    if opts.offset < 1 {
        errs.invalid("offset", opts.offset, "must be greater than or equal to 1");
    }
    if opts.limit < 1 || opts.limit > i64::from(max_page_size) {
        errs.invalid("limit", opts.limit, &format!("must be between 1 and {}", max_page_size));
    }

    if opts.sort.is_empty() {
        if !opts.direction.is_empty() && !SUPPORTED_DIRECTIONS.contains(&opts.direction.as_str()) {
            errs.push("direction", format!("Unsupported value: \"{}\": supported values: \"asc\", \"desc\"", opts.direction));
        }
    } else {
        if !SUPPORTED_SORTS.contains(&opts.sort.as_str()) {
            errs.push("sort", format!("Unsupported value: \"{}\": supported values: \"{}\"", opts.sort, SORT_IS_AUTHORIZED));
        }
        if !SUPPORTED_DIRECTIONS.contains(&opts.direction.as_str()) {
            errs.push("direction", format!("Unsupported value: \"{}\": supported values: \"asc\", \"desc\"", opts.direction));
        }
        if opts.sort == SORT_IS_AUTHORIZED && opts.service_id.map_or(true, |id| id.is_nil()) {
            errs.required("service_id");
        }
    }

    errs
}

/// Parses a comma-separated list of service ids, e.g. from a query string.
pub fn parse_service_ids(raw: &str) -> Result<Vec<Uuid>, FieldErrors> {
    let mut errs = FieldErrors::new();
    let mut ids = Vec::new();
    for (i, part) in raw.split(',').map(str::trim).filter(|s| !s.is_empty()).enumerate() {
        match Uuid::parse_str(part) {
            Ok(id) => ids.push(id),
            Err(_) => errs.invalid(&format!("service_id[{}]", i), part, "must be a UUID"),
        }
    }
    if ids.is_empty() && errs.is_empty() {
        errs.required("service_id");
    }
    errs.into_result().map(|_| ids)
}
