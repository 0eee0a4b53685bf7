use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("where conf invalid: unsupported operator '{operator}' at {path}")]
    UnsupportedOperator { path: String, operator: String },

    #[error("where conf invalid: operator '{operator}' not allowed for data type '{data_type}' at {path}")]
    DataTypeMismatch { path: String, operator: String, data_type: String },

    #[error("where conf invalid: {reason} at {path}")]
    InvalidValue { path: String, reason: String },

    #[error("where conf invalid: unknown relation '{relation}' at {path}")]
    InvalidRelation { path: String, relation: String },

    #[error("where conf invalid: empty column name at {path}")]
    EmptyColumn { path: String },

    #[error("detail is not a valid sub-service document: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl FilterError {
    /// Location of the offending group or member inside the detail document.
    pub fn path(&self) -> &str {
        match self {
            FilterError::UnsupportedOperator { path, .. }
            | FilterError::DataTypeMismatch { path, .. }
            | FilterError::InvalidValue { path, .. }
            | FilterError::InvalidRelation { path, .. }
            | FilterError::EmptyColumn { path } => path,
            FilterError::JsonError(_) => "detail",
        }
    }
}
