pub mod auth;
pub mod response;

pub use auth::{current_subject, subject_middleware};
pub use response::{ApiResponse, ApiResult};
