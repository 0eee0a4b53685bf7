pub mod sub_service;

pub use sub_service::{ListOptions, ListResult, SubService, SubServiceInput};
