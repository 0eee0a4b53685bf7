pub mod sub_service;

pub use sub_service::{batch as sub_service_batch, create as sub_service_create, list_ids as sub_service_list_ids};
