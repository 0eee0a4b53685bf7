pub mod sub_service;

pub use sub_service::{create as sub_service_create, delete as sub_service_delete, get as sub_service_get};
pub use sub_service::{list as sub_service_list, update as sub_service_update};
