pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpPolicyGate, PolicyGate};
pub use error::PolicyError;
pub use types::*;
