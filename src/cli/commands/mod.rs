pub mod detail;
pub mod token;
