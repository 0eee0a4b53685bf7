// handlers/mod.rs
//
// Public (bearer JWT, subject optional) → /api/data-application-service/v1/*
// Internal (trusted callers, no subject) → /api/data-application-service/internal/v1/*

pub mod extract;
pub mod health;
pub mod internal;
pub mod public;

pub use health::health;
