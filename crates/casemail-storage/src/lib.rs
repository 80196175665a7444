//! Casemail Storage - Credential persistence
//!
//! This crate provides the PostgreSQL pool, the schema migrations and the
//! repository for per-user SMTP credential records.

pub mod db;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use models::*;
pub use repository::*;
