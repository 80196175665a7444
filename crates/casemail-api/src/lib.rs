//! Casemail API - REST API server
//!
//! This crate provides the HTTP surface for saving and reading per-user SMTP
//! settings and for relaying email, including API key authentication and
//! health endpoints.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod routes;

pub use auth::AppState;
pub use error::ApiError;
pub use openapi::create_openapi_routes;
pub use routes::create_router;
