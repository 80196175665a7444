//! Casemail Common - Shared types and utilities
//!
//! This crate provides configuration, the error type and common types
//! shared across all Casemail components.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
