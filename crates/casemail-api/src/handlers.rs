//! API request handlers

pub mod email_settings;
pub mod health;
pub mod send;

pub use health::*;
