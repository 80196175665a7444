//! Repository layer for data access

pub mod email_settings;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use email_settings::{DbEmailSettingsRepository, EmailSettingsRepository};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryEmailSettingsRepository;
