//! Common types for Casemail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for users (issued by the external identity provider)
pub type UserId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Email address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub local: String,
    pub domain: String,
}

impl EmailAddress {
    /// Create a new email address
    pub fn new(local: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            domain: domain.into(),
        }
    }

    /// Parse an email address from a string
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (local, domain) = s.rsplit_once('@')?;
        if local.is_empty() || domain.is_empty() || s.contains(char::is_whitespace) {
            return None;
        }
        Some(Self::new(local, domain))
    }
}

/// Role granted to an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiRole {
    /// May manage settings and send for any user
    Admin,
    /// May only act for the user the key is bound to
    User,
}

impl std::fmt::Display for ApiRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiRole::Admin => write!(f, "admin"),
            ApiRole::User => write!(f, "user"),
        }
    }
}
