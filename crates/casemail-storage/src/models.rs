//! Database models

use casemail_common::types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored SMTP credentials for one user
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailSettings {
    pub user_id: UserId,
    pub smtp_server: String,
    pub port: i32,
    /// Sender address used as `From`
    pub email: String,
    pub username: String,
    /// `iv_hex:ciphertext_hex` token, never sent to clients
    #[serde(skip_serializing)]
    pub password_encrypted: String,
    /// Implicit TLS on connect
    pub use_ssl: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Upsert input; the password is already encrypted
#[derive(Debug, Clone)]
pub struct UpsertEmailSettings {
    pub user_id: UserId,
    pub smtp_server: String,
    pub port: i32,
    pub email: String,
    pub username: String,
    pub password_encrypted: String,
    pub use_ssl: bool,
}

/// Non-secret projection of [`EmailSettings`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSettingsSummary {
    pub smtp_server: String,
    pub port: i32,
    pub email: String,
    pub username: String,
    pub use_ssl: bool,
}

impl From<EmailSettings> for EmailSettingsSummary {
    fn from(settings: EmailSettings) -> Self {
        Self {
            smtp_server: settings.smtp_server,
            port: settings.port,
            email: settings.email,
            username: settings.username,
            use_ssl: settings.use_ssl,
        }
    }
}
