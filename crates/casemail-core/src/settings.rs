//! Email settings service
//!
//! Validates and encrypts SMTP credentials before they reach the
//! repository, and hands out only the non-secret view when reading.

use crate::cipher::Cipher;
use casemail_common::types::{EmailAddress, UserId};
use casemail_common::{Error, Result};
use casemail_storage::{EmailSettingsRepository, EmailSettingsSummary, UpsertEmailSettings};
use std::sync::Arc;
use tracing::info;

/// Credentials submitted for one user, password in plaintext
#[derive(Clone)]
pub struct SaveEmailSettings {
    pub user_id: UserId,
    pub smtp_server: String,
    pub port: u16,
    pub email: String,
    pub username: String,
    pub password: String,
    pub use_ssl: bool,
}

impl std::fmt::Debug for SaveEmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveEmailSettings")
            .field("user_id", &self.user_id)
            .field("smtp_server", &self.smtp_server)
            .field("port", &self.port)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

impl SaveEmailSettings {
    /// Check required fields and formats
    pub fn validate(&self) -> Result<()> {
        if self.smtp_server.trim().is_empty() {
            return Err(Error::Validation("SMTP server is required".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Validation("Port must be between 1 and 65535".to_string()));
        }
        if EmailAddress::parse(&self.email).is_none() {
            return Err(Error::Validation(format!(
                "Invalid sender email address: {}",
                self.email
            )));
        }
        if self.username.trim().is_empty() {
            return Err(Error::Validation("Username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

/// Stores and reads per-user SMTP credentials
#[derive(Clone)]
pub struct EmailSettingsService {
    repo: Arc<dyn EmailSettingsRepository>,
    cipher: Arc<Cipher>,
}

impl EmailSettingsService {
    pub fn new(repo: Arc<dyn EmailSettingsRepository>, cipher: Arc<Cipher>) -> Self {
        Self { repo, cipher }
    }

    /// Encrypt the password and upsert the record for `input.user_id`
    pub async fn save(&self, input: SaveEmailSettings) -> Result<()> {
        input.validate()?;

        let password_encrypted = self.cipher.encrypt(&input.password)?;
        let record = UpsertEmailSettings {
            user_id: input.user_id,
            smtp_server: input.smtp_server.trim().to_string(),
            port: i32::from(input.port),
            email: input.email.trim().to_string(),
            username: input.username,
            password_encrypted,
            use_ssl: input.use_ssl,
        };

        let saved = self.repo.upsert(record).await?;
        info!(
            user_id = %saved.user_id,
            smtp_server = %saved.smtp_server,
            port = saved.port,
            "Email settings saved"
        );

        Ok(())
    }

    /// Non-secret settings for a user
    pub async fn get(&self, user_id: UserId) -> Result<EmailSettingsSummary> {
        self.repo
            .get(user_id)
            .await?
            .map(EmailSettingsSummary::from)
            .ok_or_else(|| Error::NotFound(format!("No email settings for user {}", user_id)))
    }

    /// Check that the backing store is reachable
    pub async fn health_check(&self) -> Result<()> {
        self.repo.health_check().await
    }
}
