//! Email settings repository

use crate::db::DatabasePool;
use crate::models::{EmailSettings, UpsertEmailSettings};
use async_trait::async_trait;
use casemail_common::types::UserId;
use casemail_common::{Error, Result};
use tracing::debug;

/// Email settings repository trait
#[async_trait]
pub trait EmailSettingsRepository: Send + Sync {
    /// Insert or replace the settings for `input.user_id`
    async fn upsert(&self, input: UpsertEmailSettings) -> Result<EmailSettings>;

    /// Get the settings for a user
    async fn get(&self, user_id: UserId) -> Result<Option<EmailSettings>>;

    /// Check that the backing store is reachable
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Database email settings repository
pub struct DbEmailSettingsRepository {
    pool: DatabasePool,
}

impl DbEmailSettingsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailSettingsRepository for DbEmailSettingsRepository {
    async fn upsert(&self, input: UpsertEmailSettings) -> Result<EmailSettings> {
        debug!(user_id = %input.user_id, "Upserting email settings");

        sqlx::query_as::<_, EmailSettings>(
            r#"
            INSERT INTO user_email_settings (
                user_id, smtp_server, port, email, username, password_encrypted, use_ssl
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                smtp_server = EXCLUDED.smtp_server,
                port = EXCLUDED.port,
                email = EXCLUDED.email,
                username = EXCLUDED.username,
                password_encrypted = EXCLUDED.password_encrypted,
                use_ssl = EXCLUDED.use_ssl,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(input.user_id)
        .bind(&input.smtp_server)
        .bind(input.port)
        .bind(&input.email)
        .bind(&input.username)
        .bind(&input.password_encrypted)
        .bind(input.use_ssl)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get(&self, user_id: UserId) -> Result<Option<EmailSettings>> {
        sqlx::query_as::<_, EmailSettings>("SELECT * FROM user_email_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn health_check(&self) -> Result<()> {
        self.pool.health_check().await
    }
}
