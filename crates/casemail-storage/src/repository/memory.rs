//! In-memory email settings repository for tests

use crate::models::{EmailSettings, UpsertEmailSettings};
use crate::repository::EmailSettingsRepository;
use async_trait::async_trait;
use casemail_common::types::UserId;
use casemail_common::Result;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Email settings kept in a map keyed by user id
#[derive(Default)]
pub struct MemoryEmailSettingsRepository {
    records: RwLock<HashMap<UserId, EmailSettings>>,
}

impl MemoryEmailSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl EmailSettingsRepository for MemoryEmailSettingsRepository {
    async fn upsert(&self, input: UpsertEmailSettings) -> Result<EmailSettings> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let created_at = records
            .get(&input.user_id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let settings = EmailSettings {
            user_id: input.user_id,
            smtp_server: input.smtp_server,
            port: input.port,
            email: input.email,
            username: input.username,
            password_encrypted: input.password_encrypted,
            use_ssl: input.use_ssl,
            created_at,
            updated_at: now,
        };
        records.insert(settings.user_id, settings.clone());

        Ok(settings)
    }

    async fn get(&self, user_id: UserId) -> Result<Option<EmailSettings>> {
        Ok(self.records.read().await.get(&user_id).cloned())
    }
}
