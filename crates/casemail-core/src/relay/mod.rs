//! Mail relay
//!
//! Sends one message on behalf of a user through the SMTP server stored in
//! that user's email settings. There is no queue and no retry: the caller
//! gets either success or the transport error.

pub mod mailer;
pub mod message;

pub use mailer::{Mailer, SmtpMailer, SmtpSession};
pub use message::build_message;

use crate::cipher::Cipher;
use casemail_common::types::UserId;
use casemail_common::{Error, Result};
use casemail_storage::EmailSettingsRepository;
use lettre::message::Mailbox;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Recipient list: a single (possibly comma-separated) string or an array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    /// Individual addresses, trimmed, empty entries dropped
    pub fn addresses(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            Recipients::One(list) => split_address_list(list),
            Recipients::Many(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .collect()
    }
}

/// Split on commas that sit outside quoted display names
fn split_address_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in list.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// A message to relay for one user
#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub user_id: UserId,
    pub to: Recipients,
    pub subject: String,
    pub body: String,
}

impl EmailRequest {
    /// At least one recipient, every recipient a valid mailbox
    pub fn validate(&self) -> Result<()> {
        let addresses = self.to.addresses();
        if addresses.is_empty() {
            return Err(Error::Validation("At least one recipient is required".to_string()));
        }
        for address in addresses {
            address.parse::<Mailbox>().map_err(|_| {
                Error::Validation(format!("Invalid recipient email address: {}", address))
            })?;
        }
        Ok(())
    }
}

/// Sends mail with each user's stored SMTP credentials
#[derive(Clone)]
pub struct MailRelay {
    repo: Arc<dyn EmailSettingsRepository>,
    cipher: Arc<Cipher>,
    mailer: Arc<dyn Mailer>,
}

impl MailRelay {
    pub fn new(
        repo: Arc<dyn EmailSettingsRepository>,
        cipher: Arc<Cipher>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            repo,
            cipher,
            mailer,
        }
    }

    /// Load the user's settings, decrypt the password and send one message
    pub async fn send(&self, request: EmailRequest) -> Result<()> {
        request.validate()?;

        let settings = self.repo.get(request.user_id).await?.ok_or_else(|| {
            Error::NotFound(format!("No SMTP settings for user {}", request.user_id))
        })?;

        let password = self.cipher.decrypt(&settings.password_encrypted).map_err(|e| {
            warn!(user_id = %request.user_id, error = %e, "Stored SMTP password could not be decrypted");
            Error::from(e)
        })?;

        let message = build_message(&settings.email, &request)?;
        let session = SmtpSession::from_settings(&settings, password)?;

        info!(
            user_id = %request.user_id,
            host = %session.host,
            port = session.port,
            recipients = request.to.addresses().len(),
            "Relaying email"
        );

        self.mailer.send(&session, message).await.map_err(|e| {
            warn!(user_id = %request.user_id, host = %session.host, error = %e, "Email relay failed");
            e
        })?;

        info!(user_id = %request.user_id, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use casemail_storage::{MemoryEmailSettingsRepository, UpsertEmailSettings};
    use lettre::Message;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(SmtpSession, String)>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, session: &SmtpSession, message: Message) -> Result<()> {
            if let Some(reason) = &self.fail_with {
                return Err(Error::Smtp(reason.clone()));
            }
            let raw = String::from_utf8(message.formatted()).unwrap();
            self.sent.lock().unwrap().push((session.clone(), raw));
            Ok(())
        }
    }

    struct Fixture {
        relay: MailRelay,
        repo: Arc<MemoryEmailSettingsRepository>,
        cipher: Arc<Cipher>,
        mailer: Arc<RecordingMailer>,
    }

    fn fixture(mailer: RecordingMailer) -> Fixture {
        let repo = Arc::new(MemoryEmailSettingsRepository::new());
        let cipher = Arc::new(Cipher::new(&[9u8; 32]).unwrap());
        let mailer = Arc::new(mailer);
        Fixture {
            relay: MailRelay::new(repo.clone(), cipher.clone(), mailer.clone()),
            repo,
            cipher,
            mailer,
        }
    }

    async fn store_settings(fixture: &Fixture, user_id: UserId, password_encrypted: String) {
        fixture
            .repo
            .upsert(UpsertEmailSettings {
                user_id,
                smtp_server: "smtp.example.com".to_string(),
                port: 465,
                email: "consultant@example.com".to_string(),
                username: "consultant".to_string(),
                password_encrypted,
                use_ssl: true,
            })
            .await
            .unwrap();
    }

    fn request(user_id: UserId) -> EmailRequest {
        EmailRequest {
            user_id,
            to: Recipients::Many(vec![
                "worker@example.com".to_string(),
                "employer@example.org".to_string(),
            ]),
            subject: "Case update".to_string(),
            body: "The claim has been lodged.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_uses_stored_credentials() {
        let fixture = fixture(RecordingMailer::default());
        let user_id = Uuid::new_v4();
        let token = fixture.cipher.encrypt("app-password").unwrap();
        store_settings(&fixture, user_id, token).await;

        fixture.relay.send(request(user_id)).await.unwrap();

        let sent = fixture.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (session, raw) = &sent[0];
        assert_eq!(session.host, "smtp.example.com");
        assert_eq!(session.port, 465);
        assert_eq!(session.username, "consultant");
        assert_eq!(session.password, "app-password");
        assert!(session.use_ssl);
        assert!(raw.contains("From: consultant@example.com"));
        assert!(raw.contains("worker@example.com"));
        assert!(raw.contains("employer@example.org"));
        assert!(raw.contains("Subject: Case update"));
    }

    #[tokio::test]
    async fn test_missing_settings_never_reaches_mailer() {
        let fixture = fixture(RecordingMailer::default());

        let err = fixture.relay.send(request(Uuid::new_v4())).await.unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(fixture.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_token_is_decode_error() {
        let fixture = fixture(RecordingMailer::default());
        let user_id = Uuid::new_v4();
        store_settings(&fixture, user_id, "no-separator-here".to_string()).await;

        let err = fixture.relay.send(request(user_id)).await.unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
        assert!(fixture.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let fixture = fixture(RecordingMailer {
            fail_with: Some("535 authentication failed".to_string()),
            ..Default::default()
        });
        let user_id = Uuid::new_v4();
        let token = fixture.cipher.encrypt("wrong-password").unwrap();
        store_settings(&fixture, user_id, token).await;

        let err = fixture.relay.send(request(user_id)).await.unwrap_err();

        match err {
            Error::Smtp(message) => assert!(message.contains("535")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_recipients_rejected_before_lookup() {
        let fixture = fixture(RecordingMailer::default());
        let mut bad = request(Uuid::new_v4());
        bad.to = Recipients::Many(vec![]);
        assert!(matches!(
            fixture.relay.send(bad).await,
            Err(Error::Validation(_))
        ));

        let mut bad = request(Uuid::new_v4());
        bad.to = Recipients::One("not an address".to_string());
        assert!(matches!(
            fixture.relay.send(bad).await,
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_recipients_forms() {
        let one: Recipients = serde_json::from_str("\"a@example.com, b@example.com\"").unwrap();
        assert_eq!(one.addresses(), vec!["a@example.com", "b@example.com"]);

        let many: Recipients = serde_json::from_str("[\"a@example.com\", \" \"]").unwrap();
        assert_eq!(many.addresses(), vec!["a@example.com"]);
    }

    #[test]
    fn test_quoted_display_name_keeps_its_comma() {
        let to = Recipients::One(
            "\"Doe, Jane\" <jane@example.com>, \"O\\\"Neil, Pat\" <pat@example.com>,bob@example.com"
                .to_string(),
        );
        assert_eq!(
            to.addresses(),
            vec![
                "\"Doe, Jane\" <jane@example.com>",
                "\"O\\\"Neil, Pat\" <pat@example.com>",
                "bob@example.com",
            ]
        );

        let request = EmailRequest {
            user_id: Uuid::new_v4(),
            to: Recipients::One("\"Doe, Jane\" <jane@example.com>".to_string()),
            subject: "Case update".to_string(),
            body: "Hello".to_string(),
        };
        assert!(request.validate().is_ok());

        let message = build_message("consultant@example.com", &request).unwrap();
        let to: Vec<String> = message.envelope().to().iter().map(ToString::to_string).collect();
        assert_eq!(to, vec!["jane@example.com"]);
    }
}
