//! SMTP transport

use async_trait::async_trait;
use casemail_common::{Error, Result};
use casemail_storage::EmailSettings;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::debug;

/// Connection parameters for one SMTP session, password decrypted
#[derive(Clone)]
pub struct SmtpSession {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Implicit TLS on connect; otherwise STARTTLS when offered
    pub use_ssl: bool,
}

impl SmtpSession {
    /// Session parameters from stored settings and the decrypted password
    pub fn from_settings(settings: &EmailSettings, password: String) -> Result<Self> {
        let port = u16::try_from(settings.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| Error::Internal(format!("Stored SMTP port is invalid: {}", settings.port)))?;

        Ok(Self {
            host: settings.smtp_server.clone(),
            port,
            username: settings.username.clone(),
            password,
            use_ssl: settings.use_ssl,
        })
    }
}

impl std::fmt::Debug for SmtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSession")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

/// Delivers a built message over an SMTP session
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, session: &SmtpSession, message: Message) -> Result<()>;
}

/// lettre-backed mailer opening a fresh connection per message
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn transport(&self, session: &SmtpSession) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if session.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&session.host)
                .map_err(|e| Error::Smtp(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            let tls = TlsParameters::new(session.host.clone())
                .map_err(|e| Error::Smtp(format!("Invalid TLS parameters: {}", e)))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&session.host)
                .tls(Tls::Opportunistic(tls))
        };

        let credentials = Credentials::new(session.username.clone(), session.password.clone());

        Ok(builder
            .port(session.port)
            .credentials(credentials)
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, session: &SmtpSession, message: Message) -> Result<()> {
        let transport = self.transport(session)?;

        let response = transport
            .send(message)
            .await
            .map_err(|e| Error::Smtp(e.to_string()))?;

        debug!(
            host = %session.host,
            code = %response.code(),
            "SMTP server accepted message"
        );
        Ok(())
    }
}
