//! Casemail Core - Credential encryption and mail relay
//!
//! This crate provides the password cipher, the email settings service that
//! encrypts credentials before they are stored, and the relay that sends a
//! message through a user's own SMTP server.

pub mod cipher;
pub mod relay;
pub mod settings;

pub use cipher::{Cipher, CipherError};
pub use relay::{EmailRequest, MailRelay, Mailer, Recipients, SmtpMailer, SmtpSession};
pub use settings::{EmailSettingsService, SaveEmailSettings};
