//! Outgoing message construction

use super::EmailRequest;
use casemail_common::{Error, Result};
use lettre::message::{header::ContentType, Mailbox};
use lettre::Message;

/// Build a plain-text message from the stored sender to the request's recipients
pub fn build_message(sender: &str, request: &EmailRequest) -> Result<Message> {
    let from: Mailbox = sender
        .parse()
        .map_err(|e| Error::Validation(format!("Invalid sender address {}: {}", sender, e)))?;

    let mut builder = Message::builder().from(from).subject(request.subject.as_str());

    for address in request.to.addresses() {
        let to: Mailbox = address.parse().map_err(|_| {
            Error::Validation(format!("Invalid recipient email address: {}", address))
        })?;
        builder = builder.to(to);
    }

    builder
        .header(ContentType::TEXT_PLAIN)
        .body(request.body.clone())
        .map_err(|e| Error::Validation(format!("Failed to build email: {}", e)))
}
