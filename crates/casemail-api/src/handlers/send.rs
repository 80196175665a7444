//! Send email handler

use axum::{extract::State, Extension, Json};
use casemail_common::types::UserId;
use casemail_core::{EmailRequest, Recipients};
use serde::Deserialize;
use std::sync::Arc;

use super::email_settings::MessageResponse;
use crate::auth::{require_user_access, AppState, AuthContext};
use crate::error::ApiError;
use crate::extract::ApiJson;

/// Request body for relaying one email
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    /// User whose stored SMTP settings are used
    pub user_id: UserId,
    /// A single address, a comma-separated list, or an array
    pub to: Recipients,
    #[serde(default)]
    pub subject: String,
    /// Plain text body
    #[serde(default)]
    pub body: String,
}

impl From<SendEmailRequest> for EmailRequest {
    fn from(req: SendEmailRequest) -> Self {
        Self {
            user_id: req.user_id,
            to: req.to,
            subject: req.subject,
            body: req.body,
        }
    }
}

/// Send an email through the user's own SMTP server
///
/// POST /api/send-email
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<SendEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_user_access(&auth, input.user_id)?;

    state.relay.send(input.into()).await?;

    Ok(Json(MessageResponse::new("Email sent")))
}
