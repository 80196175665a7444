//! Email settings handlers

use axum::{extract::State, Extension, Json};
use casemail_common::types::UserId;
use casemail_core::SaveEmailSettings;
use casemail_storage::EmailSettingsSummary;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{require_admin, require_user_access, AppState, AuthContext};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};

/// Request body for saving a user's SMTP settings
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEmailSettingsRequest {
    pub user_id: UserId,
    pub smtp_server: String,
    pub port: u16,
    /// Sender address used as From
    pub email: String,
    pub username: String,
    /// Plaintext SMTP password, encrypted before storage
    pub password: String,
    #[serde(rename = "useSSL", default = "default_use_ssl")]
    pub use_ssl: bool,
}

fn default_use_ssl() -> bool {
    true
}

impl From<SaveEmailSettingsRequest> for SaveEmailSettings {
    fn from(req: SaveEmailSettingsRequest) -> Self {
        Self {
            user_id: req.user_id,
            smtp_server: req.smtp_server,
            port: req.port,
            email: req.email,
            username: req.username,
            password: req.password,
            use_ssl: req.use_ssl,
        }
    }
}

/// Stored settings without the password
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettingsResponse {
    pub smtp_server: String,
    pub port: i32,
    pub email: String,
    pub username: String,
    #[serde(rename = "useSSL")]
    pub use_ssl: bool,
}

impl From<EmailSettingsSummary> for EmailSettingsResponse {
    fn from(summary: EmailSettingsSummary) -> Self {
        Self {
            smtp_server: summary.smtp_server,
            port: summary.port,
            email: summary.email,
            username: summary.username,
            use_ssl: summary.use_ssl,
        }
    }
}

/// Acknowledgement body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Save (insert or replace) SMTP settings for a user
///
/// POST /api/email-settings
pub async fn save_email_settings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<SaveEmailSettingsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_admin(&auth)?;

    state.settings.save(input.into()).await?;

    Ok(Json(MessageResponse::new("Settings saved")))
}

/// Get SMTP settings for a user, password omitted
///
/// GET /api/email-settings/:user_id
pub async fn get_email_settings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<EmailSettingsResponse>, ApiError> {
    require_user_access(&auth, user_id)?;

    let summary = state.settings.get(user_id).await?;

    Ok(Json(summary.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_uses_client_field_names() {
        let body = r#"{
            "userId": "6f1c2e9a-3b7d-4c55-9a0e-2d8b1f4e7c31",
            "smtpServer": "smtp.example.com",
            "port": 587,
            "email": "consultant@example.com",
            "username": "consultant",
            "password": "app-password",
            "useSSL": false
        }"#;

        let req: SaveEmailSettingsRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.smtp_server, "smtp.example.com");
        assert_eq!(req.port, 587);
        assert!(!req.use_ssl);
    }

    #[test]
    fn test_response_has_no_password() {
        let response = EmailSettingsResponse {
            smtp_server: "smtp.example.com".to_string(),
            port: 465,
            email: "consultant@example.com".to_string(),
            username: "consultant".to_string(),
            use_ssl: true,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["smtpServer"], "smtp.example.com");
        assert_eq!(json["useSSL"], true);
        assert!(json.get("password").is_none());
    }
}
