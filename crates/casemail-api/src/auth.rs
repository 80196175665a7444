//! Authentication module

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use casemail_common::config::{ApiConfig, ApiKeyConfig};
use casemail_common::types::{ApiRole, UserId};
use casemail_common::Error;
use casemail_core::{Cipher, EmailSettingsService, MailRelay, Mailer};
use casemail_storage::EmailSettingsRepository;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: EmailSettingsService,
    pub relay: MailRelay,
    pub require_auth: bool,
    pub api_keys: Arc<Vec<ApiKeyConfig>>,
}

impl AppState {
    /// Wire the services over one repository and cipher
    pub fn new(
        repo: Arc<dyn EmailSettingsRepository>,
        cipher: Arc<Cipher>,
        mailer: Arc<dyn Mailer>,
        config: &ApiConfig,
    ) -> Self {
        Self {
            settings: EmailSettingsService::new(repo.clone(), cipher.clone()),
            relay: MailRelay::new(repo, cipher, mailer),
            require_auth: config.require_auth,
            api_keys: Arc::new(config.keys.clone()),
        }
    }
}

/// Authenticated context extracted from API key
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Name of the matched key, for audit logging
    pub key_name: String,
    /// Role granted to the key
    pub role: ApiRole,
    /// The user the key acts for (user role)
    pub user_id: Option<UserId>,
}

impl AuthContext {
    /// Context used when authentication is disabled
    pub fn anonymous_admin() -> Self {
        Self {
            key_name: "anonymous".to_string(),
            role: ApiRole::Admin,
            user_id: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ApiRole::Admin
    }

    /// Admins act for anyone, user keys only for their own user
    pub fn can_act_for(&self, user_id: UserId) -> bool {
        self.is_admin() || self.user_id == Some(user_id)
    }
}

impl From<&ApiKeyConfig> for AuthContext {
    fn from(key: &ApiKeyConfig) -> Self {
        Self {
            key_name: key.name.clone(),
            role: key.role,
            user_id: key.user_id,
        }
    }
}

/// Extract API key from request
pub fn extract_api_key(req: &Request) -> Option<&str> {
    // Check Authorization header
    if let Some(auth) = req.headers().get("authorization") {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim());
            }
        }
    }

    // Check X-API-Key header
    if let Some(key) = req.headers().get("x-api-key") {
        if let Ok(key_str) = key.to_str() {
            return Some(key_str.trim());
        }
    }

    None
}

/// Hash an API key for comparison
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify an API key against a stored hash.
///
/// Supports Argon2 PHC strings (`$argon2...`) and plain SHA-256 hex digests.
fn verify_api_key(api_key: &str, stored_hash: &str) -> bool {
    if stored_hash.starts_with("$argon2") {
        return PasswordHash::new(stored_hash)
            .ok()
            .and_then(|parsed_hash| {
                Argon2::default()
                    .verify_password(api_key.as_bytes(), &parsed_hash)
                    .ok()
            })
            .is_some();
    }

    hash_api_key(api_key).eq_ignore_ascii_case(stored_hash)
}

/// Match a presented key against the configured keys
fn authenticate(keys: &[ApiKeyConfig], api_key: &str) -> Result<AuthContext, ApiError> {
    if api_key.is_empty() {
        return Err(Error::Auth("Empty API key".to_string()).into());
    }

    keys.iter()
        .find(|key| verify_api_key(api_key, &key.key_hash))
        .map(|key| {
            debug!(key = %key.name, role = %key.role, "API key authenticated");
            AuthContext::from(key)
        })
        .ok_or_else(|| {
            warn!("Unknown API key presented");
            Error::Auth("Invalid API key".to_string()).into()
        })
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = if state.require_auth {
        let api_key = extract_api_key(&request).ok_or_else(|| {
            warn!("Missing API key in request to {}", request.uri().path());
            Error::Auth("Missing API key".to_string())
        })?;
        authenticate(&state.api_keys, api_key)?
    } else {
        AuthContext::anonymous_admin()
    };

    // Store auth context in request extensions
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

/// Require an admin key
pub fn require_admin(auth_context: &AuthContext) -> Result<(), ApiError> {
    if !auth_context.is_admin() {
        warn!(
            key = %auth_context.key_name,
            "Admin access denied"
        );
        return Err(Error::PermissionDenied("Admin access required".to_string()).into());
    }
    Ok(())
}

/// Require an admin key or a key bound to `user_id`
pub fn require_user_access(auth_context: &AuthContext, user_id: UserId) -> Result<(), ApiError> {
    if !auth_context.can_act_for(user_id) {
        warn!(
            key = %auth_context.key_name,
            user_id = %user_id,
            "User access denied"
        );
        return Err(Error::PermissionDenied("Not allowed to act for this user".to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use uuid::Uuid;

    fn key(name: &str, secret: &str, role: ApiRole, user_id: Option<UserId>) -> ApiKeyConfig {
        ApiKeyConfig {
            name: name.to_string(),
            key_hash: hash_api_key(secret),
            role,
            user_id,
        }
    }

    #[test]
    fn verifies_sha256_hash() {
        let api_key = "ck_test_sha_key";
        let digest = hash_api_key(api_key);

        assert!(verify_api_key(api_key, &digest));
        assert!(verify_api_key(api_key, &digest.to_uppercase()));
        assert!(!verify_api_key("wrong_key", &digest));
    }

    #[test]
    fn verifies_argon2_hash() {
        let api_key = "ck_test_argon2_key";
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(api_key.as_bytes(), &salt)
            .expect("argon2 hash generation should succeed")
            .to_string();

        assert!(verify_api_key(api_key, &hash));
        assert!(!verify_api_key("wrong_key", &hash));
    }

    #[test]
    fn authenticate_picks_matching_key() {
        let alice = Uuid::new_v4();
        let keys = vec![
            key("admin-ui", "admin-secret", ApiRole::Admin, None),
            key("alice", "alice-secret", ApiRole::User, Some(alice)),
        ];

        let context = authenticate(&keys, "alice-secret").unwrap();
        assert_eq!(context.key_name, "alice");
        assert!(!context.is_admin());
        assert!(context.can_act_for(alice));
        assert!(!context.can_act_for(Uuid::new_v4()));

        assert!(authenticate(&keys, "nobody").is_err());
        assert!(authenticate(&keys, "").is_err());
    }

    #[test]
    fn admin_can_act_for_anyone() {
        let context = AuthContext::anonymous_admin();
        assert!(context.can_act_for(Uuid::new_v4()));
        assert!(require_admin(&context).is_ok());
    }

    #[test]
    fn user_key_is_not_admin() {
        let context = AuthContext {
            key_name: "alice".to_string(),
            role: ApiRole::User,
            user_id: Some(Uuid::new_v4()),
        };
        assert!(require_admin(&context).is_err());
        assert!(require_user_access(&context, Uuid::new_v4()).is_err());
    }
}
