//! Configuration for Casemail

use crate::types::{ApiRole, UserId};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Length in bytes of the AES-256 key
pub const ENCRYPTION_KEY_LEN: usize = 32;

/// Environment prefix for configuration overrides (`CASEMAIL__API__PORT`)
const ENV_PREFIX: &str = "CASEMAIL";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Password encryption configuration
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Outbound relay configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

/// Password encryption configuration
#[derive(Clone, Default, Deserialize)]
pub struct EncryptionConfig {
    /// AES-256 key: 64 hex characters, or a raw 32-byte string
    pub key: Option<String>,
}

impl EncryptionConfig {
    /// Decode the configured key into raw key bytes
    pub fn key_bytes(&self) -> Result<Vec<u8>> {
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| Error::Config("Encryption key is not configured".to_string()))?;

        let bytes = if key.len() == ENCRYPTION_KEY_LEN * 2 && key.bytes().all(|b| b.is_ascii_hexdigit()) {
            hex::decode(key).map_err(|e| Error::Config(format!("Invalid hex encryption key: {}", e)))?
        } else {
            key.as_bytes().to_vec()
        };

        if bytes.len() != ENCRYPTION_KEY_LEN {
            return Err(Error::Config(format!(
                "Encryption key must be {} bytes (or {} hex characters), got {} bytes",
                ENCRYPTION_KEY_LEN,
                ENCRYPTION_KEY_LEN * 2,
                bytes.len()
            )));
        }

        Ok(bytes)
    }
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outbound SMTP relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Connect/command timeout for SMTP sessions in seconds
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_relay_timeout(),
        }
    }
}

fn default_relay_timeout() -> u64 {
    30
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Serve OpenAPI document and docs page
    #[serde(default = "default_enable_docs")]
    pub enable_docs: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Require an API key on every /api request
    #[serde(default = "default_require_auth")]
    pub require_auth: bool,

    /// Accepted API keys
    #[serde(default)]
    pub keys: Vec<ApiKeyConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            enable_docs: default_enable_docs(),
            cors_origins: Vec::new(),
            require_auth: default_require_auth(),
            keys: Vec::new(),
        }
    }
}

fn default_api_port() -> u16 {
    5001
}

fn default_enable_docs() -> bool {
    true
}

fn default_require_auth() -> bool {
    true
}

/// A single accepted API key
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyConfig {
    /// Label used in logs
    pub name: String,

    /// Argon2 PHC string, or SHA-256 hex digest of the key
    pub key_hash: String,

    /// Granted role
    pub role: ApiRole,

    /// User the key acts for (user role only)
    pub user_id: Option<UserId>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Config {
    /// Load configuration from the default file locations and the process environment
    pub fn load() -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let path = Self::locate_file(&env);
        Self::load_from(path.as_deref(), env)
    }

    /// Load configuration from an optional file layered with the given environment
    pub fn load_from(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        let raw = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(Some(env.clone())),
            )
            .build()
            .map_err(|e| Error::Config(format!("Failed to load config: {}", e)))?;

        let mut config: Config = raw
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        config.apply_legacy_env(&env);

        Ok(config)
    }

    /// Find the configuration file: `$CASEMAIL_CONFIG`, then the default locations
    fn locate_file(env: &HashMap<String, String>) -> Option<PathBuf> {
        if let Some(path) = env.get("CASEMAIL_CONFIG") {
            return Some(PathBuf::from(path));
        }

        let paths = [
            PathBuf::from("./casemail.toml"),
            PathBuf::from("/etc/casemail/config.toml"),
        ];

        paths.into_iter().find(|path| path.exists())
    }

    /// Fill unset values from the legacy `DATABASE_URL` and `ENCRYPTION_KEY` variables
    fn apply_legacy_env(&mut self, env: &HashMap<String, String>) {
        if self.database.url.is_none() {
            self.database.url = env.get("DATABASE_URL").cloned();
        }
        if self.encryption.key.is_none() {
            self.encryption.key = env.get("ENCRYPTION_KEY").cloned();
        }
    }

    /// Check that everything required at startup is present and well formed
    pub fn validate(&self) -> Result<()> {
        if self.database.url.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config("Database URL is not configured".to_string()));
        }

        self.encryption.key_bytes()?;

        for key in &self.api.keys {
            if key.role == ApiRole::User && key.user_id.is_none() {
                return Err(Error::Config(format!(
                    "API key '{}' has role user but no user_id",
                    key.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEX_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.api.port, 5001);
        assert!(config.api.require_auth);
        assert_eq!(config.relay.timeout_secs, 30);
        assert!(config.database.url.is_none());
        assert!(config.encryption.key.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[database]
url = "postgres://localhost/casemail"

[encryption]
key = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"

[api]
port = 8080

[[api.keys]]
name = "admin-ui"
key_hash = "abc"
role = "admin"

[[api.keys]]
name = "alice"
key_hash = "def"
role = "user"
user_id = "7d2b6a52-4f0e-4c2b-9f3e-0a1b2c3d4e5f"
"#;

        let path = std::env::temp_dir().join(format!("casemail-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, toml).unwrap();
        let config = Config::load_from(Some(&path), HashMap::new()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/casemail"));
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.keys.len(), 2);
        assert_eq!(config.api.keys[1].role, ApiRole::User);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::load_from(
            None,
            env(&[
                ("CASEMAIL__DATABASE__URL", "postgres://db/casemail"),
                ("CASEMAIL__API__PORT", "9000"),
                ("CASEMAIL__RELAY__TIMEOUT_SECS", "5"),
                ("CASEMAIL__API__REQUIRE_AUTH", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.url.as_deref(), Some("postgres://db/casemail"));
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.relay.timeout_secs, 5);
        assert!(!config.api.require_auth);
    }

    #[test]
    fn test_env_digit_only_keys_are_kept_verbatim() {
        let raw = "12345678901234567890123456789012";
        let config = Config::load_from(None, env(&[("CASEMAIL__ENCRYPTION__KEY", raw)])).unwrap();
        assert_eq!(config.encryption.key.as_deref(), Some(raw));
        assert_eq!(config.encryption.key_bytes().unwrap(), raw.as_bytes().to_vec());

        let hex_digits = "0102030405060708091011121314151617181920212223242526272829303132";
        let config =
            Config::load_from(None, env(&[("CASEMAIL__ENCRYPTION__KEY", hex_digits)])).unwrap();
        assert_eq!(config.encryption.key.as_deref(), Some(hex_digits));
        let bytes = config.encryption.key_bytes().unwrap();
        assert_eq!(bytes.len(), ENCRYPTION_KEY_LEN);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[31], 0x32);
    }

    #[test]
    fn test_legacy_env_fallback() {
        let config = Config::load_from(
            None,
            env(&[
                ("DATABASE_URL", "postgres://legacy/db"),
                ("ENCRYPTION_KEY", "abcdefghijklmnopqrstuvwxyz012345"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.url.as_deref(), Some("postgres://legacy/db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_env_does_not_override() {
        let config = Config::load_from(
            None,
            env(&[
                ("CASEMAIL__DATABASE__URL", "postgres://primary/db"),
                ("DATABASE_URL", "postgres://legacy/db"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.url.as_deref(), Some("postgres://primary/db"));
    }

    #[test]
    fn test_validate_requires_database_and_key() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.database.url = Some("postgres://localhost/casemail".to_string());
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.encryption.key = Some(HEX_KEY.to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_user_key_requires_user_id() {
        let mut config = Config::default();
        config.database.url = Some("postgres://localhost/casemail".to_string());
        config.encryption.key = Some(HEX_KEY.to_string());
        config.api.keys.push(ApiKeyConfig {
            name: "orphan".to_string(),
            key_hash: "x".to_string(),
            role: ApiRole::User,
            user_id: None,
        });

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_key_bytes_formats() {
        let hex_key = EncryptionConfig {
            key: Some(HEX_KEY.to_string()),
        };
        let bytes = hex_key.key_bytes().unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[31], 0x1f);

        let raw_key = EncryptionConfig {
            key: Some("changemechangemechangemechangeme".to_string()),
        };
        assert_eq!(raw_key.key_bytes().unwrap(), b"changemechangemechangemechangeme".to_vec());

        let short_key = EncryptionConfig {
            key: Some("changemechangeme12".to_string()),
        };
        assert!(matches!(short_key.key_bytes(), Err(Error::Config(_))));
    }

    #[test]
    fn test_encryption_key_is_redacted() {
        let config = EncryptionConfig {
            key: Some(HEX_KEY.to_string()),
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(HEX_KEY));
        assert!(rendered.contains("<redacted>"));
    }
}
