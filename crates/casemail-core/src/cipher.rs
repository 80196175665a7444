//! Password encryption at rest
//!
//! Passwords are stored as `iv_hex:ciphertext_hex`, where the ciphertext is
//! AES-256-CBC with PKCS#7 padding under the configured key and a fresh
//! random 16-byte IV per encryption.

use aes::Aes256;
use block_modes::block_padding::Pkcs7;
use block_modes::{BlockMode, Cbc};
use casemail_common::config::EncryptionConfig;
use casemail_common::Error;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error as ThisError;

type Aes256Cbc = Cbc<Aes256, Pkcs7>;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// CBC initialization vector length in bytes
pub const IV_LEN: usize = 16;

const SEPARATOR: char = ':';

/// Errors raised while encrypting or decoding a password token
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum CipherError {
    #[error("encryption key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("token is missing the ':' separator")]
    MissingSeparator,

    #[error("token contains invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("IV must be 16 bytes, got {0}")]
    InvalidIvLength(usize),

    #[error("decryption failed (wrong key or corrupted ciphertext)")]
    Decrypt,

    #[error("decrypted password is not valid UTF-8")]
    InvalidUtf8,
}

impl From<CipherError> for Error {
    fn from(err: CipherError) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Symmetric cipher for stored SMTP passwords
#[derive(Clone)]
pub struct Cipher {
    key: [u8; KEY_LEN],
}

impl Cipher {
    /// Create a cipher from raw key bytes
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let key: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
        Ok(Self { key })
    }

    /// Create a cipher from the `[encryption]` configuration section
    pub fn from_config(config: &EncryptionConfig) -> casemail_common::Result<Self> {
        let bytes = config.key_bytes()?;
        Self::new(&bytes).map_err(|e| Error::Config(e.to_string()))
    }

    /// Encrypt a plaintext into an `iv_hex:ciphertext_hex` token
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let cipher = Aes256Cbc::new_from_slices(&self.key, &iv)
            .map_err(|_| CipherError::InvalidKeyLength(self.key.len()))?;
        let ciphertext = cipher.encrypt_vec(plaintext.as_bytes());

        Ok(format!("{}{}{}", hex::encode(iv), SEPARATOR, hex::encode(ciphertext)))
    }

    /// Decrypt a token produced by [`Cipher::encrypt`]
    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        let (iv_hex, ciphertext_hex) = token
            .split_once(SEPARATOR)
            .ok_or(CipherError::MissingSeparator)?;

        let iv = hex::decode(iv_hex)?;
        if iv.len() != IV_LEN {
            return Err(CipherError::InvalidIvLength(iv.len()));
        }
        let ciphertext = hex::decode(ciphertext_hex)?;

        let cipher = Aes256Cbc::new_from_slices(&self.key, &iv)
            .map_err(|_| CipherError::InvalidIvLength(iv.len()))?;
        let plaintext = cipher
            .decrypt_vec(&ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("key", &"<redacted>").finish()
    }
}
