//! Key Material
//!
//! Produces key-shaped values for the generated configs: 32 bytes from a
//! CSPRNG, base64 encoded. They are not Curve25519 keys, and a "public" key
//! generated here has no relation to any "private" key.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::{CryptoRng, RngCore};
use std::fmt;

/// Length of raw key material in bytes
pub const KEY_LEN: usize = 32;

/// 32 random bytes standing in for a WireGuard key
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl KeyMaterial {
    /// Fill a new value from `rng`
    ///
    /// A failing random source is reported as [`KeyError::Entropy`] rather
    /// than retried.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self, KeyError> {
        let mut bytes = [0u8; KEY_LEN];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| KeyError::Entropy(e.to_string()))?;
        Ok(Self { bytes })
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Create from base64 string
    pub fn from_base64(s: &str) -> Result<Self, KeyError> {
        let bytes = BASE64.decode(s)
            .map_err(|_| KeyError::InvalidBase64)?;

        let bytes: [u8; KEY_LEN] = bytes.try_into()
            .map_err(|_| KeyError::InvalidLength)?;
        Ok(Self::from_bytes(bytes))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([redacted])")
    }
}

impl fmt::Display for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

/// Generate one base64 key with the thread-local CSPRNG
pub fn generate_key() -> Result<String, KeyError> {
    KeyMaterial::generate(&mut rand::thread_rng()).map(|key| key.to_base64())
}

/// Key errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Random source failed: {0}")]
    Entropy(String),

    #[error("Invalid base64 encoding")]
    InvalidBase64,

    #[error("Invalid key length (expected 32 bytes)")]
    InvalidLength,
}
