//! Master key resolution.
//!
//! Turns the operator-supplied `MASTER_KEY` secret into the 32-byte key that
//! seals every private key at rest.
//!
//! # Encodings
//!
//! The secret is tried, in order, as:
//! 1. base64 (charset `A-Za-z0-9+/=`, length a multiple of 4)
//! 2. hex (charset `0-9a-fA-F`, even length)
//! 3. raw UTF-8 bytes
//!
//! A secret that looks like more than one encoding takes the first match, so
//! a 64-character hex string decodes as base64. Whatever the format, some
//! deterministic key always comes out; only a missing secret is fatal.
//!
//! # Normalisation
//!
//! - 32 bytes or more: the first 32 bytes are the key
//! - fewer than 32 bytes: stretched with Argon2id under a fixed domain salt

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::{CustodyError, Result};

// =============================================================================
// Constants
// =============================================================================

/// Master key length (AES-256 / ChaCha20 key size)
pub const MASTER_KEY_LEN: usize = 32;

/// Argon2id memory cost in KiB (64 MB)
pub const ARGON2_MEMORY_KB: u32 = 65536;

/// Argon2id iteration count
pub const ARGON2_ITERATIONS: u32 = 3;

/// Argon2id parallelism (threads)
pub const ARGON2_PARALLELISM: u32 = 4;

/// Fixed salt for stretching short secrets. Per-deployment uniqueness comes
/// from the secret itself; the salt only separates this use of Argon2.
const STRETCH_SALT: &[u8] = b"sealkeeper/master-key/v1";

// =============================================================================
// Master Key
// =============================================================================

/// How the configured secret was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterKeyEncoding {
    Base64,
    Hex,
    Raw,
}

/// The resolved 256-bit master key.
///
/// Zeroized on drop. `Debug` never prints the key bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; MASTER_KEY_LEN],
    #[zeroize(skip)]
    encoding: MasterKeyEncoding,
    #[zeroize(skip)]
    stretched: bool,
}

impl MasterKey {
    /// Resolve a master key from the configured secret.
    ///
    /// # Errors
    ///
    /// `Config` if no secret is configured (absent, empty or whitespace only).
    /// Every other secret resolves to a key.
    pub fn resolve(secret: Option<&str>) -> Result<Self> {
        // Blank counts as unset, same as `Config::validate`
        let secret = secret
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CustodyError::Config("MASTER_KEY is not configured".into()))?;

        let (mut material, encoding) = decode_secret(secret);

        let key = if material.len() >= MASTER_KEY_LEN {
            let mut bytes = [0u8; MASTER_KEY_LEN];
            bytes.copy_from_slice(&material[..MASTER_KEY_LEN]);
            Self {
                bytes,
                encoding,
                stretched: false,
            }
        } else {
            warn!(
                encoding = ?encoding,
                material_len = material.len(),
                "MASTER_KEY is shorter than 32 bytes, stretching with Argon2id"
            );
            let bytes = stretch(&material)?;
            Self {
                bytes,
                encoding,
                stretched: true,
            }
        };
        material.zeroize();

        debug!(encoding = ?key.encoding, stretched = key.stretched, "Resolved master key");
        Ok(key)
    }

    /// Build a key directly from 32 raw bytes.
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self {
            bytes,
            encoding: MasterKeyEncoding::Raw,
            stretched: false,
        }
    }

    /// Get the key bytes.
    ///
    /// Never log or persist the returned slice.
    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.bytes
    }

    /// Which encoding the secret was decoded from.
    pub fn encoding(&self) -> MasterKeyEncoding {
        self.encoding
    }

    /// Whether the key was produced by Argon2id stretching.
    pub fn is_stretched(&self) -> bool {
        self.stretched
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterKey([REDACTED], {:?})", self.encoding)
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn looks_like_base64(s: &str) -> bool {
    s.len() % 4 == 0
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

fn looks_like_hex(s: &str) -> bool {
    s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Decode the secret with the base64 → hex → raw fallback chain.
fn decode_secret(secret: &str) -> (Vec<u8>, MasterKeyEncoding) {
    if looks_like_base64(secret) {
        match BASE64.decode(secret) {
            Ok(bytes) if !bytes.is_empty() => return (bytes, MasterKeyEncoding::Base64),
            _ => debug!("MASTER_KEY matched base64 charset but did not decode"),
        }
    }

    if looks_like_hex(secret) {
        if let Ok(bytes) = hex::decode(secret) {
            return (bytes, MasterKeyEncoding::Hex);
        }
    }

    (secret.as_bytes().to_vec(), MasterKeyEncoding::Raw)
}

/// Stretch short key material to 32 bytes with Argon2id.
fn stretch(material: &[u8]) -> Result<[u8; MASTER_KEY_LEN]> {
    let params = Params::new(
        ARGON2_MEMORY_KB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(MASTER_KEY_LEN),
    )
    .map_err(|e| CustodyError::Config(format!("Invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; MASTER_KEY_LEN];
    argon2
        .hash_password_into(material, STRETCH_SALT, &mut key)
        .map_err(|e| CustodyError::Config(format!("Master key derivation failed: {e}")))?;

    Ok(key)
}

// =============================================================================
// Tests
// =============================================================================
