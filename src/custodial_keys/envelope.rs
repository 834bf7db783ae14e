//! Envelope encryption of private keys at rest.
//!
//! # Format
//!
//! A sealed envelope is a JSON object with base64 fields:
//!
//! ```json
//! {"alg":"aes-256-gcm","iv":"<12 bytes>","ct":"<ciphertext>","tag":"<16 bytes>"}
//! ```
//!
//! `alg` selects the AEAD when opening, so envelopes written under one
//! algorithm still open after the deployment default changes.
//!
//! # Security
//!
//! - Every seal draws a fresh 12-byte nonce from the OS RNG; there is no API
//!   that takes a caller nonce
//! - Every open failure maps to the same opaque `Integrity` error

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroizing;

use super::crypto::generate_random_bytes;
use super::master_key::MasterKey;
use crate::types::{CustodyError, Result};

/// Nonce length for both supported AEADs (12 bytes)
pub const NONCE_LEN: usize = 12;

/// Auth tag length for both supported AEADs (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

// =============================================================================
// Algorithm
// =============================================================================

/// AEAD used to seal an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeAlgorithm {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl EnvelopeAlgorithm {
    /// Tag written into the envelope's `alg` field
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    fn encrypt(&self, key: &MasterKey, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let result = match self {
            Self::Aes256Gcm => Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
                .encrypt(Nonce::from_slice(nonce), plaintext),
            Self::ChaCha20Poly1305 => {
                ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.as_bytes()))
                    .encrypt(chacha20poly1305::Nonce::from_slice(nonce), plaintext)
            }
        };
        result.map_err(|e| CustodyError::Internal(format!("Encryption failed: {e}")))
    }

    fn decrypt(
        &self,
        key: &MasterKey,
        nonce: &[u8; NONCE_LEN],
        ciphertext_and_tag: &[u8],
    ) -> std::result::Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Self::Aes256Gcm => Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
                .decrypt(Nonce::from_slice(nonce), ciphertext_and_tag),
            Self::ChaCha20Poly1305 => {
                ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.as_bytes()))
                    .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext_and_tag)
            }
        }
    }
}

impl fmt::Display for EnvelopeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EnvelopeAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "chacha20-poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(format!(
                "unknown envelope algorithm '{other}' (expected aes-256-gcm or chacha20-poly1305)"
            )),
        }
    }
}

// =============================================================================
// Sealed Envelope
// =============================================================================

/// Serialized form of a sealed private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    pub alg: String,
    pub iv: String,
    pub ct: String,
    pub tag: String,
}

impl SealedEnvelope {
    /// Parse an envelope from its stored JSON form.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            warn!(error = %e, "Sealed envelope is not valid JSON");
            CustodyError::Integrity
        })
    }

    /// Serialize to the stored JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// Envelope Cipher
// =============================================================================

/// Seals and opens private key material under the master key.
#[derive(Clone)]
pub struct EnvelopeCipher {
    key: MasterKey,
    algorithm: EnvelopeAlgorithm,
}

impl EnvelopeCipher {
    /// Create a cipher that seals with `algorithm`.
    pub fn new(key: MasterKey, algorithm: EnvelopeAlgorithm) -> Self {
        Self { key, algorithm }
    }

    /// Algorithm used for new seals
    pub fn algorithm(&self) -> EnvelopeAlgorithm {
        self.algorithm
    }

    /// Encrypt `plaintext` into a JSON envelope under a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce: [u8; NONCE_LEN] = generate_random_bytes();
        let mut sealed = self.algorithm.encrypt(&self.key, &nonce, plaintext.as_bytes())?;

        // AEAD output is ciphertext || tag
        let tag = sealed.split_off(sealed.len() - AUTH_TAG_LEN);

        SealedEnvelope {
            alg: self.algorithm.tag().to_string(),
            iv: BASE64.encode(nonce),
            ct: BASE64.encode(&sealed),
            tag: BASE64.encode(&tag),
        }
        .to_json()
    }

    /// Decrypt a JSON envelope.
    ///
    /// # Errors
    ///
    /// `Integrity` for any failure: tampered ciphertext or tag, wrong master
    /// key, malformed envelope, unknown algorithm. The cause is logged here
    /// and never returned.
    pub fn open(&self, envelope: &str) -> Result<Zeroizing<String>> {
        let envelope = SealedEnvelope::parse(envelope)?;

        let algorithm = EnvelopeAlgorithm::from_str(&envelope.alg).map_err(|e| {
            warn!(error = %e, "Sealed envelope names an unsupported algorithm");
            CustodyError::Integrity
        })?;

        let nonce: [u8; NONCE_LEN] = decode_field("iv", &envelope.iv)?
            .try_into()
            .map_err(|_| {
                warn!("Sealed envelope has an invalid nonce length");
                CustodyError::Integrity
            })?;

        let mut ciphertext = decode_field("ct", &envelope.ct)?;
        let tag = decode_field("tag", &envelope.tag)?;
        if tag.len() != AUTH_TAG_LEN {
            warn!(tag_len = tag.len(), "Sealed envelope has an invalid tag length");
            return Err(CustodyError::Integrity);
        }
        ciphertext.extend_from_slice(&tag);

        let plaintext = algorithm
            .decrypt(&self.key, &nonce, &ciphertext)
            .map_err(|_| {
                warn!(alg = %algorithm, "Sealed envelope failed authentication");
                CustodyError::Integrity
            })?;

        String::from_utf8(plaintext).map(Zeroizing::new).map_err(|e| {
            let mut bytes = e.into_bytes();
            zeroize::Zeroize::zeroize(&mut bytes);
            warn!("Sealed envelope plaintext is not UTF-8");
            CustodyError::Integrity
        })
    }
}

impl fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCipher")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn decode_field(name: &'static str, value: &str) -> Result<Vec<u8>> {
    BASE64.decode(value).map_err(|e| {
        warn!(field = name, error = %e, "Sealed envelope field is not valid base64");
        CustodyError::Integrity
    })
}

// =============================================================================
// Tests
// =============================================================================
