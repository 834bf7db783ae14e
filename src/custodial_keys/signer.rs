//! RSASSA-PSS signing and verification of text.
//!
//! # Parameters
//!
//! - Digest: SHA-256 over the UTF-8 bytes of the text
//! - Salt length: 32 bytes
//!
//! PSS is salted, so signing the same text twice gives different bytes. Both
//! verify.
//!
//! Verification never errors: malformed encodings, wrong lengths, bad keys
//! and mismatches all come back as `false`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::types::{CustodyError, Result};

/// PSS salt length in bytes
pub const PSS_SALT_LEN: usize = 32;

/// SHA-256 of the UTF-8 bytes of `text`, lowercase hex.
pub fn hash_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Parse a PKCS#8 PEM private key.
pub fn parse_private_key(private_key_pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| CustodyError::Crypto(format!("Invalid private key: {e}")))
}

/// Parse an SPKI PEM public key.
pub fn parse_public_key(public_key_pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| CustodyError::BadRequest(format!("Invalid public key: {e}")))
}

/// Sign `text` with RSASSA-PSS.
pub fn sign_text(private_key: &RsaPrivateKey, text: &str) -> Result<Vec<u8>> {
    let signing_key = SigningKey::<Sha256>::new_with_salt_len(private_key.clone(), PSS_SALT_LEN);
    let signature = signing_key
        .try_sign_with_rng(&mut OsRng, text.as_bytes())
        .map_err(|e| CustodyError::Crypto(format!("Signing failed: {e}")))?;
    Ok(signature.to_vec())
}

/// Check a raw RSASSA-PSS signature over `text`.
pub fn verify_text(public_key: &RsaPublicKey, text: &str, signature: &[u8]) -> bool {
    let Ok(signature) = Signature::try_from(signature) else {
        return false;
    };
    let verifying_key = VerifyingKey::<Sha256>::new_with_salt_len(public_key.clone(), PSS_SALT_LEN);
    verifying_key.verify(text.as_bytes(), &signature).is_ok()
}

/// Sign `text` with a PEM private key, returning the signature as base64.
pub fn sign(private_key_pem: &str, text: &str) -> Result<String> {
    let private_key = parse_private_key(private_key_pem)?;
    let signature = sign_text(&private_key, text)?;
    Ok(BASE64.encode(signature))
}

/// Verify a base64 signature over `text` against a PEM public key.
pub fn verify(public_key_pem: &str, text: &str, signature_b64: &str) -> bool {
    let public_key = match parse_public_key(public_key_pem) {
        Ok(key) => key,
        Err(e) => {
            debug!(error = %e, "Verification against unparsable public key");
            return false;
        }
    };

    match BASE64.decode(signature_b64.trim()) {
        Ok(signature) => verify_text(&public_key, text, &signature),
        Err(_) => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custodial_keys::keypair::{generate_keypair, DEFAULT_KEY_BITS};

    #[test]
    fn test_hash_hex() {
        assert_eq!(
            hash_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        // UTF-8 bytes, not UTF-16 code units
        assert_eq!(hash_hex("Olá mundo").len(), 64);
        assert_ne!(hash_hex("Olá mundo"), hash_hex("Ola mundo"));
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = generate_keypair(DEFAULT_KEY_BITS).unwrap();
        let text = "Hello, custody!";

        let signature = sign(&keypair.private_key_pem, text).unwrap();

        // 2048-bit modulus -> 256-byte signature
        assert_eq!(BASE64.decode(&signature).unwrap().len(), 256);
        assert!(verify(&keypair.public_key_pem, text, &signature));
    }

    #[test]
    fn test_signatures_are_salted() {
        let keypair = generate_keypair(DEFAULT_KEY_BITS).unwrap();

        let a = sign(&keypair.private_key_pem, "same text").unwrap();
        let b = sign(&keypair.private_key_pem, "same text").unwrap();

        assert_ne!(a, b);
        assert!(verify(&keypair.public_key_pem, "same text", &a));
        assert!(verify(&keypair.public_key_pem, "same text", &b));
    }

    #[test]
    fn test_altered_text_fails() {
        let keypair = generate_keypair(DEFAULT_KEY_BITS).unwrap();
        let signature = sign(&keypair.private_key_pem, "ABC").unwrap();

        assert!(!verify(&keypair.public_key_pem, "ABC ALTERADO", &signature));
        assert!(!verify(&keypair.public_key_pem, "abc", &signature));
    }

    #[test]
    fn test_other_key_fails() {
        let signer = generate_keypair(DEFAULT_KEY_BITS).unwrap();
        let other = generate_keypair(DEFAULT_KEY_BITS).unwrap();
        let signature = sign(&signer.private_key_pem, "text").unwrap();

        assert!(!verify(&other.public_key_pem, "text", &signature));
    }

    #[test]
    fn test_malformed_inputs_return_false() {
        let keypair = generate_keypair(DEFAULT_KEY_BITS).unwrap();
        let signature = sign(&keypair.private_key_pem, "text").unwrap();

        // Not base64
        assert!(!verify(&keypair.public_key_pem, "text", "%%%not-base64%%%"));
        // Wrong length
        assert!(!verify(&keypair.public_key_pem, "text", &BASE64.encode([1u8; 17])));
        // Empty
        assert!(!verify(&keypair.public_key_pem, "text", ""));
        // Garbage public key
        assert!(!verify("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----", "text", &signature));
    }

    #[test]
    fn test_sign_with_garbage_key_errors() {
        assert!(matches!(sign("nope", "text"), Err(CustodyError::Crypto(_))));
    }
}
