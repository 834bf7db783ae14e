//! Custodial Key Service
//!
//! Facade over the custody core. Callers arrive with an already
//! authenticated principal and a requester address; everything else is
//! handled here.
//!
//! # Responsibilities
//!
//! - Generate and seal a key pair per principal
//! - Sign text with the principal's sealed key
//! - Verify signatures by stored record or by supplied payload, recording
//!   every attempt in the ledger
//! - Release the private key through the disclosure gate
//! - Publish the public key and its fingerprint

use std::sync::Arc;

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::db::{KeyPairDoc, SignatureDoc, VerifyLogDoc, VerifyMethod};
use crate::ledger::{LedgerStatsSnapshot, VerificationLedger};
use crate::store::CustodyStore;
use crate::types::{CustodyError, Result};

use super::disclosure::{DisclosureGate, DisclosureMode};
use super::envelope::{EnvelopeAlgorithm, EnvelopeCipher};
use super::keypair::{fingerprint, generate_keypair, DEFAULT_KEY_BITS, MIN_KEY_BITS};
use super::master_key::MasterKey;
use super::records::{
    ByIdOutcome, ByPayloadOutcome, KeyPairRecord, PublicKeyInfo, SignatureRecord,
    SignatureSummary,
};
use super::signer::{self, hash_hex};

// =============================================================================
// Configuration
// =============================================================================

/// Deployment settings for the custody core.
#[derive(Debug, Clone)]
pub struct CustodyConfig {
    /// AEAD used for new envelopes (existing ones open by their own tag)
    pub envelope_algorithm: EnvelopeAlgorithm,

    /// How private keys may be revealed
    pub disclosure_mode: DisclosureMode,

    /// RSA modulus size for new key pairs
    pub rsa_key_bits: usize,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            envelope_algorithm: EnvelopeAlgorithm::default(),
            disclosure_mode: DisclosureMode::default(),
            rsa_key_bits: DEFAULT_KEY_BITS,
        }
    }
}

// =============================================================================
// Custodial Key Service
// =============================================================================

/// Service for custodial signing keys.
pub struct CustodialKeyService {
    store: Arc<dyn CustodyStore>,
    cipher: EnvelopeCipher,
    gate: DisclosureGate,
    ledger: VerificationLedger,
    rsa_key_bits: usize,
}

impl CustodialKeyService {
    /// Create a service over `store`.
    ///
    /// Fails with `Config` when the configured key size is below the minimum.
    pub fn new(store: Arc<dyn CustodyStore>, master_key: MasterKey, config: CustodyConfig) -> Result<Self> {
        if config.rsa_key_bits < MIN_KEY_BITS {
            return Err(CustodyError::Config(format!(
                "RSA key size {} is below the {}-bit minimum",
                config.rsa_key_bits, MIN_KEY_BITS
            )));
        }

        info!(
            envelope = %config.envelope_algorithm,
            disclosure = ?config.disclosure_mode,
            rsa_key_bits = config.rsa_key_bits,
            "Custodial key service ready"
        );

        Ok(Self {
            ledger: VerificationLedger::new(store.clone()),
            store,
            cipher: EnvelopeCipher::new(master_key, config.envelope_algorithm),
            gate: DisclosureGate::new(config.disclosure_mode),
            rsa_key_bits: config.rsa_key_bits,
        })
    }

    /// Generate, seal and store the key pair of a new principal.
    ///
    /// # Arguments
    ///
    /// - `principal_id`: Owner of the new key pair
    ///
    /// # Returns
    ///
    /// The public record, including the one-time disclosure token when one
    /// was issued. `KeyPairExists` if the principal already has a key pair.
    pub async fn generate_and_seal_key_pair(&self, principal_id: &str) -> Result<KeyPairRecord> {
        if principal_id.trim().is_empty() {
            return Err(CustodyError::BadRequest("principal id is empty".into()));
        }

        // Skip the expensive generation when the insert would conflict anyway
        if self.store.find_key_pair(principal_id).await?.is_some() {
            return Err(CustodyError::KeyPairExists(principal_id.to_string()));
        }

        let bits = self.rsa_key_bits;
        let generated = tokio::task::spawn_blocking(move || generate_keypair(bits)).await??;

        let sealed_private_key = self.cipher.seal(&generated.private_key_pem)?;
        let fingerprint = fingerprint(&generated.public_key_pem)?;
        let disclosure_token = self.gate.issue_token();

        let doc = KeyPairDoc::new(
            principal_id.to_string(),
            generated.algorithm.clone(),
            generated.public_key_pem.clone(),
            sealed_private_key,
            disclosure_token.clone(),
        );
        let created_at = doc.created_at;

        self.store.insert_key_pair(doc).await?;

        info!(
            principal_id = %principal_id,
            algorithm = %generated.algorithm,
            fingerprint = %fingerprint,
            "Generated custodial key pair"
        );

        Ok(KeyPairRecord {
            principal_id: principal_id.to_string(),
            algorithm: generated.algorithm.clone(),
            public_key_pem: generated.public_key_pem.clone(),
            fingerprint,
            created_at,
            disclosure_token,
        })
    }

    /// Sign `text` with the principal's key.
    ///
    /// The text itself is kept only when `store_text` is set; the hash is
    /// always kept.
    pub async fn sign(&self, principal_id: &str, text: &str, store_text: bool) -> Result<SignatureRecord> {
        let key_pair = self.require_key_pair(principal_id).await?;

        let private_key_pem = self.cipher.open(&key_pair.sealed_private_key)?;
        let owned_text = text.to_string();
        let signature_b64 =
            tokio::task::spawn_blocking(move || signer::sign(&private_key_pem, &owned_text)).await??;

        let doc = SignatureDoc::new(
            principal_id.to_string(),
            hash_hex(text),
            store_text.then(|| text.to_string()),
            signature_b64,
            key_pair.algorithm,
        );
        let record = SignatureRecord::from(&doc);

        self.store.insert_signature(doc).await?;

        info!(
            principal_id = %principal_id,
            signature_id = %record.signature_id,
            text_stored = record.text_stored,
            "Signed text"
        );

        Ok(record)
    }

    /// Verify a stored signature by its identifier.
    ///
    /// An unknown identifier is not an error: the outcome is invalid and the
    /// attempt is still recorded. A storage failure is recorded as invalid
    /// and then returned.
    pub async fn verify_by_id(&self, signature_id: &str, requester_address: &str) -> Result<ByIdOutcome> {
        let entry = VerifyLogDoc::new(VerifyMethod::ById, requester_address);

        let outcome = match self.evaluate_by_id(signature_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.ledger.record(entry).await;
                return Err(e);
            }
        };

        let mut entry = entry.with_valid(outcome.valid);
        if let Some(summary) = &outcome.signature {
            entry = entry
                .with_signature(summary.signature_id.clone())
                .with_algorithm(summary.algorithm.clone());
        }
        self.ledger.record(entry).await;

        debug!(
            signature_id = %signature_id,
            valid = outcome.valid,
            existence_only = outcome.existence_only,
            "Verified by id"
        );

        Ok(outcome)
    }

    async fn evaluate_by_id(&self, signature_id: &str) -> Result<ByIdOutcome> {
        let Some(signature) = self.store.find_signature(signature_id).await? else {
            return Ok(ByIdOutcome::not_found());
        };
        let Some(key_pair) = self.store.find_key_pair(&signature.owner_principal).await? else {
            return Ok(ByIdOutcome::not_found());
        };

        let summary = SignatureSummary::from(&signature);

        let outcome = match &signature.stored_text {
            Some(text) => {
                let verified = signer::verify(&key_pair.public_key_pem, text, &signature.signature_b64);
                ByIdOutcome {
                    valid: verified && hash_hex(text) == signature.text_hash_hex,
                    existence_only: false,
                    signature: Some(summary),
                }
            }
            // Nothing to check the signature against
            None => ByIdOutcome {
                valid: true,
                existence_only: true,
                signature: Some(summary),
            },
        };

        Ok(outcome)
    }

    /// Verify caller-supplied text and signature.
    ///
    /// The signer is attributed by exact match of the signature string
    /// against stored records; the text is then checked against that
    /// signer's public key. Unattributed signatures are invalid.
    pub async fn verify_by_payload(
        &self,
        text: &str,
        signature_b64: &str,
        requester_address: &str,
    ) -> Result<ByPayloadOutcome> {
        let provided_hash_hex = hash_hex(text);
        let entry = VerifyLogDoc::new(VerifyMethod::ByPayload, requester_address)
            .with_provided_hash(provided_hash_hex.clone())
            .with_provided_signature(signature_b64.to_string());

        let outcome = match self.evaluate_by_payload(text, signature_b64, &provided_hash_hex).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.ledger.record(entry).await;
                return Err(e);
            }
        };

        let mut entry = entry.with_valid(outcome.valid);
        if let Some(signature_id) = &outcome.signature_id {
            entry = entry.with_signature(signature_id.clone());
        }
        if let Some(algorithm) = &outcome.algorithm {
            entry = entry.with_algorithm(algorithm.clone());
        }
        self.ledger.record(entry).await;

        debug!(
            valid = outcome.valid,
            attributed = outcome.signer.is_some(),
            "Verified by payload"
        );

        Ok(outcome)
    }

    async fn evaluate_by_payload(
        &self,
        text: &str,
        signature_b64: &str,
        provided_hash_hex: &str,
    ) -> Result<ByPayloadOutcome> {
        let unattributed = ByPayloadOutcome {
            valid: false,
            signer: None,
            algorithm: None,
            signature_id: None,
            provided_hash_hex: provided_hash_hex.to_string(),
        };

        let Some(signature) = self.store.find_signature_by_bytes(signature_b64).await? else {
            return Ok(unattributed);
        };
        let Some(key_pair) = self.store.find_key_pair(&signature.owner_principal).await? else {
            return Ok(unattributed);
        };

        let verified = signer::verify(&key_pair.public_key_pem, text, signature_b64);

        Ok(ByPayloadOutcome {
            valid: verified && signature.text_hash_hex == provided_hash_hex,
            signer: Some(signature.owner_principal),
            algorithm: Some(signature.algorithm),
            signature_id: Some(signature.signature_id),
            provided_hash_hex: provided_hash_hex.to_string(),
        })
    }

    /// Reveal the principal's private key PEM through the disclosure gate.
    pub async fn reveal_private_key(
        &self,
        principal_id: &str,
        supplied_token: Option<&str>,
    ) -> Result<Zeroizing<String>> {
        self.gate
            .reveal(self.store.as_ref(), &self.cipher, principal_id, supplied_token)
            .await
    }

    /// Public key, algorithm and fingerprint of a principal.
    pub async fn fetch_public_key_info(&self, principal_id: &str) -> Result<PublicKeyInfo> {
        let key_pair = self.require_key_pair(principal_id).await?;
        let fingerprint_sha256 = fingerprint(&key_pair.public_key_pem)?;
        Ok(PublicKeyInfo::from_doc(&key_pair, fingerprint_sha256))
    }

    /// Get verification ledger statistics.
    pub fn ledger_stats(&self) -> LedgerStatsSnapshot {
        self.ledger.stats()
    }

    /// Disclosure mode this service was built with.
    pub fn disclosure_mode(&self) -> DisclosureMode {
        self.gate.mode()
    }

    async fn require_key_pair(&self, principal_id: &str) -> Result<KeyPairDoc> {
        self.store
            .find_key_pair(principal_id)
            .await?
            .ok_or_else(|| CustodyError::NoKeyPair(principal_id.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service_with(store: Arc<MemoryStore>, config: CustodyConfig) -> CustodialKeyService {
        CustodialKeyService::new(store, MasterKey::from_bytes([42u8; 32]), config).unwrap()
    }

    #[test]
    fn test_rejects_small_keys() {
        let config = CustodyConfig {
            rsa_key_bits: 1024,
            ..Default::default()
        };
        let result = CustodialKeyService::new(
            Arc::new(MemoryStore::new()),
            MasterKey::from_bytes([0u8; 32]),
            config,
        );
        assert!(matches!(result, Err(CustodyError::Config(_))));
    }

    #[tokio::test]
    async fn test_generate_stores_sealed_key() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone(), CustodyConfig::default());

        let record = service.generate_and_seal_key_pair("p-1").await.unwrap();
        assert_eq!(record.algorithm, "RSA-PSS-SHA256-2048");
        assert_eq!(record.disclosure_token.as_ref().map(String::len), Some(43));
        assert_eq!(record.fingerprint, fingerprint(&record.public_key_pem).unwrap());

        let doc = store.find_key_pair("p-1").await.unwrap().unwrap();
        assert!(!doc.sealed_private_key.contains("PRIVATE KEY"));
        assert_eq!(doc.disclosure_token, record.disclosure_token);
    }

    #[tokio::test]
    async fn test_empty_principal_rejected() {
        let service = service_with(Arc::new(MemoryStore::new()), CustodyConfig::default());
        let err = service.generate_and_seal_key_pair("  ").await.unwrap_err();
        assert!(matches!(err, CustodyError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_chacha_envelopes() {
        let store = Arc::new(MemoryStore::new());
        let config = CustodyConfig {
            envelope_algorithm: EnvelopeAlgorithm::ChaCha20Poly1305,
            disclosure_mode: DisclosureMode::AlwaysOpen,
            ..Default::default()
        };
        let service = service_with(store.clone(), config);

        let record = service.generate_and_seal_key_pair("p-1").await.unwrap();
        assert!(record.disclosure_token.is_none());

        let doc = store.find_key_pair("p-1").await.unwrap().unwrap();
        assert!(doc.sealed_private_key.contains("chacha20-poly1305"));

        let signature = service.sign("p-1", "hello", false).await.unwrap();
        let outcome = service
            .verify_by_payload("hello", &signature.signature_b64, "127.0.0.1")
            .await
            .unwrap();
        assert!(outcome.valid);
    }

    #[tokio::test]
    async fn test_existence_only_by_id() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone(), CustodyConfig::default());
        service.generate_and_seal_key_pair("p-1").await.unwrap();

        let signature = service.sign("p-1", "not kept", false).await.unwrap();
        assert!(!signature.text_stored);

        let outcome = service
            .verify_by_id(&signature.signature_id, "127.0.0.1")
            .await
            .unwrap();
        assert!(outcome.valid);
        assert!(outcome.existence_only);
        assert_eq!(outcome.signature.unwrap().signer, "p-1");
        assert_eq!(service.ledger_stats().recorded, 1);
    }

    /// Service in always-open mode with one key pair, plus that key's PEM
    async fn service_and_private_key(
        store: Arc<MemoryStore>,
    ) -> (CustodialKeyService, Zeroizing<String>) {
        let config = CustodyConfig {
            disclosure_mode: DisclosureMode::AlwaysOpen,
            ..Default::default()
        };
        let service = service_with(store, config);
        service.generate_and_seal_key_pair("p-1").await.unwrap();
        let private_key_pem = service.reveal_private_key("p-1", None).await.unwrap();
        (service, private_key_pem)
    }

    #[tokio::test]
    async fn test_by_id_rejects_edited_stored_text() {
        let store = Arc::new(MemoryStore::new());
        let (service, private_key_pem) = service_and_private_key(store.clone()).await;

        // Signature and hash are for "original", stored text was edited
        let signature_b64 = signer::sign(&private_key_pem, "original").unwrap();
        let doc = SignatureDoc::new(
            "p-1".into(),
            hash_hex("original"),
            Some("edited".into()),
            signature_b64,
            "RSA-PSS-SHA256-2048".into(),
        );
        let signature_id = doc.signature_id.clone();
        store.insert_signature(doc).await.unwrap();

        let outcome = service.verify_by_id(&signature_id, "127.0.0.1").await.unwrap();
        assert!(!outcome.valid);
        assert!(!outcome.existence_only);
        assert!(outcome.signature.is_some());
    }

    #[tokio::test]
    async fn test_by_id_rejects_mismatched_stored_hash() {
        let store = Arc::new(MemoryStore::new());
        let (service, private_key_pem) = service_and_private_key(store.clone()).await;

        // Signature matches the stored text, recorded hash does not
        let signature_b64 = signer::sign(&private_key_pem, "kept text").unwrap();
        let doc = SignatureDoc::new(
            "p-1".into(),
            hash_hex("something else"),
            Some("kept text".into()),
            signature_b64,
            "RSA-PSS-SHA256-2048".into(),
        );
        let signature_id = doc.signature_id.clone();
        store.insert_signature(doc).await.unwrap();

        let outcome = service.verify_by_id(&signature_id, "127.0.0.1").await.unwrap();
        assert!(!outcome.valid);
        assert!(!outcome.existence_only);

        let entries = store.verification_entries();
        assert_eq!(entries.last().unwrap().signature_id.as_deref(), Some(signature_id.as_str()));
        assert!(!entries.last().unwrap().valid);
    }

    #[tokio::test]
    async fn test_by_payload_rejects_mismatched_stored_hash() {
        let store = Arc::new(MemoryStore::new());
        let (service, private_key_pem) = service_and_private_key(store.clone()).await;

        let signature_b64 = signer::sign(&private_key_pem, "hello").unwrap();
        let doc = SignatureDoc::new(
            "p-1".into(),
            hash_hex("not hello"),
            None,
            signature_b64.clone(),
            "RSA-PSS-SHA256-2048".into(),
        );
        store.insert_signature(doc).await.unwrap();

        let outcome = service
            .verify_by_payload("hello", &signature_b64, "127.0.0.1")
            .await
            .unwrap();
        assert!(!outcome.valid);
        assert_eq!(outcome.signer.as_deref(), Some("p-1"));
        assert_eq!(outcome.provided_hash_hex, hash_hex("hello"));
    }
}
