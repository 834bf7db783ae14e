//! Public views returned by [`CustodialKeyService`](super::CustodialKeyService).
//!
//! These are what callers see. Persisted documents live in `db::schemas`
//! and never leave the core directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{KeyPairDoc, SignatureDoc};

/// A newly created key pair.
///
/// `disclosure_token` is shown once, at creation, and is the only way to
/// reveal the private key later (unless disclosure is always open).
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairRecord {
    pub principal_id: String,
    pub algorithm: String,
    pub public_key_pem: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosure_token: Option<String>,
}

impl std::fmt::Debug for KeyPairRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairRecord")
            .field("principal_id", &self.principal_id)
            .field("algorithm", &self.algorithm)
            .field("fingerprint", &self.fingerprint)
            .field("created_at", &self.created_at)
            .field(
                "disclosure_token",
                &self.disclosure_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// A stored signature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub signature_id: String,
    pub owner_principal: String,
    pub text_hash_hex: String,
    pub signature_b64: String,
    pub algorithm: String,
    pub created_at: DateTime<Utc>,
    pub text_stored: bool,
}

impl From<&SignatureDoc> for SignatureRecord {
    fn from(doc: &SignatureDoc) -> Self {
        Self {
            signature_id: doc.signature_id.clone(),
            owner_principal: doc.owner_principal.clone(),
            text_hash_hex: doc.text_hash_hex.clone(),
            signature_b64: doc.signature_b64.clone(),
            algorithm: doc.algorithm.clone(),
            created_at: doc.created_at,
            text_stored: doc.stored_text.is_some(),
        }
    }
}

/// Public half of a principal's key pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    pub algorithm: String,
    pub created_at: DateTime<Utc>,
    pub public_key_pem: String,
    pub fingerprint_sha256: String,
}

impl PublicKeyInfo {
    pub(crate) fn from_doc(doc: &KeyPairDoc, fingerprint_sha256: String) -> Self {
        Self {
            algorithm: doc.algorithm.clone(),
            created_at: doc.created_at,
            public_key_pem: doc.public_key_pem.clone(),
            fingerprint_sha256,
        }
    }
}

/// What a verification by identifier found
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureSummary {
    pub signature_id: String,
    pub signer: String,
    pub algorithm: String,
    pub created_at: DateTime<Utc>,
    pub text_stored: bool,
}

impl From<&SignatureDoc> for SignatureSummary {
    fn from(doc: &SignatureDoc) -> Self {
        Self {
            signature_id: doc.signature_id.clone(),
            signer: doc.owner_principal.clone(),
            algorithm: doc.algorithm.clone(),
            created_at: doc.created_at,
            text_stored: doc.stored_text.is_some(),
        }
    }
}

/// Result of verifying a stored signature by identifier.
///
/// When the record has no stored text there is nothing to check the
/// signature against: `valid` is true and `existence_only` says so.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByIdOutcome {
    pub valid: bool,
    pub existence_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureSummary>,
}

impl ByIdOutcome {
    pub fn not_found() -> Self {
        Self {
            valid: false,
            existence_only: false,
            signature: None,
        }
    }
}

/// Result of verifying caller-supplied text and signature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByPayloadOutcome {
    pub valid: bool,
    pub signer: Option<String>,
    pub algorithm: Option<String>,
    pub signature_id: Option<String>,
    pub provided_hash_hex: String,
}

/// Either verification outcome, tagged by `method`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum VerificationOutcome {
    #[serde(rename = "byId")]
    ById(ByIdOutcome),
    #[serde(rename = "byPayload")]
    ByPayload(ByPayloadOutcome),
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        match self {
            Self::ById(outcome) => outcome.valid,
            Self::ByPayload(outcome) => outcome.valid,
        }
    }
}

impl From<ByIdOutcome> for VerificationOutcome {
    fn from(outcome: ByIdOutcome) -> Self {
        Self::ById(outcome)
    }
}

impl From<ByPayloadOutcome> for VerificationOutcome {
    fn from(outcome: ByPayloadOutcome) -> Self {
        Self::ByPayload(outcome)
    }
}
