//! Verification ledger entry schema
//!
//! Append-only audit trail of every verification attempt.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for verification logs
pub const VERIFY_LOG_COLLECTION: &str = "verify_logs";

/// Which verification path was taken
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VerifyMethod {
    /// Lookup of a stored signature record by identifier
    #[default]
    #[serde(rename = "byId")]
    ById,
    /// Caller supplied text and signature directly
    #[serde(rename = "byPayload")]
    ByPayload,
}

/// Verification log document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VerifyLogDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub method: VerifyMethod,

    /// Signature record the attempt resolved to, if any
    #[serde(default)]
    pub signature_id: Option<String>,

    /// SHA-256 hex of the text supplied by the caller (byPayload only)
    #[serde(default)]
    pub provided_hash_hex: Option<String>,

    /// Signature supplied by the caller (byPayload only)
    #[serde(default)]
    pub provided_signature_b64: Option<String>,

    pub valid: bool,

    pub requester_address: String,

    #[serde(default)]
    pub algorithm: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl VerifyLogDoc {
    /// Start an entry for an attempt; `valid` defaults to false
    pub fn new(method: VerifyMethod, requester_address: impl Into<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            method,
            signature_id: None,
            provided_hash_hex: None,
            provided_signature_b64: None,
            valid: false,
            requester_address: requester_address.into(),
            algorithm: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the resolved signature ID
    pub fn with_signature(mut self, signature_id: String) -> Self {
        self.signature_id = Some(signature_id);
        self
    }

    /// Set the hash of the caller's text
    pub fn with_provided_hash(mut self, hash_hex: String) -> Self {
        self.provided_hash_hex = Some(hash_hex);
        self
    }

    /// Set the caller's signature
    pub fn with_provided_signature(mut self, signature_b64: String) -> Self {
        self.provided_signature_b64 = Some(signature_b64);
        self
    }

    /// Set the algorithm tag
    pub fn with_algorithm(mut self, algorithm: String) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Set the outcome
    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }
}

impl IntoIndexes for VerifyLogDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "signature_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("signature_id_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "timestamp": -1 },
                Some(
                    IndexOptions::builder()
                        .name("timestamp_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for VerifyLogDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
