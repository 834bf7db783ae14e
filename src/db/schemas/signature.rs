//! Signature record schema
//!
//! Written once per sign operation and never modified.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for signatures
pub const SIGNATURE_COLLECTION: &str = "signatures";

/// Signature document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SignatureDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Public identifier (UUID v4)
    pub signature_id: String,

    /// Principal whose key produced the signature
    pub owner_principal: String,

    /// SHA-256 of the signed text, lowercase hex
    pub text_hash_hex: String,

    /// Signed text, only when the signer opted in
    #[serde(default)]
    pub stored_text: Option<String>,

    /// RSASSA-PSS signature, base64
    pub signature_b64: String,

    /// Algorithm tag of the signing key
    pub algorithm: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl SignatureDoc {
    /// Create a new signature document with a fresh identifier
    pub fn new(
        owner_principal: String,
        text_hash_hex: String,
        stored_text: Option<String>,
        signature_b64: String,
        algorithm: String,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            signature_id: uuid::Uuid::new_v4().to_string(),
            owner_principal,
            text_hash_hex,
            stored_text,
            signature_b64,
            algorithm,
            created_at: Utc::now(),
        }
    }
}

impl IntoIndexes for SignatureDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "signature_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("signature_id_unique".to_string())
                        .build(),
                ),
            ),
            // Verification by payload looks signatures up by their bytes
            (
                doc! { "signature_b64": 1 },
                Some(
                    IndexOptions::builder()
                        .name("signature_b64_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "owner_principal": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_principal_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for SignatureDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
