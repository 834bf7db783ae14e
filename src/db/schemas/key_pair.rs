//! Key pair document schema
//!
//! One document per principal. The private half is only ever stored sealed.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for key pairs
pub const KEY_PAIR_COLLECTION: &str = "key_pairs";

/// Key pair document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct KeyPairDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning principal (opaque id from the auth layer)
    pub principal_id: String,

    /// Algorithm tag, e.g. `RSA-PSS-SHA256-2048`
    pub algorithm: String,

    /// SPKI public key, PEM armored
    pub public_key_pem: String,

    /// Private key envelope (JSON, see `custodial_keys::envelope`)
    pub sealed_private_key: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    /// One-time disclosure token. Null once consumed, never re-issued.
    #[serde(default)]
    pub disclosure_token: Option<String>,
}

impl KeyPairDoc {
    /// Create a new key pair document
    pub fn new(
        principal_id: String,
        algorithm: String,
        public_key_pem: String,
        sealed_private_key: String,
        disclosure_token: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            principal_id,
            algorithm,
            public_key_pem,
            sealed_private_key,
            created_at: Utc::now(),
            disclosure_token,
        }
    }

    /// Whether a disclosure token is still pending
    pub fn has_pending_token(&self) -> bool {
        self.disclosure_token.is_some()
    }
}

impl std::fmt::Debug for KeyPairDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairDoc")
            .field("_id", &self._id)
            .field("principal_id", &self.principal_id)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .field("sealed_private_key", &"[SEALED]")
            .field(
                "disclosure_token",
                &self.disclosure_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl IntoIndexes for KeyPairDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Exactly one key pair per principal
            (
                doc! { "principal_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("principal_id_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for KeyPairDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
