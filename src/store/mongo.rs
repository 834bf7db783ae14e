//! MongoDB-backed store

use bson::{doc, Bson, DateTime, Document};
use tracing::debug;

use super::CustodyStore;
use crate::db::schemas::{KEY_PAIR_COLLECTION, SIGNATURE_COLLECTION, VERIFY_LOG_COLLECTION};
use crate::db::{KeyPairDoc, MongoClient, MongoCollection, SignatureDoc, VerifyLogDoc};
use crate::types::{CustodyError, Result};

/// [`CustodyStore`] over the three custody collections
#[derive(Clone)]
pub struct MongoStore {
    key_pairs: MongoCollection<KeyPairDoc>,
    signatures: MongoCollection<SignatureDoc>,
    verify_logs: MongoCollection<VerifyLogDoc>,
}

impl MongoStore {
    /// Open the collections, creating their indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            key_pairs: client.collection(KEY_PAIR_COLLECTION).await?,
            signatures: client.collection(SIGNATURE_COLLECTION).await?,
            verify_logs: client.collection(VERIFY_LOG_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl CustodyStore for MongoStore {
    async fn insert_key_pair(&self, key_pair: KeyPairDoc) -> Result<()> {
        let principal_id = key_pair.principal_id.clone();
        match self.key_pairs.insert_one(key_pair).await {
            Ok(_) => Ok(()),
            // Unique index on principal_id
            Err(CustodyError::Conflict(_)) => Err(CustodyError::KeyPairExists(principal_id)),
            Err(e) => Err(e),
        }
    }

    async fn find_key_pair(&self, principal_id: &str) -> Result<Option<KeyPairDoc>> {
        self.key_pairs
            .find_one(doc! { "principal_id": principal_id })
            .await
    }

    async fn consume_disclosure_token(&self, principal_id: &str, token: &str) -> Result<bool> {
        let result = self
            .key_pairs
            .update_one(
                consume_token_filter(principal_id, token),
                consume_token_update(DateTime::now()),
            )
            .await?;

        debug!(
            principal_id = %principal_id,
            modified = result.modified_count,
            "Disclosure token compare-and-clear"
        );

        Ok(result.modified_count == 1)
    }

    async fn insert_signature(&self, signature: SignatureDoc) -> Result<()> {
        self.signatures.insert_one(signature).await?;
        Ok(())
    }

    async fn find_signature(&self, signature_id: &str) -> Result<Option<SignatureDoc>> {
        self.signatures
            .find_one(doc! { "signature_id": signature_id })
            .await
    }

    async fn find_signature_by_bytes(&self, signature_b64: &str) -> Result<Option<SignatureDoc>> {
        self.signatures
            .find_one(doc! { "signature_b64": signature_b64 })
            .await
    }

    async fn append_verification(&self, entry: VerifyLogDoc) -> Result<()> {
        self.verify_logs.insert_one(entry).await?;
        Ok(())
    }
}

/// Matches the key pair only while it still holds `token`
fn consume_token_filter(principal_id: &str, token: &str) -> Document {
    doc! {
        "principal_id": principal_id,
        "disclosure_token": token,
    }
}

/// Clears the token; it is never re-issued
fn consume_token_update(now: DateTime) -> Document {
    doc! {
        "$set": {
            "disclosure_token": Bson::Null,
            "metadata.updated_at": now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_filter_requires_current_token() {
        let filter = consume_token_filter("p-1", "tok");

        assert_eq!(filter.len(), 2);
        assert_eq!(filter.get_str("principal_id").unwrap(), "p-1");
        assert_eq!(filter.get_str("disclosure_token").unwrap(), "tok");
    }

    #[test]
    fn test_consume_update_nulls_token() {
        let now = DateTime::from_millis(1_700_000_000_000);
        let update = consume_token_update(now);

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get("disclosure_token"), Some(&Bson::Null));
        assert_eq!(set.get_datetime("metadata.updated_at").unwrap(), &now);
        assert_eq!(update.len(), 1);
    }
}
