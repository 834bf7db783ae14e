//! In-memory store backed by `DashMap`.
//!
//! Used by tests and by embedders that do not need durability.

use std::sync::Mutex;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::CustodyStore;
use crate::db::{KeyPairDoc, SignatureDoc, VerifyLogDoc};
use crate::types::{CustodyError, Result};

/// In-memory implementation of [`CustodyStore`]
#[derive(Default)]
pub struct MemoryStore {
    /// Key pairs indexed by principal_id
    key_pairs: DashMap<String, KeyPairDoc>,

    /// Signatures indexed by signature_id
    signatures: DashMap<String, SignatureDoc>,

    /// Append-only verification ledger
    verifications: Mutex<Vec<VerifyLogDoc>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every ledger entry, oldest first
    pub fn verification_entries(&self) -> Vec<VerifyLogDoc> {
        match self.verifications.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of ledger entries
    pub fn verification_count(&self) -> usize {
        match self.verifications.lock() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Number of stored key pairs
    pub fn key_pair_count(&self) -> usize {
        self.key_pairs.len()
    }
}

#[async_trait::async_trait]
impl CustodyStore for MemoryStore {
    async fn insert_key_pair(&self, key_pair: KeyPairDoc) -> Result<()> {
        match self.key_pairs.entry(key_pair.principal_id.clone()) {
            Entry::Occupied(_) => Err(CustodyError::KeyPairExists(key_pair.principal_id)),
            Entry::Vacant(slot) => {
                slot.insert(key_pair);
                Ok(())
            }
        }
    }

    async fn find_key_pair(&self, principal_id: &str) -> Result<Option<KeyPairDoc>> {
        Ok(self.key_pairs.get(principal_id).map(|kp| kp.value().clone()))
    }

    async fn consume_disclosure_token(&self, principal_id: &str, token: &str) -> Result<bool> {
        // The shard write lock held by get_mut makes compare-and-clear atomic
        let Some(mut key_pair) = self.key_pairs.get_mut(principal_id) else {
            return Ok(false);
        };

        if key_pair.disclosure_token.as_deref() == Some(token) {
            key_pair.disclosure_token = None;
            key_pair.metadata.touch();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn insert_signature(&self, signature: SignatureDoc) -> Result<()> {
        match self.signatures.entry(signature.signature_id.clone()) {
            Entry::Occupied(_) => Err(CustodyError::Conflict(format!(
                "signature {} already exists",
                signature.signature_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(signature);
                Ok(())
            }
        }
    }

    async fn find_signature(&self, signature_id: &str) -> Result<Option<SignatureDoc>> {
        Ok(self.signatures.get(signature_id).map(|s| s.value().clone()))
    }

    async fn find_signature_by_bytes(&self, signature_b64: &str) -> Result<Option<SignatureDoc>> {
        Ok(self
            .signatures
            .iter()
            .find(|s| s.signature_b64 == signature_b64)
            .map(|s| s.value().clone()))
    }

    async fn append_verification(&self, entry: VerifyLogDoc) -> Result<()> {
        let mut entries = self
            .verifications
            .lock()
            .map_err(|_| CustodyError::Internal("verification ledger lock poisoned".into()))?;
        entries.push(entry);
        Ok(())
    }
}
