//! Persistence seam for the custody core.
//!
//! The core never talks to a database directly. Everything it needs from
//! storage goes through [`CustodyStore`], so the same service runs against
//! MongoDB in production and an in-memory map in tests.
//!
//! # Atomicity
//!
//! [`CustodyStore::consume_disclosure_token`] is the only operation with a
//! concurrency requirement: it must compare and clear the token in one step,
//! so that two concurrent reveals with the same token cannot both succeed.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::db::{KeyPairDoc, SignatureDoc, VerifyLogDoc};
use crate::types::Result;

// =============================================================================
// Store Trait (for dependency injection)
// =============================================================================

/// Storage operations required by the custody core
#[async_trait::async_trait]
pub trait CustodyStore: Send + Sync {
    /// Insert the key pair for a principal.
    ///
    /// Fails with `KeyPairExists` if the principal already has one.
    async fn insert_key_pair(&self, key_pair: KeyPairDoc) -> Result<()>;

    /// Look up the key pair of a principal
    async fn find_key_pair(&self, principal_id: &str) -> Result<Option<KeyPairDoc>>;

    /// Clear the disclosure token if and only if it currently equals `token`.
    ///
    /// Returns `true` when this call cleared it, `false` when nothing matched
    /// (wrong token, already cleared, or no key pair).
    async fn consume_disclosure_token(&self, principal_id: &str, token: &str) -> Result<bool>;

    /// Insert a signature record
    async fn insert_signature(&self, signature: SignatureDoc) -> Result<()>;

    /// Look up a signature record by its identifier
    async fn find_signature(&self, signature_id: &str) -> Result<Option<SignatureDoc>>;

    /// Look up a signature record by exact base64 signature string
    async fn find_signature_by_bytes(&self, signature_b64: &str) -> Result<Option<SignatureDoc>>;

    /// Append a verification ledger entry
    async fn append_verification(&self, entry: VerifyLogDoc) -> Result<()>;
}
