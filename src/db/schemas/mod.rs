//! Database schemas for Sealkeeper
//!
//! MongoDB document structures for key pairs, signatures and verification logs.

mod key_pair;
mod metadata;
mod signature;
mod verify_log;

pub use key_pair::{KeyPairDoc, KEY_PAIR_COLLECTION};
pub use metadata::Metadata;
pub use signature::{SignatureDoc, SIGNATURE_COLLECTION};
pub use verify_log::{VerifyLogDoc, VerifyMethod, VERIFY_LOG_COLLECTION};
