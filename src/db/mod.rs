//! Database layer for Sealkeeper
//!
//! MongoDB storage for key pairs, signatures and the verification ledger.

pub mod mongo;
pub mod schemas;

pub use mongo::{redact_credentials, MongoClient, MongoCollection};
pub use schemas::{KeyPairDoc, Metadata, SignatureDoc, VerifyLogDoc, VerifyMethod};
