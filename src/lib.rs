//! Sealkeeper - custodial signing keys
//!
//! Principals get an RSA key pair held on their behalf. They can sign text
//! with it, and anyone can later verify a signature either by its stored
//! record or by presenting the text and signature directly.
//!
//! ## Components
//!
//! - **Custodial keys**: master key resolution, envelope sealing, key pair
//!   generation, RSASSA-PSS signing and the one-time disclosure gate
//! - **Ledger**: append-only record of every verification attempt
//! - **Store**: persistence seam with MongoDB and in-memory backends
//!
//! HTTP routing, sessions and login are left to the embedding service,
//! which calls [`CustodialKeyService`] with authenticated identities.

pub mod config;
pub mod custodial_keys;
pub mod db;
pub mod ledger;
pub mod store;
pub mod types;

pub use config::Args;
pub use custodial_keys::{CustodialKeyService, CustodyConfig, DisclosureMode, MasterKey};
pub use store::{CustodyStore, MemoryStore, MongoStore};
pub use types::{CustodyError, DisclosureError, Result};
