//! Shared types for Sealkeeper

pub mod error;

pub use error::{CustodyError, DisclosureError, Result};
