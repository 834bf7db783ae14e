//! Bookkeeping block carried by every custody document

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Timestamps and the deletion flag shared by all collections.
///
/// Custody records are never deleted; `is_deleted` exists so lookups can
/// filter on it uniformly.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Metadata for a document created now
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            is_deleted: false,
            updated_at: Some(now),
            created_at: Some(now),
        }
    }

    /// Reset for insertion: live, created and updated now
    pub fn stamp_insert(&mut self) {
        *self = Self::new();
    }

    /// Record a modification
    pub fn touch(&mut self) {
        self.updated_at = Some(DateTime::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_insert_revives_document() {
        let mut metadata = Metadata {
            is_deleted: true,
            updated_at: None,
            created_at: None,
        };

        metadata.stamp_insert();

        assert!(!metadata.is_deleted);
        assert!(metadata.created_at.is_some());
        assert_eq!(metadata.created_at, metadata.updated_at);
    }

    #[test]
    fn test_touch_keeps_created_at() {
        let mut metadata = Metadata::default();
        metadata.touch();

        assert!(metadata.created_at.is_none());
        assert!(metadata.updated_at.is_some());
    }
}
