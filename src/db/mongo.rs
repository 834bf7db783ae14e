//! MongoDB client and typed collection wrapper
//!
//! Every collection is opened through [`MongoCollection`], which applies
//! the schema's indexes on open and stamps metadata on insert.

use std::time::Duration;

use bson::{doc, oid::ObjectId, Document};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::CustodyError;

/// MongoDB duplicate key error code
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Fail fast when the server is unreachable
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(3);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

// =============================================================================
// Client
// =============================================================================

/// Connected MongoDB client bound to one database
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database.
    ///
    /// Errors never echo the URI, which may carry credentials.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, CustodyError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| CustodyError::Config(format!("Invalid MongoDB URI: {}", e.kind)))?;
        options.app_name = Some("sealkeeper".to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.connect_timeout = Some(CONNECT_TIMEOUT);

        let client = Client::with_options(options)
            .map_err(|e| CustodyError::Database(format!("MongoDB client setup failed: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CustodyError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!(database = %db_name, "Connected to MongoDB");

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Open a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, CustodyError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        let collection = MongoCollection {
            inner: self.client.database(&self.db_name).collection::<T>(name),
        };
        collection.apply_indexes().await?;
        Ok(collection)
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Typed collection whose documents carry [`Metadata`]
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    async fn apply_indexes(&self) -> Result<(), CustodyError> {
        let models: Vec<IndexModel> = T::into_indices()
            .into_iter()
            .map(|(keys, options)| IndexModel::builder().keys(keys).options(options).build())
            .collect();

        if models.is_empty() {
            return Ok(());
        }

        self.inner
            .create_indexes(models)
            .await
            .map_err(|e| CustodyError::Database(format!("Failed to create indexes: {}", e)))?;
        Ok(())
    }

    /// Insert a document with fresh metadata.
    ///
    /// A unique index violation comes back as `Conflict`.
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, CustodyError> {
        item.mut_metadata().stamp_insert();

        let result = self.inner.insert_one(item).await.map_err(|e| {
            if is_duplicate_key(&e) {
                CustodyError::Conflict(format!("Duplicate key: {}", e))
            } else {
                CustodyError::Database(format!("Insert failed: {}", e))
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| CustodyError::Database("Inserted document has no ObjectId".into()))
    }

    /// First live document matching `filter`
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, CustodyError> {
        self.inner
            .find_one(live_filter(filter))
            .await
            .map_err(|e| CustodyError::Database(format!("Find failed: {}", e)))
    }

    /// Update one document.
    ///
    /// Single-document updates are atomic, so a filter that includes the
    /// expected current value acts as a compare-and-set.
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, CustodyError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| CustodyError::Database(format!("Update failed: {}", e)))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Restrict a filter to documents not flagged as deleted
fn live_filter(mut filter: Document) -> Document {
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

/// Whether a MongoDB error is a unique index violation
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

/// Connection URI with any `user:password@` replaced, safe to log
pub fn redact_credentials(uri: &str) -> String {
    let Some(scheme_end) = uri.find("://") else {
        return uri.to_string();
    };
    let authority_start = scheme_end + 3;
    let rest = &uri[authority_start..];
    let authority_len = rest.find(['/', '?']).unwrap_or(rest.len());

    match rest[..authority_len].rfind('@') {
        Some(at) => format!(
            "{}***@{}",
            &uri[..authority_start],
            &rest[at + 1..]
        ),
        None => uri.to_string(),
    }
}
