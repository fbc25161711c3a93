//! MongoDB client and collection wrapper

use bson::{doc, Bson, Document};
use std::collections::HashMap;
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, ClientSession, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::types::HomegateError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Filter that hides soft-deleted documents
fn live(filter: Document) -> Document {
    let mut full_filter = filter;
    full_filter.insert("metadata.is_deleted", doc! { "$ne": true });
    full_filter
}

/// `{_id: <string>, count: <int>}` row of a `$group` stage
fn group_count(group: &Document) -> Option<(String, u64)> {
    let key = group.get_str("_id").ok()?.to_string();
    let count = match group.get("count")? {
        Bson::Int32(n) => u64::try_from(*n).ok()?,
        Bson::Int64(n) => u64::try_from(*n).ok()?,
        _ => return None,
    };
    Some((key, count))
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, HomegateError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast on an unreachable server instead of hanging requests
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| HomegateError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| HomegateError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, HomegateError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Start a session for a multi-document transaction.
    /// Transactions require a replica set or sharded cluster.
    pub async fn start_session(&self) -> Result<ClientSession, HomegateError> {
        self.client
            .start_session()
            .await
            .map_err(|e| HomegateError::Database(format!("Failed to start session: {}", e)))
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, HomegateError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), HomegateError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| HomegateError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, HomegateError> {
        self.inner
            .find_one(live(filter))
            .await
            .map_err(|e| HomegateError::Database(format!("Find failed: {}", e)))
    }

    /// Find all live documents matching a filter.
    ///
    /// A document that fails to decode fails the whole read.
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, HomegateError> {
        use futures_util::TryStreamExt;

        let cursor = self
            .inner
            .find(live(filter))
            .await
            .map_err(|e| HomegateError::Database(format!("Find failed: {}", e)))?;

        cursor.try_collect().await.map_err(|e| {
            error!("Error reading document: {}", e);
            HomegateError::Database(format!("Cursor read failed: {}", e))
        })
    }

    /// Find all live documents matching a filter, ordered by `sort`
    pub async fn find_sorted(
        &self,
        filter: Document,
        sort: Document,
    ) -> Result<Vec<T>, HomegateError> {
        use futures_util::TryStreamExt;

        let cursor = self
            .inner
            .find(live(filter))
            .sort(sort)
            .await
            .map_err(|e| HomegateError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| HomegateError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Number of live documents per distinct string value of `field`
    pub async fn count_by(&self, field: &str) -> Result<HashMap<String, u64>, HomegateError> {
        use futures_util::TryStreamExt;

        let pipeline = vec![
            doc! { "$match": live(doc! { field: { "$type": "string" } }) },
            doc! { "$group": { "_id": format!("${}", field), "count": { "$sum": 1 } } },
        ];

        let cursor = self
            .inner
            .aggregate(pipeline)
            .await
            .map_err(|e| HomegateError::Database(format!("Aggregate failed: {}", e)))?;
        let groups: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| HomegateError::Database(format!("Cursor read failed: {}", e)))?;

        Ok(groups.iter().filter_map(group_count).collect())
    }

    /// Count live documents
    pub async fn count(&self, filter: Document) -> Result<u64, HomegateError> {
        self.inner
            .count_documents(live(filter))
            .await
            .map_err(|e| HomegateError::Database(format!("Count failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, HomegateError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| HomegateError::Database(format!("Update failed: {}", e)))
    }

    /// Permanently remove one document. Returns whether one was removed.
    pub async fn delete_one(&self, filter: Document) -> Result<bool, HomegateError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| HomegateError::Database(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count > 0)
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_count_reads_int_widths() {
        assert_eq!(
            group_count(&doc! { "_id": "u1", "count": 3_i32 }),
            Some(("u1".to_string(), 3))
        );
        assert_eq!(
            group_count(&doc! { "_id": "u2", "count": 7_i64 }),
            Some(("u2".to_string(), 7))
        );
        assert_eq!(group_count(&doc! { "_id": null, "count": 1_i32 }), None);
    }

    #[test]
    fn test_live_filter_excludes_soft_deleted() {
        let filter = live(doc! { "home_id": "h1" });
        assert_eq!(filter.get_str("home_id").unwrap(), "h1");
        assert_eq!(
            filter.get_document("metadata.is_deleted").unwrap(),
            &doc! { "$ne": true }
        );
    }
}
