#[cfg(test)]
mod tests;

use super::ChunkRecord;
use crate::{Result, VaultError, config::Config};
use arrow::array::{FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase, Select},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Local persistent chunk store using LanceDB.
///
/// Each collection maps to one LanceDB table with a fixed schema of
/// (id, vector, text). The vector dimensionality is fixed by configuration
/// and shared by every collection in the store.
pub struct ChunkStore {
    connection: Connection,
    vector_dimension: usize,
}

impl ChunkStore {
    /// Open a handle to the local vector database under the configured base
    /// directory, creating the directory on first use.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let db_path = config.vector_db_path();
        debug!("Initializing LanceDB at path: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VaultError::Database(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());

        // Attempt to connect with corruption recovery
        let connection = match lancedb::connect(&uri).execute().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to connect to LanceDB: {}", e);

                let error_msg = e.to_string().to_lowercase();
                if error_msg.contains("corrupt")
                    || error_msg.contains("invalid")
                    || error_msg.contains("malformed")
                {
                    warn!("Database corruption detected, attempting recovery");
                    Self::attempt_corruption_recovery(&db_path)?;

                    lancedb::connect(&uri).execute().await.map_err(|e| {
                        VaultError::Database(format!(
                            "Failed to connect to LanceDB after recovery: {}",
                            e
                        ))
                    })?
                } else {
                    return Err(VaultError::Database(format!(
                        "Failed to connect to LanceDB: {}",
                        e
                    )));
                }
            }
        };

        Ok(Self {
            connection,
            vector_dimension: config.embedding.embedding_dimension as usize,
        })
    }

    /// Destructively (re)create a collection.
    ///
    /// Any previously stored points in the collection are discarded; callers
    /// rely on this for full-reindex semantics.
    #[inline]
    pub async fn reset_collection(&self, collection: &str) -> Result<()> {
        let table_names = self.connection.table_names().execute().await.map_err(|e| {
            VaultError::Database(format!("Failed to list collections: {}", e))
        })?;

        if table_names.iter().any(|name| name == collection) {
            info!("Dropping existing collection {}", collection);
            self.connection.drop_table(collection).await.map_err(|e| {
                VaultError::Database(format!("Failed to drop collection {}: {}", collection, e))
            })?;
        }

        let schema = self.create_schema();
        self.connection
            .create_empty_table(collection, schema)
            .execute()
            .await
            .map_err(|e| {
                VaultError::Database(format!(
                    "Failed to create collection {}: {}",
                    collection, e
                ))
            })?;

        info!(
            "Collection {} created with {} dimensions",
            collection, self.vector_dimension
        );
        Ok(())
    }

    /// List the names of all collections in the store
    #[inline]
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to list collections: {}", e)))
    }

    /// Insert a batch of chunk records into an existing collection in one call
    #[inline]
    pub async fn insert_chunks(&self, collection: &str, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            debug!("No chunks to store in {}", collection);
            return Ok(());
        }

        debug!("Storing batch of {} chunks in {}", records.len(), collection);

        let record_batch = self.create_record_batch(&records)?;

        let table = self
            .connection
            .open_table(collection)
            .execute()
            .await
            .map_err(|e| open_error(collection, e))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to insert chunks: {}", e)))?;

        info!("Stored {} chunks in collection {}", records.len(), collection);
        Ok(())
    }

    /// Retrieve the text of every stored point in a collection.
    ///
    /// Streams through the whole collection batch by batch; results come back
    /// in whatever order the store yields them. Vectors are not fetched.
    #[inline]
    pub async fn retrieve_all_texts(&self, collection: &str) -> Result<Vec<String>> {
        let table = self
            .connection
            .open_table(collection)
            .execute()
            .await
            .map_err(|e| open_error(collection, e))?;

        let mut results = table
            .query()
            .select(Select::Columns(vec!["id".to_string(), "text".to_string()]))
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to scan collection: {}", e)))?;

        let mut texts = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to read scan stream: {}", e)))?
        {
            texts.extend(extract_texts(&batch)?);
        }

        debug!(
            "Retrieved {} chunks from collection {}",
            texts.len(),
            collection
        );
        Ok(texts)
    }

    /// Get the number of stored points in a collection
    #[inline]
    pub async fn count_chunks(&self, collection: &str) -> Result<u64> {
        let table = self
            .connection
            .open_table(collection)
            .execute()
            .await
            .map_err(|e| open_error(collection, e))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| VaultError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.vector_dimension as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(&self, records: &[ChunkRecord]) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.vector_dimension);

        for record in records {
            if record.vector.len() != self.vector_dimension {
                return Err(VaultError::Database(format!(
                    "Vector dimension mismatch for chunk {}: expected {}, got {}",
                    record.id,
                    self.vector_dimension,
                    record.vector.len()
                )));
            }
            ids.push(record.id.as_str());
            texts.push(record.text.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let schema = self.create_schema();

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.vector_dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| VaultError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| VaultError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Attempt to recover from database corruption by moving the damaged
    /// directory aside so a fresh database can be created.
    fn attempt_corruption_recovery(db_path: &Path) -> Result<()> {
        warn!(
            "Attempting database corruption recovery at {}",
            db_path.display()
        );

        if db_path.exists() {
            let backup_path = db_path.with_extension("corrupted_backup");
            if let Err(e) = std::fs::rename(db_path, &backup_path) {
                error!("Failed to backup corrupted database: {}", e);
            } else {
                info!("Corrupted database backed up to {}", backup_path.display());
            }
        }

        if db_path.exists() {
            std::fs::remove_dir_all(db_path).map_err(|e| {
                VaultError::Database(format!("Failed to remove corrupted database: {}", e))
            })?;
        }

        info!("Database corruption recovery completed");
        Ok(())
    }
}

fn open_error(collection: &str, err: lancedb::Error) -> VaultError {
    match err {
        lancedb::Error::TableNotFound { .. } => {
            VaultError::CollectionNotFound(collection.to_string())
        }
        other => VaultError::Database(format!(
            "Failed to open collection {}: {}",
            collection, other
        )),
    }
}

fn extract_texts(batch: &RecordBatch) -> Result<Vec<String>> {
    let texts = batch
        .column_by_name("text")
        .ok_or_else(|| VaultError::Database("Missing text column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| VaultError::Database("Invalid text column type".to_string()))?;

    Ok((0..batch.num_rows())
        .map(|row| texts.value(row).to_string())
        .collect())
}
