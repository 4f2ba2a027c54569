// Ingestion/retrieval adapter
// Glues the embedding client and the chunk store together

use crate::config::Config;
use crate::database::lancedb::{ChunkRecord, ChunkStore};
use crate::embeddings::OpenAiClient;
use crate::{Result, VaultError};
use tracing::info;
use uuid::Uuid;

/// Collection used when the caller does not name one
pub const DEFAULT_COLLECTION: &str = "documents";

pub struct Ingestor {
    config: Config,
}

impl Ingestor {
    #[inline]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Embed `chunks` and store them in `collection`, replacing whatever the
    /// collection previously held.
    ///
    /// The collection is reset up front, so an empty input leaves an empty
    /// collection behind even if it previously had contents. Returns the
    /// number of points stored. Any embedding or storage failure propagates
    /// to the caller; there is no retry and no partial success. Nothing is
    /// written until the embedding step has completed for every chunk.
    #[inline]
    pub async fn store(&self, chunks: &[String], collection: &str) -> Result<usize> {
        info!(
            "Ingesting {} chunks into collection {}",
            chunks.len(),
            collection
        );

        // The store handle is opened per call rather than held open.
        let store = ChunkStore::new(&self.config).await?;

        // Full-reindex semantics: every store call replaces the collection.
        store.reset_collection(collection).await?;

        if chunks.is_empty() {
            return Ok(0);
        }

        let client = OpenAiClient::new(&self.config)
            .map_err(|e| VaultError::Embedding(format!("{:#}", e)))?;
        let vectors = client
            .embed_batch(chunks)
            .map_err(|e| VaultError::Embedding(format!("{:#}", e)))?;

        let records: Vec<ChunkRecord> = vectors
            .into_iter()
            .zip(chunks.iter())
            .map(|(vector, chunk)| ChunkRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                text: chunk.clone(),
            })
            .collect();

        let stored = records.len();
        store.insert_chunks(collection, records).await?;

        info!("Stored {} chunks in collection {}", stored, collection);
        Ok(stored)
    }

    /// Retrieve the text of every stored point in `collection`.
    ///
    /// Order follows whatever the underlying scan yields. A missing
    /// collection is reported as [`VaultError::CollectionNotFound`], not as
    /// an empty result.
    #[inline]
    pub async fn retrieve_all(&self, collection: &str) -> Result<Vec<String>> {
        let store = ChunkStore::new(&self.config).await?;
        store.retrieve_all_texts(collection).await
    }
}
