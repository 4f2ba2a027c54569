// LanceDB vector database module
// Handles chunk storage and retrieval for embeddings

pub mod chunk_store;

pub use chunk_store::ChunkStore;

use serde::{Deserialize, Serialize};

/// One stored point in a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier, assigned at store time
    pub id: String,
    /// The embedding vector (3072 dimensions for text-embedding-3-large)
    pub vector: Vec<f32>,
    /// The original chunk text
    pub text: String,
}
