// Embeddings module
// Handles the OpenAI-compatible embeddings API client

pub mod openai;

pub use openai::{DEFAULT_EMBEDDING_DIMENSION, ModelInfo, OpenAiClient};
