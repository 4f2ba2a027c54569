// Database module
// Handles the LanceDB-backed local vector store

pub mod lancedb;

pub use lancedb::*;
