use super::*;
use crate::config::EmbeddingConfig;
use tempfile::TempDir;

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        embedding: EmbeddingConfig {
            embedding_dimension: 5,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    };
    (config, temp_dir)
}

fn create_test_chunk_record(id: &str, text: &str) -> ChunkRecord {
    let id_num: f32 = id.parse().unwrap_or(1.0);
    let vector = (0..5)
        .map(|i| id_num.mul_add(0.01, i as f32 * 0.001))
        .collect();

    ChunkRecord {
        id: id.to_string(),
        vector,
        text: text.to_string(),
    }
}

#[tokio::test]
async fn chunk_store_initialization() {
    let (config, _temp_dir) = create_test_config();

    let result = ChunkStore::new(&config).await;
    assert!(
        result.is_ok(),
        "Failed to initialize ChunkStore: {:?}",
        result.err()
    );

    let store = result.expect("should get result successfully");
    assert_eq!(store.vector_dimension, 5);
}

#[tokio::test]
async fn reset_creates_empty_collection() {
    let (config, _temp_dir) = create_test_config();
    let store = ChunkStore::new(&config)
        .await
        .expect("should create chunk store");

    store
        .reset_collection("documents")
        .await
        .expect("should create collection");

    let count = store
        .count_chunks("documents")
        .await
        .expect("should count chunks successfully");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn store_and_retrieve_chunks() {
    let (config, _temp_dir) = create_test_config();
    let store = ChunkStore::new(&config)
        .await
        .expect("should create chunk store");

    store
        .reset_collection("documents")
        .await
        .expect("should create collection");

    let records = vec![
        create_test_chunk_record("1", "first chunk"),
        create_test_chunk_record("2", "second chunk"),
        create_test_chunk_record("3", "third chunk"),
    ];

    store
        .insert_chunks("documents", records)
        .await
        .expect("should store chunks successfully");

    let count = store
        .count_chunks("documents")
        .await
        .expect("should count chunks successfully");
    assert_eq!(count, 3);

    let mut texts = store
        .retrieve_all_texts("documents")
        .await
        .expect("should retrieve chunks successfully");
    texts.sort();
    assert_eq!(texts, vec!["first chunk", "second chunk", "third chunk"]);
}

#[tokio::test]
async fn reset_discards_previous_contents() {
    let (config, _temp_dir) = create_test_config();
    let store = ChunkStore::new(&config)
        .await
        .expect("should create chunk store");

    store
        .reset_collection("documents")
        .await
        .expect("should create collection");
    store
        .insert_chunks(
            "documents",
            vec![create_test_chunk_record("1", "old chunk")],
        )
        .await
        .expect("should store chunks successfully");

    store
        .reset_collection("documents")
        .await
        .expect("should recreate collection");

    let count = store
        .count_chunks("documents")
        .await
        .expect("should count chunks successfully");
    assert_eq!(count, 0, "reset should discard previous contents");
}

#[tokio::test]
async fn retrieve_from_missing_collection_is_not_found() {
    let (config, _temp_dir) = create_test_config();
    let store = ChunkStore::new(&config)
        .await
        .expect("should create chunk store");

    let result = store.retrieve_all_texts("nonexistent").await;
    assert!(matches!(
        result,
        Err(VaultError::CollectionNotFound(ref name)) if name == "nonexistent"
    ));
}

#[tokio::test]
async fn empty_batch_handling() {
    let (config, _temp_dir) = create_test_config();
    let store = ChunkStore::new(&config)
        .await
        .expect("should create chunk store");

    store
        .reset_collection("documents")
        .await
        .expect("should create collection");

    let result = store.insert_chunks("documents", vec![]).await;
    assert!(result.is_ok(), "Should handle empty batch gracefully");

    let count = store
        .count_chunks("documents")
        .await
        .expect("should count chunks successfully");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn dimension_mismatch_rejected() {
    let (config, _temp_dir) = create_test_config();
    let store = ChunkStore::new(&config)
        .await
        .expect("should create chunk store");

    store
        .reset_collection("documents")
        .await
        .expect("should create collection");

    let record = ChunkRecord {
        id: "1".to_string(),
        vector: vec![0.1, 0.2],
        text: "short vector".to_string(),
    };

    let result = store.insert_chunks("documents", vec![record]).await;
    assert!(result.is_err(), "wrong-dimension vector should be rejected");
}

#[tokio::test]
async fn collections_are_independent() {
    let (config, _temp_dir) = create_test_config();
    let store = ChunkStore::new(&config)
        .await
        .expect("should create chunk store");

    store
        .reset_collection("alpha")
        .await
        .expect("should create collection");
    store
        .reset_collection("beta")
        .await
        .expect("should create collection");

    store
        .insert_chunks("alpha", vec![create_test_chunk_record("1", "alpha chunk")])
        .await
        .expect("should store chunks successfully");

    // Resetting beta must not touch alpha
    store
        .reset_collection("beta")
        .await
        .expect("should recreate collection");

    let alpha_count = store
        .count_chunks("alpha")
        .await
        .expect("should count chunks successfully");
    assert_eq!(alpha_count, 1);

    let collections = store
        .list_collections()
        .await
        .expect("should list collections");
    assert!(collections.contains(&"alpha".to_string()));
    assert!(collections.contains(&"beta".to_string()));
}
