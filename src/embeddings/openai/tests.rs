use super::*;
use crate::config::EmbeddingConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(host: &str, port: u16) -> Config {
    Config {
        embedding: EmbeddingConfig {
            protocol: "http".to_string(),
            host: host.to_string(),
            port,
            model: "test-embedding-model".to_string(),
            batch_size: 2,
            embedding_dimension: 4,
            api_key: Some("sk-test".to_string()),
        },
        ..Config::default()
    }
}

#[test]
fn client_configuration() {
    let config = test_config("test-host", 1234);
    let client = OpenAiClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-embedding-model");
    assert_eq!(client.batch_size, 2);
    assert_eq!(client.expected_dimension, 4);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
}

#[test]
fn missing_api_key_rejected() {
    let mut config = test_config("test-host", 1234);
    config.embedding.api_key = None;
    // Guard against a key leaking in from the environment
    if std::env::var(crate::config::settings::API_KEY_ENV_VAR).is_err() {
        assert!(OpenAiClient::new(&config).is_err());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_batch_restores_input_order() {
    let server = MockServer::start().await;
    let addr = server.address();

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "test-embedding-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "object": "embedding", "index": 1, "embedding": [1.0, 1.0, 1.0, 1.0] },
                { "object": "embedding", "index": 0, "embedding": [0.0, 0.0, 0.0, 0.0] }
            ],
            "model": "test-embedding-model"
        })))
        .mount(&server)
        .await;

    let config = test_config(&addr.ip().to_string(), addr.port());
    let client = OpenAiClient::new(&config).expect("Failed to create client");

    let texts = vec!["first".to_string(), "second".to_string()];
    let vectors = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("embedding task should not panic")
        .expect("embedding should succeed");

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![0.0, 0.0, 0.0, 0.0]);
    assert_eq!(vectors[1], vec![1.0, 1.0, 1.0, 1.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_batch_rejects_count_mismatch() {
    let server = MockServer::start().await;
    let addr = server.address();

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3, 0.4] }
            ],
            "model": "test-embedding-model"
        })))
        .mount(&server)
        .await;

    let config = test_config(&addr.ip().to_string(), addr.port());
    let client = OpenAiClient::new(&config).expect("Failed to create client");

    let texts = vec!["first".to_string(), "second".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("embedding task should not panic");

    assert!(result.is_err(), "count mismatch should be an error");
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_batch_rejects_dimension_mismatch() {
    let server = MockServer::start().await;
    let addr = server.address();

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "object": "embedding", "index": 0, "embedding": [0.1, 0.2] }
            ],
            "model": "test-embedding-model"
        })))
        .mount(&server)
        .await;

    let config = test_config(&addr.ip().to_string(), addr.port());
    let client = OpenAiClient::new(&config).expect("Failed to create client");

    let texts = vec!["first".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("embedding task should not panic");

    assert!(result.is_err(), "dimension mismatch should be an error");
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_batch_fails_fast_on_server_error() {
    let server = MockServer::start().await;
    let addr = server.address();

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&addr.ip().to_string(), addr.port());
    let client = OpenAiClient::new(&config).expect("Failed to create client");

    let texts = vec!["first".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("embedding task should not panic");

    // Exactly one request: there is no retry on failure
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn list_models_parses_response() {
    let server = MockServer::start().await;
    let addr = server.address();

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "id": "test-embedding-model", "object": "model", "owned_by": "test" },
                { "id": "another-model", "object": "model" }
            ]
        })))
        .mount(&server)
        .await;

    let config = test_config(&addr.ip().to_string(), addr.port());
    let client = OpenAiClient::new(&config).expect("Failed to create client");

    let models = tokio::task::spawn_blocking(move || client.list_models())
        .await
        .expect("listing task should not panic")
        .expect("listing should succeed");

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "test-embedding-model");

    let config = test_config(&addr.ip().to_string(), addr.port());
    let client = OpenAiClient::new(&config).expect("Failed to create client");
    let result = tokio::task::spawn_blocking(move || client.validate_model())
        .await
        .expect("validation task should not panic");
    assert!(result.is_ok(), "configured model should be available");
}
