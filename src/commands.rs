use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::database::lancedb::ChunkStore;
use crate::embeddings::OpenAiClient;
use crate::gateway::GatewayServer;
use crate::ingest::Ingestor;

/// Embed the chunks in `path` and store them in `collection`.
///
/// This replaces whatever the collection previously held, including when the
/// input file yields no chunks.
#[inline]
pub async fn ingest_file(path: &Path, collection: &str) -> Result<()> {
    let config = Config::load_default()?;
    let chunks = read_chunks(path)?;

    info!(
        "Read {} chunks from {} for collection {}",
        chunks.len(),
        path.display(),
        collection
    );

    let stored = Ingestor::new(config).store(&chunks, collection).await?;
    println!("Stored {} chunks in collection '{}'", stored, collection);
    Ok(())
}

/// Print every chunk stored in `collection`
#[inline]
pub async fn dump_collection(collection: &str) -> Result<()> {
    let config = Config::load_default()?;
    let chunks = Ingestor::new(config).retrieve_all(collection).await?;

    if chunks.is_empty() {
        println!("Collection '{}' is empty.", collection);
        return Ok(());
    }

    println!("Collection '{}' ({} chunks):", collection, chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        println!();
        println!("--- chunk {} ---", i + 1);
        println!("{}", chunk);
    }
    Ok(())
}

/// Run the WebSocket gateway until interrupted
#[inline]
pub async fn serve_gateway() -> Result<()> {
    let config = Config::load_default()?;
    let server = GatewayServer::new(config.gateway.clone());
    let handle = server.start().await?;

    println!("Gateway listening on {}", handle.address());
    println!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for shutdown signal")?;
    info!("Shutdown signal received");

    handle.shutdown().await?;
    Ok(())
}

/// Show configuration, embedding API health, and collection counts
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load_default()?;

    println!("Embedding API:");
    match config.embedding_url() {
        Ok(url) => println!("  Endpoint: {}", url),
        Err(e) => println!("  Endpoint: invalid ({})", e),
    }
    println!(
        "  Model: {} ({} dimensions)",
        config.embedding.model, config.embedding.embedding_dimension
    );
    match OpenAiClient::new(&config) {
        // A short timeout keeps status responsive when the API is down
        Ok(client) => match client
            .with_timeout(std::time::Duration::from_secs(5))
            .health_check()
        {
            Ok(()) => println!("  Health: reachable, model available"),
            Err(e) => println!("  Health: unavailable ({:#})", e),
        },
        Err(e) => println!("  Health: client not configured ({:#})", e),
    }

    println!();
    println!("Vector store: {}", config.vector_db_path().display());
    let store = ChunkStore::new(&config).await?;
    let collections = store.list_collections().await?;
    if collections.is_empty() {
        println!("  No collections.");
    } else {
        for collection in &collections {
            let count = store.count_chunks(collection).await?;
            println!("  {}: {} chunks", collection, count);
        }
    }

    println!();
    println!("Gateway listen address: {}", config.gateway_addr());

    Ok(())
}

/// Read chunks from a file: a JSON array of strings for `.json` files,
/// otherwise blank-line-separated blocks of text.
fn read_chunks(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk file: {}", path.display()))?;

    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON chunk file: {}", path.display()))
    } else {
        Ok(content
            .split("\n\n")
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}
