
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, EmbeddingConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Textvault Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding API Configuration").bold().yellow());
    eprintln!("Configure the embedding endpoint used for chunk ingestion.");
    eprintln!();

    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Gateway Configuration").bold().yellow());
    configure_gateway(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_embedding_connection(&config)? {
        eprintln!("{}", style("✓ Embedding API reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the embedding API").yellow()
        );
        eprintln!("You can continue, but ingestion will fail until the endpoint is reachable.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.validate().context("Configuration is invalid")?;
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());

        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.embedding.host).cyan());
    eprintln!("  Port: {}", style(config.embedding.port).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.embedding.embedding_dimension).cyan()
    );
    eprintln!(
        "  Batch Size: {}",
        style(config.embedding.batch_size).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Gateway Settings:").bold().yellow());
    eprintln!("  Listen: {}", style(config.gateway_addr()).cyan());
    eprintln!(
        "  Max connections: {}",
        style(config.gateway.max_connections).cyan()
    );

    eprintln!();
    match config.embedding_url() {
        Ok(url) => eprintln!("  Embedding URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Embedding URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load_default().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            let mut config = Config::default();
            config.base_dir = Config::config_dir()?;
            Ok(config)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let protocols = &["https", "http"];
    let default_index = protocols
        .iter()
        .position(|&p| p == embedding.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("API protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;
    embedding.protocol = protocols[protocol_index].to_string();

    embedding.host = Input::new()
        .with_prompt("API host")
        .default(embedding.host.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Host cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.port = Input::new()
        .with_prompt("API port")
        .default(embedding.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.model = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.embedding_dimension = Input::new()
        .with_prompt("Embedding dimension")
        .default(embedding.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    embedding.batch_size = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(())
}

fn configure_gateway(config: &mut Config) -> Result<()> {
    config.gateway.host = Input::new()
        .with_prompt("Gateway listen host")
        .default(config.gateway.host.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Host cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.gateway.port = Input::new()
        .with_prompt("Gateway listen port")
        .default(config.gateway.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(())
}

fn test_embedding_connection(config: &Config) -> Result<bool> {
    let url = format!(
        "{}://{}:{}/v1/models",
        config.embedding.protocol, config.embedding.host, config.embedding.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    let mut request = agent.get(&url);
    if let Ok(api_key) = config.embedding.resolve_api_key() {
        request = request.header("Authorization", &format!("Bearer {api_key}"));
    }

    match request.call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
