use clap::{Parser, Subcommand};
use std::path::PathBuf;
use textvault::Result;
use textvault::commands::{dump_collection, ingest_file, serve_gateway, show_status};
use textvault::config::{run_interactive_config, show_config};
use textvault::ingest::DEFAULT_COLLECTION;

#[derive(Parser)]
#[command(name = "textvault")]
#[command(about = "Text chunk storage in a local vector database with a WebSocket gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure embedding API and gateway settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed chunks from a file and store them, replacing the collection's previous contents
    Ingest {
        /// File of chunks: a JSON array of strings, or blank-line-separated text
        file: PathBuf,
        /// Collection to store into
        #[arg(long, default_value = DEFAULT_COLLECTION)]
        collection: String,
    },
    /// Print every chunk stored in a collection
    Dump {
        /// Collection to read from
        #[arg(long, default_value = DEFAULT_COLLECTION)]
        collection: String,
    },
    /// Start the WebSocket gateway server
    Serve,
    /// Show configuration, embedding API health, and collection counts
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { file, collection } => {
            ingest_file(&file, &collection).await?;
        }
        Commands::Dump { collection } => {
            dump_collection(&collection).await?;
        }
        Commands::Serve => {
            serve_gateway().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["textvault", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn ingest_command_default_collection() {
        let cli = Cli::try_parse_from(["textvault", "ingest", "chunks.json"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { file, collection } = parsed.command {
                assert_eq!(file, PathBuf::from("chunks.json"));
                assert_eq!(collection, DEFAULT_COLLECTION);
            }
        }
    }

    #[test]
    fn ingest_command_with_collection() {
        let cli = Cli::try_parse_from([
            "textvault",
            "ingest",
            "chunks.txt",
            "--collection",
            "notes",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { collection, .. } = parsed.command {
                assert_eq!(collection, "notes");
            }
        }
    }

    #[test]
    fn dump_command_with_collection() {
        let cli = Cli::try_parse_from(["textvault", "dump", "--collection", "notes"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Dump { collection } = parsed.command {
                assert_eq!(collection, "notes");
            }
        }
    }

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["textvault", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Serve);
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["textvault", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["textvault", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["textvault", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
