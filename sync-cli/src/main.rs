use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sync::{SftpTransport, SyncConfig, CONFIG_FILENAME};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "ftpsync")]
#[command(about = "Lazy directory synchronization over SFTP", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a template configuration file in the current directory
    Init,
    /// Push local files to the remote tree
    Upload,
    /// Pull remote files into the local tree
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => match SyncConfig::write_template(CONFIG_FILENAME).await {
            Ok(()) => {
                println!("✅ Wrote {CONFIG_FILENAME}, edit it before the first sync");
                Ok(())
            }
            Err(e) => {
                println!("❌ Could not write {CONFIG_FILENAME}: {e}");
                std::process::exit(1);
            }
        },
        Commands::Upload => {
            let (config, transport) = connect().await?;
            info!("Uploading {} -> {}", config.local_base, config.remote_base);
            if let Err(e) = sync::push(&config, transport).await {
                println!("❌ Upload failed: {e}");
                std::process::exit(1);
            }
            println!("✅ Upload finished");
            Ok(())
        }
        Commands::Download => {
            let (config, transport) = connect().await?;
            info!("Downloading {} -> {}", config.remote_base, config.local_base);
            if let Err(e) = sync::pull(&config, transport).await {
                println!("❌ Download failed: {e}");
                std::process::exit(1);
            }
            println!("✅ Download finished");
            Ok(())
        }
    }
}

async fn connect() -> Result<(SyncConfig, Arc<SftpTransport>)> {
    let config = match SyncConfig::load(CONFIG_FILENAME).await {
        Ok(config) => config,
        Err(e) => {
            println!("❌ {e}");
            println!("   Run `ftpsync init` to create a starter {CONFIG_FILENAME}");
            std::process::exit(1);
        }
    };
    let transport = match SftpTransport::connect(&config).await {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            println!("❌ Could not connect to {}: {e}", config.host);
            std::process::exit(1);
        }
    };
    Ok((config, transport))
}
