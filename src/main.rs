// ABOUTME: Entry point for the karaoke song service
// ABOUTME: Runs the HTTP server or talks to a running one from the terminal

mod client;
mod config;
mod error;
mod karaoke;
mod library;
mod server;
mod storage;

use crate::client::ApiClient;
use crate::config::Config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Karaoke player backend: song listing and presigned URLs for CDG/MP3 assets
#[derive(Debug, Parser)]
#[command(name = "karaoke", version = env!("CARGO_PKG_VERSION"), about)]
struct Flags {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the player UI and the song API (configured from the environment)
    Serve,
    /// Print the songs available on a running server
    Songs {
        /// Base URL of the karaoke server
        #[clap(long, env = "KARAOKE_SERVER", default_value = "http://localhost:8081")]
        server: String,
        /// Only show songs whose key contains this text (case-insensitive)
        #[clap(long)]
        search: Option<String>,
    },
    /// Download a song's assets for a CDG player
    Fetch {
        /// Song key, exactly as listed by `songs`
        key: String,
        #[clap(long, env = "KARAOKE_SERVER", default_value = "http://localhost:8081")]
        server: String,
        /// Directory the assets are written to
        #[clap(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("karaoke=info".parse()?),
        )
        .init();

    let flags = Flags::parse();

    match flags.command {
        Command::Serve => {
            let config = Config::from_env()?;
            server::run(config).await
        }
        Command::Songs { server, search } => {
            let catalog = ApiClient::new(&server).songs().await?;
            if catalog.is_empty() {
                println!("No songs found");
                return Ok(());
            }
            for song in karaoke::search(catalog.songs(), search.as_deref().unwrap_or("")) {
                println!("{}", song);
            }
            Ok(())
        }
        Command::Fetch { key, server, out } => {
            let client = ApiClient::new(&server);
            let catalog = client.songs().await?;
            let song = client.fetch_song(&catalog, &key).await?;
            for path in song.save(&out).await? {
                info!("Wrote {}", path.display());
            }
            println!("{} ready in {}", song.title(), out.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Flags::command().debug_assert();
    }

    #[test]
    fn test_fetch_arguments() {
        let flags = Flags::try_parse_from(["karaoke", "fetch", "ZIP/a.zip", "--out", "/tmp/songs"]).unwrap();
        match flags.command {
            Command::Fetch { key, out, .. } => {
                assert_eq!(key, "ZIP/a.zip");
                assert_eq!(out, PathBuf::from("/tmp/songs"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
