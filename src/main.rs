//! soundscout - share what you listen to with people nearby
//!
//! Command-line front end for the SoundScout session, presence sync and
//! profile cache.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use soundscout::cli::commands::{Cli, Commands};
use soundscout::cli::{auth, config, likes, nearby, playlist, profile, settings, sync};
use soundscout::error::{Result, ScoutError};

#[tokio::main]
async fn main() {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        handle_error(e);
        std::process::exit(1);
    }
}

/// Print errors, with a hint for the ones that need a new sign-in
fn handle_error(e: ScoutError) {
    match &e {
        ScoutError::Unauthorized => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("  → Run 'soundscout auth logout' and then 'soundscout auth login'.");
        }
        ScoutError::AuthCancelled(_) => {
            eprintln!("{}", e);
        }
        _ => {
            eprintln!("Error: {}", e);
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Auth(args) => auth::handle_auth(args.command).await,
        Commands::Sync(args) => sync::handle_sync(args).await,
        Commands::Likes(args) => likes::handle_likes(args.command).await,
        Commands::Playlist(args) => playlist::handle_playlist(args.command).await,
        Commands::Settings(args) => settings::handle_settings(args.command).await,
        Commands::Profile(args) => profile::handle_profile(args.command).await,
        Commands::Nearby(args) => nearby::handle_nearby(args).await,
        // Config commands don't need a session
        Commands::Config(args) => config::handle_config(args.command),
    }
}
