//! Playlist CLI command handlers

use crate::cli::commands::PlaylistCommand;
use crate::cli::context::AppContext;
use crate::core::remote;
use crate::error::Result;

/// Handle playlist commands
pub async fn handle_playlist(command: PlaylistCommand) -> Result<()> {
    let ctx = AppContext::load()?;

    match command {
        PlaylistCommand::List => {
            let token = ctx.tokens.ensure_valid_token().await?;
            let playlists = remote::call(&ctx.policy, ctx.platform.playlists(&token)).await?;

            if playlists.is_empty() {
                println!("No playlists found.");
                return Ok(());
            }

            println!("{:<24} NAME", "ID");
            for playlist in playlists {
                println!("{:<24} {}", playlist.id, playlist.name);
            }
        }
        PlaylistCommand::Add { playlist_id, uri } => {
            let (uri, label) = match uri {
                Some(uri) => (uri.clone(), uri),
                None => {
                    let track = ctx.require_current_track().await?;
                    let label = format!("{} - {}", track.track_name, track.artist_name);
                    (track.uri, label)
                }
            };

            let token = ctx.tokens.ensure_valid_token().await?;
            remote::call(
                &ctx.policy,
                ctx.platform.add_to_playlist(&token, &playlist_id, &uri),
            )
            .await?;
            println!("✓ Added {} to playlist {}", label, playlist_id);
        }
    }
    Ok(())
}
