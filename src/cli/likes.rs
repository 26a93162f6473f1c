//! Liked songs CLI command handlers

use crate::cli::commands::LikesCommand;
use crate::cli::context::AppContext;
use crate::error::Result;
use crate::profile::model::LikedSong;

/// Handle liked songs commands
pub async fn handle_likes(command: LikesCommand) -> Result<()> {
    let ctx = AppContext::load()?;
    let profiles = ctx.profiles()?;
    let user_id = ctx.user_id().await?;

    match command {
        LikesCommand::List => {
            let songs = profiles.liked_songs(&user_id).await?;
            if songs.is_empty() {
                println!("No liked songs yet.");
                return Ok(());
            }

            println!("Liked songs ({}):", songs.len());
            for song in songs.iter() {
                if song.track_name.is_empty() {
                    println!("  {}", song.uri);
                } else {
                    println!("  {} - {}  ({})", song.track_name, song.artist_name, song.uri);
                }
            }
        }
        LikesCommand::Add { uri } => {
            let song = match uri {
                Some(uri) => LikedSong {
                    uri,
                    track_name: String::new(),
                    artist_name: String::new(),
                    album_cover_url: None,
                },
                None => LikedSong::from(&ctx.require_current_track().await?),
            };
            let label = describe(&song);

            if profiles.add_song_to_likes(&user_id, song).await? {
                println!("✓ Liked {}", label);
            } else {
                println!("{} is already liked.", label);
            }
        }
        LikesCommand::Remove { uri } => {
            if profiles.remove_song_from_likes(&user_id, &uri).await? {
                println!("✓ Removed {} from liked songs.", uri);
            } else {
                println!("{} is not in your liked songs.", uri);
            }
        }
        LikesCommand::Check { uri } => {
            if profiles.is_song_liked(&user_id, &uri).await? {
                println!("Liked");
            } else {
                println!("Not liked");
            }
        }
    }
    Ok(())
}

fn describe(song: &LikedSong) -> String {
    if song.track_name.is_empty() {
        song.uri.clone()
    } else {
        format!("{} - {}", song.track_name, song.artist_name)
    }
}
