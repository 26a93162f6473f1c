//! Profile CLI command handlers

use crate::cli::commands::ProfileCommand;
use crate::cli::context::AppContext;
use crate::error::Result;

/// Handle profile commands
pub async fn handle_profile(command: ProfileCommand) -> Result<()> {
    let ctx = AppContext::load()?;
    let profiles = ctx.profiles()?;
    let user_id = ctx.user_id().await?;

    match command {
        ProfileCommand::Show => {
            let profile = profiles.refresh_profile(&user_id).await?;
            println!("{} ({})", profile.username, profile.id);
            if let Some(url) = &profile.profile_pic_url {
                println!("  Picture:     {}", url);
            }
            println!("  Liked songs: {}", profile.liked_songs.len());

            match &profile.presence {
                Some(presence) => {
                    match presence.now_playing() {
                        Some(track) => {
                            println!("  Playing:     {} - {}", track.track_name, track.artist_name)
                        }
                        None => println!("  Playing:     nothing"),
                    }
                    if let Some(position) = presence.location() {
                        println!(
                            "  Location:    {:.4}, {:.4}",
                            position.latitude, position.longitude
                        );
                    }
                    println!(
                        "  Updated:     {}",
                        presence.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                None => println!("  Presence:    never shared"),
            }
        }
        ProfileCommand::Rename { name } => {
            profiles.update_username(&user_id, &name).await?;
            println!("✓ Display name changed to {}", name.trim());
        }
        ProfileCommand::Picture { url } => {
            profiles.update_profile_pic(&user_id, &url).await?;
            println!("✓ Profile picture updated.");
        }
    }
    Ok(())
}
