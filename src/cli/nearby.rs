//! Nearby listeners CLI command handler

use crate::cli::commands::NearbyArgs;
use crate::cli::context::AppContext;
use crate::error::{Result, ScoutError};
use crate::profile::model::{Coordinates, NearbyListener};

/// Handle the nearby command
pub async fn handle_nearby(args: NearbyArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let profiles = ctx.profiles()?;
    let user_id = ctx.user_id().await?;

    let origin = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
        _ => match ctx.config.location {
            Some(position) => position,
            None => profiles
                .profile(&user_id)
                .await?
                .presence
                .and_then(|presence| presence.location())
                .ok_or_else(|| {
                    ScoutError::InvalidInput(
                        "No location known.\n\n  → Pass --lat and --lon, or run 'soundscout config set location <lat>,<lon>'"
                            .to_string(),
                    )
                })?,
        },
    };
    let radius = args.radius.unwrap_or(ctx.config.nearby_radius_km);

    let hood = profiles.nearby_users(&user_id, origin, radius).await?;

    if hood.nearby.is_empty() {
        println!("No listeners within {} km.", radius);
    } else {
        println!("Within {} km:", radius);
        for listener in &hood.nearby {
            print_listener(listener);
        }
    }

    if !hood.distant.is_empty() {
        println!("\nFurther away:");
        for listener in &hood.distant {
            print_listener(listener);
        }
    }
    Ok(())
}

fn print_listener(listener: &NearbyListener) {
    let playing = listener
        .profile
        .presence
        .as_ref()
        .and_then(|presence| presence.now_playing())
        .map(|track| format!("{} - {}", track.track_name, track.artist_name))
        .unwrap_or_else(|| "nothing playing".to_string());

    println!(
        "  {:>7.2} km  {:<20} {}",
        listener.distance_km, listener.profile.username, playing
    );
}
