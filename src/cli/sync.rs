//! Presence sync CLI command handler

use std::sync::Arc;
use std::time::Duration;

use crate::cli::commands::SyncArgs;
use crate::cli::context::AppContext;
use crate::error::{Result, ScoutError};
use crate::profile::model::PresenceSnapshot;
use crate::sync::location::FixedLocation;
use crate::sync::presence::{PresenceSyncer, SyncEvent, SyncServices};

/// Handle the sync command
pub async fn handle_sync(args: SyncArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let profiles = ctx.profiles()?;
    let user_id = ctx.user_id().await?;

    // Loads the profile and fails early if the user never signed up
    let profile = profiles.profile(&user_id).await?;
    if profile.is_ghost_mode {
        println!("Ghost mode is on: your location will not be updated.");
    }

    let period = args
        .interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| ctx.config.sync_interval());

    let services = SyncServices {
        tokens: ctx.tokens.clone(),
        platform: ctx.platform.clone(),
        profiles,
        location: Arc::new(FixedLocation::from_config(&ctx.config)),
        policy: ctx.policy.clone(),
    };

    let (mut syncer, mut events) = PresenceSyncer::new(user_id, services, period);
    syncer.start();

    if !args.once {
        println!("Syncing presence every {}s. Press Ctrl-C to stop.", period.as_secs());
    }

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            event = events.recv() => match event {
                Some(SyncEvent::Published(snapshot)) => {
                    print_snapshot(&snapshot);
                    if args.once {
                        break Ok(());
                    }
                }
                Some(SyncEvent::PermissionDenied) => {
                    println!("Location unavailable; sharing track only.");
                    println!("  → Set one with: soundscout config set location <lat>,<lon>");
                }
                Some(SyncEvent::Error(message)) => {
                    eprintln!("Sync failed: {}", message);
                    if args.once {
                        break Err(ScoutError::Network(message));
                    }
                }
                Some(SyncEvent::ReauthRequired) => break Err(ScoutError::NotAuthenticated),
                Some(SyncEvent::Stopped) | None => break Ok(()),
            },
        }
    };

    syncer.stop().await;
    if outcome.is_ok() && !args.once {
        println!("\nStopped.");
    }
    outcome
}

fn print_snapshot(snapshot: &PresenceSnapshot) {
    let time = snapshot.last_updated.format("%H:%M:%S");
    match snapshot.now_playing() {
        Some(track) => println!("[{}] ♪ {} - {}", time, track.track_name, track.artist_name),
        None => println!("[{}] Nothing playing", time),
    }
}
