//! Settings CLI command handlers

use crate::cli::commands::SettingsCommand;
use crate::cli::context::AppContext;
use crate::error::Result;

/// Handle settings commands
pub async fn handle_settings(command: SettingsCommand) -> Result<()> {
    let ctx = AppContext::load()?;
    let profiles = ctx.profiles()?;
    let user_id = ctx.user_id().await?;

    match command {
        SettingsCommand::Show => {
            let settings = profiles.profile(&user_id).await?.settings();
            println!("Settings:");
            println!("  Ghost mode: {}", on_off(settings.is_ghost_mode));
            println!("  Grid view:  {}", on_off(settings.is_grid_view));
        }
        SettingsCommand::Ghost { state } => {
            profiles.set_ghost_mode(&user_id, state.enabled()).await?;
            println!("Ghost mode {}.", on_off(state.enabled()));
            if state.enabled() {
                println!("  Your last shared location stays visible but will not move.");
            }
        }
        SettingsCommand::Grid { state } => {
            profiles.set_grid_view(&user_id, state.enabled()).await?;
            println!("Grid view {}.", on_off(state.enabled()));
        }
    }
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
