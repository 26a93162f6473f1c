//! Authentication CLI command handlers

use std::io::{self, Write};

use chrono::Utc;

use crate::cli::commands::AuthCommand;
use crate::cli::context::AppContext;
use crate::core::session::{mask_token, Session};
use crate::core::token_manager::ACCESS_TOKEN_ENV;
use crate::error::{Result, ScoutError};
use crate::spotify::auth::REQUIRED_SCOPE;

/// Handle authentication commands
pub async fn handle_auth(command: AuthCommand) -> Result<()> {
    let ctx = AppContext::load()?;
    match command {
        AuthCommand::Login {
            no_browser,
            no_wait,
        } => handle_login(&ctx, no_browser, no_wait).await,
        AuthCommand::Complete { callback_url } => handle_complete(&ctx, &callback_url).await,
        AuthCommand::Logout => handle_logout(&ctx).await,
        AuthCommand::Status => handle_status(&ctx).await,
        AuthCommand::DeleteAccount { yes } => handle_delete_account(&ctx, yes).await,
    }
}

/// Handle the login command using Authorization Code with PKCE
async fn handle_login(ctx: &AppContext, no_browser: bool, no_wait: bool) -> Result<()> {
    // Check if already authenticated
    if ctx.store.has_session().await? {
        println!("✓ Already signed in to Spotify.");
        println!();
        println!("  To sign in again, first run: soundscout auth logout");
        return Ok(());
    }

    println!("Starting Spotify sign-in...\n");

    let auth = ctx.pkce_auth();
    let request = auth.begin_auth().await?;

    // Always show the URL
    println!("Open this URL in your browser:");
    println!("  {}", request.url);
    println!();

    if !no_browser && auth.open_consent(&request) {
        println!("✓ Browser opened automatically.");
        println!();
    }

    if no_wait {
        println!("After approving, run:");
        println!("  soundscout auth complete '<redirect URL>'");
        return Ok(());
    }

    println!("After approving, your browser is sent to {}...", ctx.config.redirect_uri);
    print!("Paste that full URL here: ");
    io::stdout().flush()?;

    let mut callback = String::new();
    io::stdin().read_line(&mut callback)?;
    let callback = callback.trim();
    if callback.is_empty() {
        return Err(ScoutError::InvalidInput("No redirect URL provided".to_string()));
    }

    let session = auth.complete_from_callback(callback, &request).await?;
    finish_sign_in(ctx, &session).await
}

/// Handle the second half of a detached login
async fn handle_complete(ctx: &AppContext, callback_url: &str) -> Result<()> {
    let session = ctx.pkce_auth().complete_pending(callback_url).await?;
    finish_sign_in(ctx, &session).await
}

/// Create the profile document on first sign-in
async fn finish_sign_in(ctx: &AppContext, session: &Session) -> Result<()> {
    println!("\n✓ Signed in to Spotify as {}", session.user_id);

    let profiles = match ctx.profiles() {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::debug!("Skipping sign-up: {}", e);
            println!("  No profile store configured; skipping profile setup.");
            return Ok(());
        }
    };

    let user = ctx.current_user().await?;
    let sign_up = profiles.sign_up(&user).await?;
    if sign_up.created {
        println!("✓ Welcome to SoundScout, {}!", sign_up.profile.username);
    } else {
        println!("✓ Welcome back, {}!", sign_up.profile.username);
    }
    Ok(())
}

/// Handle the logout command
async fn handle_logout(ctx: &AppContext) -> Result<()> {
    if !ctx.store.has_session().await? {
        println!("Not currently signed in.");
        return Ok(());
    }

    ctx.store.clear().await?;
    println!("Successfully signed out.");
    Ok(())
}

/// Handle the status command
async fn handle_status(ctx: &AppContext) -> Result<()> {
    println!("Authentication Status:");
    println!("  Storage: {}", ctx.config.storage);

    if ctx.tokens.uses_env_token() {
        println!("  Spotify: Using {} (no refresh)", ACCESS_TOKEN_ENV);
        return Ok(());
    }

    let Some(session) = ctx.store.session().await? else {
        println!("  Spotify: Not signed in");
        return Ok(());
    };

    println!("  Spotify: Signed in as {}", session.user_id);
    println!("\n  Access token: {}", mask_token(&session.access_token));

    match session.expires_at {
        Some(expires_at) => {
            let expires_in = expires_at.signed_duration_since(Utc::now());
            if expires_in.num_seconds() > 0 {
                println!("  Token expires in: {}m", expires_in.num_minutes());
            } else {
                println!("  Token expired (will auto-refresh on next API call)");
            }
        }
        None => println!("  Token expiry: unknown"),
    }

    if !session.can_refresh() {
        println!("  No refresh token stored (sign-in required when the token expires)");
    }
    if !session.has_scope(REQUIRED_SCOPE) {
        println!("  Missing permission '{}'; sign in again", REQUIRED_SCOPE);
    }

    Ok(())
}

/// Handle account deletion
async fn handle_delete_account(ctx: &AppContext, yes: bool) -> Result<()> {
    let profiles = ctx.profiles()?;
    let user_id = ctx.user_id().await?;

    if !yes {
        print!(
            "Delete the SoundScout profile of '{}'? This cannot be undone. [y/N] ",
            user_id
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let choice = input.trim().to_lowercase();
        if choice != "y" && choice != "yes" {
            println!("Cancelled.");
            return Ok(());
        }
    }

    profiles.delete_account(&user_id, &ctx.store).await?;
    println!("✓ Profile deleted and signed out.");
    Ok(())
}
