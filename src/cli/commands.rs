//! CLI command definitions using clap
//!
//! Defines the command structure for the `soundscout` CLI tool.

use clap::{Parser, Subcommand, ValueEnum};

/// soundscout - share what you listen to with people nearby
///
/// Signs in to Spotify, publishes your current track and location to your
/// SoundScout profile, and shows what listeners around you are playing.
#[derive(Parser, Debug)]
#[command(name = "soundscout", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in to Spotify and manage the session
    Auth(AuthArgs),

    /// Publish presence until interrupted
    Sync(SyncArgs),

    /// Manage liked songs
    Likes(LikesArgs),

    /// List playlists and add tracks to them
    Playlist(PlaylistArgs),

    /// Show or change profile settings
    Settings(SettingsArgs),

    /// Show or edit your profile
    Profile(ProfileArgs),

    /// Show what listeners around you are playing
    Nearby(NearbyArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication commands
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in with Spotify
    Login {
        /// Print the consent URL without opening a browser
        #[arg(long)]
        no_browser: bool,

        /// Exit after printing the URL; finish later with 'auth complete'
        #[arg(long)]
        no_wait: bool,
    },
    /// Finish a sign-in started with 'auth login --no-wait'
    Complete {
        /// The URL the consent screen redirected to
        callback_url: String,
    },
    /// Sign out and remove the stored session
    Logout,
    /// Show current authentication status
    Status,
    /// Delete your SoundScout profile and sign out
    DeleteAccount {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Presence sync options
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Seconds between updates (defaults to the configured interval)
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Publish a single update and exit
    #[arg(long)]
    pub once: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Likes Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Liked songs commands
#[derive(Parser, Debug)]
pub struct LikesArgs {
    #[command(subcommand)]
    pub command: LikesCommand,
}

#[derive(Subcommand, Debug)]
pub enum LikesCommand {
    /// List liked songs
    List,

    /// Like a song (defaults to the track playing now)
    Add {
        /// Track URI, e.g. spotify:track:...
        uri: Option<String>,
    },

    /// Unlike a song
    Remove {
        /// Track URI
        uri: String,
    },

    /// Check whether a song is liked
    Check {
        /// Track URI
        uri: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Playlist Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Playlist commands
#[derive(Parser, Debug)]
pub struct PlaylistArgs {
    #[command(subcommand)]
    pub command: PlaylistCommand,
}

#[derive(Subcommand, Debug)]
pub enum PlaylistCommand {
    /// List your playlists
    List,

    /// Add a track to a playlist
    Add {
        /// Playlist ID
        playlist_id: String,

        /// Track URI (defaults to the track playing now)
        #[arg(long)]
        uri: Option<String>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Settings commands
#[derive(Parser, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Show current settings
    Show,

    /// Hide your location from other listeners
    Ghost {
        /// on or off
        state: Toggle,
    },

    /// Prefer the grid layout over the map
    Grid {
        /// on or off
        state: Toggle,
    },
}

/// On/off switch argument
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Profile commands
#[derive(Parser, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Show your profile
    Show,

    /// Change your display name
    Rename {
        /// New display name
        name: String,
    },

    /// Change your profile picture
    Picture {
        /// Image URL
        url: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Nearby Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Nearby listener options
#[derive(Parser, Debug)]
pub struct NearbyArgs {
    /// Radius in kilometers (defaults to the configured radius)
    #[arg(long, short)]
    pub radius: Option<f64>,

    /// Latitude to search from (defaults to your last published position)
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude to search from
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lon: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration commands
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        /// Configuration key
        key: ConfigKey,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: ConfigKey,
    },

    /// Reset a configuration value to its default
    Remove {
        /// Configuration key
        key: ConfigKey,
    },

    /// Print the configuration file path
    Path,
}

/// Available configuration keys
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ConfigKey {
    /// Spotify application client ID
    #[value(name = "client-id")]
    ClientId,

    /// Redirect URI registered with Spotify
    #[value(name = "redirect-uri")]
    RedirectUri,

    /// Base URL of the profile document store
    #[value(name = "profile-store-url")]
    ProfileStoreUrl,

    /// Seconds between presence updates
    #[value(name = "sync-interval")]
    SyncInterval,

    /// Seconds before a remote call times out
    #[value(name = "request-timeout")]
    RequestTimeout,

    /// Local storage backend (keyring or file)
    #[value(name = "storage")]
    Storage,

    /// Fixed device location as "lat,lon"
    #[value(name = "location")]
    Location,

    /// Radius for nearby listeners in kilometers
    #[value(name = "nearby-radius")]
    NearbyRadius,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "soundscout", "nearby", "--lat", "43.07", "--lon", "-89.40",
        ])
        .unwrap();
        match cli.command {
            Commands::Nearby(args) => {
                assert_eq!(args.lat, Some(43.07));
                assert_eq!(args.lon, Some(-89.40));
                assert_eq!(args.radius, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_toggle() {
        let cli = Cli::try_parse_from(["soundscout", "settings", "ghost", "on"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Settings(SettingsArgs {
                command: SettingsCommand::Ghost { state: Toggle::On }
            })
        ));
        assert!(Cli::try_parse_from(["soundscout", "settings", "ghost", "maybe"]).is_err());
    }
}
