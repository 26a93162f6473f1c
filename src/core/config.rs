//! Application configuration management
//!
//! Handles loading and saving application settings including:
//! - OAuth client identity and redirect URI
//! - Remote endpoints (accounts, API, profile store)
//! - Sync cadence and request timeouts
//! - Local storage backend selection

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};
use crate::profile::model::Coordinates;

/// SoundScout's registered Spotify application
const DEFAULT_CLIENT_ID: &str = "6418fb58c7fe4f60bddd2d5a5a970888";

/// Custom URI scheme the consent screen redirects back to
const DEFAULT_REDIRECT_URI: &str = "soundscout://callback";

const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Overrides the directory holding `config.toml` and the file storage backend
pub const CONFIG_DIR_ENV: &str = "SOUNDSCOUT_CONFIG_DIR";

static GLOBAL: OnceCell<Config> = OnceCell::new();

/// Where sessions and the cached profile are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// System keyring (default)
    #[default]
    Keyring,
    /// JSON file in the config directory
    File,
}

impl StorageBackend {
    /// Get the config identifier
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Keyring => "keyring",
            StorageBackend::File => "file",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "keyring" => Some(StorageBackend::Keyring),
            "file" => Some(StorageBackend::File),
            _ => None,
        }
    }

    /// Get all available backends
    pub fn all() -> &'static [StorageBackend] {
        &[StorageBackend::Keyring, StorageBackend::File]
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OAuth client identifier
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Redirect URI registered with the provider
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Base URL of the accounts service (`/authorize`, `/api/token`)
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,

    /// Base URL of the Web API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the profile document store
    #[serde(default)]
    pub profile_store_url: Option<String>,

    /// Presence sync interval in seconds
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Timeout applied to every remote call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Local storage backend
    #[serde(default)]
    pub storage: StorageBackend,

    /// Radius separating nearby from distant listeners, in kilometers
    #[serde(default = "default_nearby_radius")]
    pub nearby_radius_km: f64,

    /// Fixed device location; location permission is treated as denied when unset
    #[serde(default)]
    pub location: Option<Coordinates>,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_accounts_url() -> String {
    DEFAULT_ACCOUNTS_URL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_sync_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

fn default_nearby_radius() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
            accounts_url: default_accounts_url(),
            api_url: default_api_url(),
            profile_store_url: None,
            sync_interval_secs: default_sync_interval(),
            request_timeout_secs: default_request_timeout(),
            storage: StorageBackend::default(),
            location: None,
            nearby_radius_km: default_nearby_radius(),
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Load the process-wide configuration exactly once
    ///
    /// Later calls return the instance loaded by the first call.
    pub fn global() -> Result<&'static Config> {
        GLOBAL.get_or_try_init(Self::load)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the configuration directory
    ///
    /// `SOUNDSCOUT_CONFIG_DIR` takes precedence over the platform default.
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }

        let project_dirs = ProjectDirs::from("com", "soundscout", "soundscout")
            .ok_or_else(|| ScoutError::Config("Could not determine config directory".into()))?;

        Ok(project_dirs.config_dir().to_path_buf())
    }

    /// Sync interval as a `Duration`
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Profile store URL, or an error explaining how to set it
    pub fn require_profile_store_url(&self) -> Result<&str> {
        self.profile_store_url.as_deref().ok_or_else(|| {
            ScoutError::Config(
                "No profile store configured.\n\n  → Run 'soundscout config set profile-store-url https://...'".into(),
            )
        })
    }

    /// Set the storage backend
    pub fn set_storage(&mut self, storage: StorageBackend) {
        self.storage = storage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!(
            StorageBackend::from_str("keyring"),
            Some(StorageBackend::Keyring)
        );
        assert_eq!(StorageBackend::from_str("file"), Some(StorageBackend::File));
        assert_eq!(StorageBackend::from_str("sqlite"), None);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.sync_interval_secs, 30);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.redirect_uri, "soundscout://callback");
        assert!(config.location.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            storage = "file"
            sync_interval_secs = 5

            [location]
            latitude = 43.07
            longitude = -89.40
            "#,
        )
        .unwrap();

        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.sync_interval(), Duration::from_secs(5));
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(config.location.unwrap().latitude, 43.07);
    }

    #[test]
    fn test_missing_profile_store_url() {
        let config = Config::default();
        assert!(matches!(
            config.require_profile_store_url(),
            Err(ScoutError::Config(_))
        ));
    }
}
