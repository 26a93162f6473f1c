//! Custom error types for soundscout
//!
//! User-friendly error messages for all failure scenarios.

use thiserror::Error;

/// Main error type for the soundscout application
#[derive(Error, Debug)]
pub enum ScoutError {
    /// User aborted the consent screen (or the provider returned an `error` parameter)
    #[error("Spotify sign-in was cancelled ({0}).\n\n  → Run 'soundscout auth login' to try again.")]
    AuthCancelled(String),

    /// Provider rejected the authorization code exchange
    #[error("Spotify rejected the sign-in: {0}\n\n  → Run 'soundscout auth login' again.")]
    AuthExchange(String),

    /// Granted scopes are missing a required capability
    #[error("Spotify did not grant the '{missing}' permission.\n\n  → Run 'soundscout auth login' and accept all requested permissions.")]
    Scope {
        /// The scope that was requested but not granted
        missing: String,
    },

    /// Refresh token expired or revoked; the session has been cleared
    #[error("Your Spotify session has expired: {0}\n\n  → Run 'soundscout auth login' to re-authenticate.")]
    RefreshFailed(String),

    /// No session is stored
    #[error("You are not signed in to Spotify.\n\n  → Run 'soundscout auth login' to authenticate.")]
    NotAuthenticated,

    /// The platform answered 401 for a token we believed valid
    #[error("Spotify rejected the access token.")]
    Unauthorized,

    /// Network request error
    #[error("Network request failed: {0}\n\n  → Check your internet connection.")]
    Network(String),

    /// Remote call exceeded its deadline
    #[error("Request timed out.\n\n  → Check your internet connection.")]
    Timeout,

    /// Operation cancelled (by the user or by a stopping task)
    #[error("Operation cancelled.")]
    Cancelled,

    /// Location or media permission denied
    #[error("Permission denied: {0}\n\n  → Enable it in your system settings, then restart syncing.")]
    PermissionDenied(String),

    /// Music platform API error (non-auth, non-transport)
    #[error("Spotify API request failed: {0}")]
    Api(String),

    /// Profile store request failed
    #[error("Profile store request failed: {0}")]
    ProfileStore(String),

    /// No profile document exists for the user
    #[error("No SoundScout profile exists for '{0}'.\n\n  → Run 'soundscout auth login' to create one.")]
    ProfileNotFound(String),

    /// Credential storage error
    #[error("Cannot access secure storage: {0}\n\n  → On macOS: Make sure Keychain Access is available.\n  → On Linux: Ensure a secret service (like gnome-keyring) is running.\n  → Or set 'storage = \"file\"' in the config.")]
    Credential(String),

    /// Local storage error
    #[error("Local storage failed: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Failed to parse data: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization/deserialization error
    #[error("Configuration file is invalid: {0}")]
    Toml(String),

    /// Invalid input from user
    #[error("{0}")]
    InvalidInput(String),
}

impl ScoutError {
    /// Errors that are worth retrying on the next scheduled tick
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScoutError::Network(_) | ScoutError::Timeout | ScoutError::ProfileStore(_)
        )
    }

    /// Errors that can only be resolved by signing in again
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            ScoutError::RefreshFailed(_) | ScoutError::NotAuthenticated
        )
    }
}

impl From<reqwest::Error> for ScoutError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScoutError::Timeout
        } else {
            ScoutError::Network(err.to_string())
        }
    }
}

impl From<keyring::Error> for ScoutError {
    fn from(err: keyring::Error) -> Self {
        ScoutError::Credential(err.to_string())
    }
}

impl From<toml::de::Error> for ScoutError {
    fn from(err: toml::de::Error) -> Self {
        ScoutError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for ScoutError {
    fn from(err: toml::ser::Error) -> Self {
        ScoutError::Toml(err.to_string())
    }
}

/// Result type alias using ScoutError
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScoutError::Network("reset".into()).is_transient());
        assert!(ScoutError::Timeout.is_transient());
        assert!(!ScoutError::RefreshFailed("invalid_grant".into()).is_transient());
        assert!(!ScoutError::AuthCancelled("access_denied".into()).is_transient());
    }

    #[test]
    fn test_reauth_classification() {
        assert!(ScoutError::RefreshFailed("invalid_grant".into()).requires_reauth());
        assert!(ScoutError::NotAuthenticated.requires_reauth());
        assert!(!ScoutError::Timeout.requires_reauth());
    }
}
