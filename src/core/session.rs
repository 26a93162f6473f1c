//! Session data with expiration metadata

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};

/// Refresh this long before the provider's stated expiry
const EXPIRY_BUFFER_SECS: i64 = 60;

const STORED_SESSION_VERSION: u8 = 1;

/// Authenticated session with the music platform
#[derive(Debug, Clone)]
pub struct Session {
    /// The access token for API requests
    pub access_token: SecretString,
    /// The refresh token for obtaining new access tokens
    pub refresh_token: SecretString,
    /// Platform user id (`/me` → `id`)
    pub user_id: String,
    /// Granted scopes, space separated
    pub scope: String,
    /// When the access token expires; `None` when the provider did not say
    pub expires_at: Option<DateTime<Utc>>,
}

/// Serializable format for local storage
///
/// Uses plain strings since SecretString doesn't implement Serialize.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    #[serde(default)]
    pub scope: String,
    /// ISO 8601 timestamp for access token expiration
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Version for future migrations
    pub version: u8,
}

impl Session {
    /// True when the access token is missing, expired, or about to expire
    pub fn is_expired(&self) -> bool {
        if self.access_token.expose_secret().is_empty() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => {
                Utc::now() + chrono::Duration::seconds(EXPIRY_BUFFER_SECS) > expires_at
            }
            None => false,
        }
    }

    /// Whether a refresh can be attempted at all
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.expose_secret().is_empty()
    }

    /// Whether the granted scopes include `scope`
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.split_whitespace().any(|s| s == scope)
    }

    /// Convert to storable format
    pub fn to_stored(&self) -> StoredSession {
        StoredSession {
            access_token: self.access_token.expose_secret().to_string(),
            refresh_token: self.refresh_token.expose_secret().to_string(),
            user_id: self.user_id.clone(),
            scope: self.scope.clone(),
            expires_at: self.expires_at.map(|t| t.to_rfc3339()),
            version: STORED_SESSION_VERSION,
        }
    }

    /// Create from stored format
    pub fn from_stored(stored: StoredSession) -> Result<Self> {
        let expires_at = stored
            .expires_at
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| {
                        ScoutError::Storage(format!("Invalid session expiration date: {}", e))
                    })
            })
            .transpose()?;

        Ok(Self {
            access_token: SecretString::from(stored.access_token),
            refresh_token: SecretString::from(stored.refresh_token),
            user_id: stored.user_id,
            scope: stored.scope,
            expires_at,
        })
    }
}

/// Get a masked version of a token for display (shows first 4 and last 4 chars)
pub fn mask_token(token: &SecretString) -> String {
    let exposed = token.expose_secret();
    if exposed.len() <= 8 {
        "*".repeat(exposed.len())
    } else {
        format!("{}...{}", &exposed[..4], &exposed[exposed.len() - 4..])
    }
}
