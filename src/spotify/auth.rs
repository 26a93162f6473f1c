//! OAuth 2.0 Authorization Code flow with PKCE for Spotify
//!
//! See: https://developer.spotify.com/documentation/web-api/tutorials/code-pkce-flow
//!
//! The flow is split in two halves so the consent screen can live anywhere:
//! [`PkceAuth::begin_auth`] builds the authorization URL and remembers the
//! verifier, [`PkceAuth::complete_auth`] exchanges the returned code.

use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::config::Config;
use crate::core::remote::{self, CallPolicy};
use crate::core::session::Session;
use crate::core::token_store::TokenStore;
use crate::error::{Result, ScoutError};
use crate::spotify::client::MusicPlatform;
use crate::spotify::pkce;

/// OAuth scopes requested at sign-in
pub const OAUTH_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-read-playback-state",
    "user-read-currently-playing",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
];

/// Scope without which presence sync cannot work
pub const REQUIRED_SCOPE: &str = "user-read-playback-state";

/// Token response from the accounts service
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The access token for API requests
    pub access_token: String,
    /// Token type (usually "Bearer")
    #[serde(default)]
    pub token_type: String,
    /// Granted scopes, space separated
    #[serde(default)]
    pub scope: Option<String>,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Present on code exchange; present on refresh only when rotated
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Absolute expiry computed from `expires_in`
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs as i64))
    }
}

/// Error response from the accounts service
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorResponse {
    fn describe(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{} ({})", self.error, description),
            None => self.error.clone(),
        }
    }
}

/// Code exchange request body
#[derive(Serialize)]
struct CodeExchangeRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
    client_id: &'a str,
    code_verifier: &'a str,
}

/// Refresh token request body
#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
}

/// The provider's token endpoint (`POST /api/token`)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// `grant_type=authorization_code`; non-2xx fails with `AuthExchange`
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResponse>;

    /// `grant_type=refresh_token`; rejection fails with `RefreshFailed`
    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse>;
}

/// Spotify accounts service
pub struct SpotifyAccounts {
    client: Client,
    token_url: String,
    client_id: String,
    redirect_uri: String,
}

impl SpotifyAccounts {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            token_url: format!("{}/api/token", config.accounts_url.trim_end_matches('/')),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    async fn post_form<T: Serialize + ?Sized>(&self, form: &T) -> Result<(bool, u16, String)> {
        let response = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        Ok((status.is_success(), status.as_u16(), text))
    }
}

#[async_trait]
impl TokenEndpoint for SpotifyAccounts {
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResponse> {
        let request = CodeExchangeRequest {
            grant_type: "authorization_code",
            code,
            redirect_uri: &self.redirect_uri,
            client_id: &self.client_id,
            code_verifier,
        };

        let (ok, status, text) = self.post_form(&request).await?;
        if !ok {
            let reason = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.describe())
                .unwrap_or_else(|_| format!("status {}", status));
            tracing::warn!("Code exchange rejected: {}", reason);
            return Err(ScoutError::AuthExchange(reason));
        }

        serde_json::from_str(&text)
            .map_err(|e| ScoutError::AuthExchange(format!("Invalid token response: {}", e)))
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse> {
        let request = RefreshTokenRequest {
            grant_type: "refresh_token",
            refresh_token: refresh_token.expose_secret(),
            client_id: &self.client_id,
        };

        let (ok, status, text) = self.post_form(&request).await?;
        if ok {
            return serde_json::from_str(&text).map_err(|e| {
                ScoutError::Network(format!("Invalid refresh response: {}", e))
            });
        }

        let reason = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.describe())
            .unwrap_or_else(|_| format!("status {}", status));

        // 4xx means the refresh token itself is bad; anything else is worth retrying
        if (400..500).contains(&status) {
            Err(ScoutError::RefreshFailed(reason))
        } else {
            Err(ScoutError::Network(format!("token endpoint: {}", reason)))
        }
    }
}

/// A started authorization request
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// URL of the consent screen
    pub url: String,
    /// PKCE verifier; keep it until the callback arrives
    pub code_verifier: String,
    /// Anti-forgery value echoed back on the callback
    pub state: String,
}

/// Extract the authorization code from the redirect URL
///
/// An `error` parameter (user pressed "Cancel", or the provider refused)
/// yields `AuthCancelled`; it is not a network or exchange failure.
pub fn parse_callback(callback_url: &str, expected_state: Option<&str>) -> Result<String> {
    let url = Url::parse(callback_url.trim())
        .map_err(|e| ScoutError::InvalidInput(format!("Invalid callback URL: {}", e)))?;

    let mut code = None;
    let mut error = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(ScoutError::AuthCancelled(error));
    }

    if let Some(expected) = expected_state {
        if state.as_deref() != Some(expected) {
            return Err(ScoutError::AuthExchange(
                "State mismatch in callback".to_string(),
            ));
        }
    }

    code.filter(|c| !c.is_empty())
        .ok_or_else(|| ScoutError::AuthExchange("Authorization code not found".to_string()))
}

/// PKCE authorization flow controller
pub struct PkceAuth {
    endpoint: Arc<dyn TokenEndpoint>,
    platform: Arc<dyn MusicPlatform>,
    tokens: Arc<TokenStore>,
    policy: CallPolicy,
    authorize_url: String,
    client_id: String,
    redirect_uri: String,
}

impl PkceAuth {
    pub fn new(
        config: &Config,
        endpoint: Arc<dyn TokenEndpoint>,
        platform: Arc<dyn MusicPlatform>,
        tokens: Arc<TokenStore>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            endpoint,
            platform,
            tokens,
            policy,
            authorize_url: format!("{}/authorize", config.accounts_url.trim_end_matches('/')),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// Create a verifier/challenge pair and the consent URL
    ///
    /// The verifier is persisted as the pending verifier so a restarted
    /// process can still complete the exchange.
    pub async fn begin_auth(&self) -> Result<AuthorizationRequest> {
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::generate_code_challenge(&code_verifier);
        let state = pkce::generate_state();

        let mut url = Url::parse(&self.authorize_url)
            .map_err(|e| ScoutError::Config(format!("Invalid accounts URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &OAUTH_SCOPES.join(" "))
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", &code_challenge)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", &state)
            .append_pair("show_dialog", "true");

        self.tokens.set_pending_verifier(&code_verifier).await?;
        tracing::debug!("Authorization request created");

        Ok(AuthorizationRequest {
            url: url.into(),
            code_verifier,
            state,
        })
    }

    /// Hand control to the consent screen; returns false if no browser could be launched
    pub fn open_consent(&self, request: &AuthorizationRequest) -> bool {
        open_browser(&request.url)
    }

    /// Exchange the code for tokens, resolve the user id and persist the session
    pub async fn complete_auth(&self, code: &str, code_verifier: &str) -> Result<Session> {
        let grant = remote::call(
            &self.policy,
            self.endpoint.exchange_code(code, code_verifier),
        )
        .await?;

        let scope = grant.scope.clone().unwrap_or_default();
        if !scope.split_whitespace().any(|s| s == REQUIRED_SCOPE) {
            return Err(ScoutError::Scope {
                missing: REQUIRED_SCOPE.to_string(),
            });
        }

        if grant.access_token.is_empty() {
            return Err(ScoutError::AuthExchange(
                "Token response carried no access token".to_string(),
            ));
        }

        let access_token = SecretString::from(grant.access_token.clone());
        let user = remote::call(&self.policy, self.platform.current_user(&access_token)).await?;

        let session = Session {
            access_token,
            refresh_token: SecretString::from(grant.refresh_token.clone().unwrap_or_default()),
            user_id: user.id,
            scope,
            expires_at: grant.expires_at(),
        };

        self.tokens.set_session(&session).await?;
        self.tokens.clear_pending_verifier().await?;
        tracing::info!("Signed in as {}", session.user_id);

        Ok(session)
    }

    /// Complete a sign-in started by an earlier process
    ///
    /// Uses the pending verifier persisted by [`begin_auth`](Self::begin_auth);
    /// the state parameter cannot be checked because it was not persisted.
    pub async fn complete_pending(&self, callback_url: &str) -> Result<Session> {
        let code = parse_callback(callback_url, None)?;
        let verifier = self.tokens.pending_verifier().await?.ok_or_else(|| {
            ScoutError::InvalidInput(
                "No sign-in in progress.\n\n  → Run 'soundscout auth login' first.".to_string(),
            )
        })?;
        self.complete_auth(&code, &verifier).await
    }

    /// Parse the redirect URL of `request` and complete the exchange
    pub async fn complete_from_callback(
        &self,
        callback_url: &str,
        request: &AuthorizationRequest,
    ) -> Result<Session> {
        let code = parse_callback(callback_url, Some(&request.state))?;
        self.complete_auth(&code, &request.code_verifier).await
    }
}

/// Attempt to open a URL in the default browser
///
/// Returns true if the browser was successfully launched, false otherwise.
#[allow(unused_variables)]
pub fn open_browser(url: &str) -> bool {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "linux")]
    {
        Command::new("xdg-open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .is_ok()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        false
    }
}
