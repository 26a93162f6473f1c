//! Service wiring shared by the command handlers

use std::sync::Arc;

use crate::core::config::Config;
use crate::core::remote::{self, CallPolicy};
use crate::core::storage::open_store;
use crate::core::token_manager::TokenManager;
use crate::core::token_store::TokenStore;
use crate::error::{Result, ScoutError};
use crate::profile::cache::ProfileCache;
use crate::profile::model::NowPlaying;
use crate::profile::store::HttpProfileStore;
use crate::spotify::auth::{PkceAuth, SpotifyAccounts, TokenEndpoint};
use crate::spotify::client::{MusicPlatform, PlatformUser, SpotifyClient};

/// Everything a command needs, built from the process configuration
pub struct AppContext {
    pub config: Config,
    pub policy: CallPolicy,
    pub store: Arc<TokenStore>,
    pub tokens: Arc<TokenManager>,
    pub platform: Arc<dyn MusicPlatform>,
    endpoint: Arc<dyn TokenEndpoint>,
    http: reqwest::Client,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let config = Config::global()?.clone();
        let policy = CallPolicy::new(config.request_timeout());
        let http = remote::http_client(config.request_timeout())?;

        let store = Arc::new(TokenStore::new(open_store(&config)?));
        let endpoint: Arc<dyn TokenEndpoint> =
            Arc::new(SpotifyAccounts::new(http.clone(), &config));
        let tokens = Arc::new(
            TokenManager::new(store.clone(), endpoint.clone(), policy.clone())
                .with_env_override(),
        );
        let platform: Arc<dyn MusicPlatform> =
            Arc::new(SpotifyClient::new(http.clone(), &config.api_url));

        Ok(Self {
            config,
            policy,
            store,
            tokens,
            platform,
            endpoint,
            http,
        })
    }

    pub fn pkce_auth(&self) -> PkceAuth {
        PkceAuth::new(
            &self.config,
            self.endpoint.clone(),
            self.platform.clone(),
            self.store.clone(),
            self.policy.clone(),
        )
    }

    /// Profile cache over the configured document store
    pub fn profiles(&self) -> Result<Arc<ProfileCache>> {
        let url = self.config.require_profile_store_url()?;
        let remote = HttpProfileStore::new(self.http.clone(), url, self.tokens.clone());
        Ok(Arc::new(ProfileCache::new(
            Arc::new(remote),
            self.store.storage(),
            self.policy.clone(),
        )))
    }

    /// The signed-in platform user, from the session or from `/me`
    pub async fn user_id(&self) -> Result<String> {
        if let Some(user_id) = self.tokens.user_id().await? {
            return Ok(user_id);
        }
        Ok(self.current_user().await?.id)
    }

    pub async fn current_user(&self) -> Result<PlatformUser> {
        let token = self.tokens.ensure_valid_token().await?;
        remote::call(&self.policy, self.platform.current_user(&token)).await
    }

    /// Track playing now; a rejected token is refreshed once
    pub async fn current_track(&self) -> Result<Option<NowPlaying>> {
        let token = self.tokens.ensure_valid_token().await?;
        match remote::call(&self.policy, self.platform.currently_playing(&token)).await {
            Err(ScoutError::Unauthorized) => {
                let token = self.tokens.force_refresh().await?;
                remote::call(&self.policy, self.platform.currently_playing(&token)).await
            }
            other => other,
        }
    }

    /// Track playing now, or an error telling the user to start one
    pub async fn require_current_track(&self) -> Result<NowPlaying> {
        self.current_track().await?.ok_or_else(|| {
            ScoutError::InvalidInput(
                "Nothing is playing right now.\n\n  → Start a track on Spotify or pass a track URI."
                    .to_string(),
            )
        })
    }
}
