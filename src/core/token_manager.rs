//! Token lifecycle management with automatic refresh
//!
//! Handles:
//! - Checking token validity before API calls
//! - Refreshing the access token when it is expired or about to expire
//! - Dropping the session when the provider rejects the refresh token
//!
//! ## Token Priority
//!
//! 1. Environment variable (`SOUNDSCOUT_ACCESS_TOKEN`) - bypasses refresh logic, assumed valid
//! 2. Stored session with refresh capability
//!
//! ## Single flight
//!
//! Concurrent callers that find no valid token share one refresh. Every caller
//! notes the refresh generation before looking at the session; whoever gets the
//! lock with an unchanged generation performs the network call, everyone who
//! waited behind it receives the recorded outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::Mutex;

use crate::core::remote::{self, CallPolicy};
use crate::core::session::Session;
use crate::core::token_store::TokenStore;
use crate::error::{Result, ScoutError};
use crate::spotify::auth::TokenEndpoint;

/// Environment variable holding an access token that overrides the stored session
pub const ACCESS_TOKEN_ENV: &str = "SOUNDSCOUT_ACCESS_TOKEN";

/// Outcome of the last completed refresh, replayed to coalesced callers
type Outcome = std::result::Result<SecretString, ScoutError>;

/// Token manager for handling access token lifecycle
///
/// Provides transparent token refresh - callers get a valid token without
/// needing to handle expiration logic themselves.
pub struct TokenManager {
    store: Arc<TokenStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    policy: CallPolicy,
    env_token: Option<SecretString>,
    /// Held for the whole refresh; guards the last outcome
    flight: Mutex<Option<Outcome>>,
    /// Bumped every time a refresh completes, successfully or not
    generation: AtomicU64,
}

impl TokenManager {
    pub fn new(store: Arc<TokenStore>, endpoint: Arc<dyn TokenEndpoint>, policy: CallPolicy) -> Self {
        Self {
            store,
            endpoint,
            policy,
            env_token: None,
            flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Honor `SOUNDSCOUT_ACCESS_TOKEN` if it is set and non-empty
    pub fn with_env_override(mut self) -> Self {
        self.env_token = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .map(SecretString::from);
        if self.env_token.is_some() {
            tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
        }
        self
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Whether the access token comes from the environment
    pub fn uses_env_token(&self) -> bool {
        self.env_token.is_some()
    }

    /// Get a valid access token, refreshing if necessary
    ///
    /// ## Errors
    ///
    /// - `NotAuthenticated` - No session stored
    /// - `RefreshFailed` - The provider rejected the refresh token; the session is gone
    /// - `Network` / `Timeout` - Refresh could not reach the provider; the session is kept
    pub async fn ensure_valid_token(&self) -> Result<SecretString> {
        if let Some(token) = &self.env_token {
            return Ok(token.clone());
        }

        let observed = self.generation.load(Ordering::Acquire);
        let session = self.store.session().await?.ok_or(ScoutError::NotAuthenticated)?;
        if !session.is_expired() {
            return Ok(session.access_token);
        }

        tracing::debug!("Access token expired, refreshing");
        self.refresh_after(observed, false).await
    }

    /// Refresh the access token now
    ///
    /// Joins a refresh already in flight instead of starting a second one.
    pub async fn refresh(&self) -> Result<SecretString> {
        let observed = self.generation.load(Ordering::Acquire);
        self.refresh_after(observed, false).await
    }

    /// Force a token refresh
    ///
    /// Useful when an API call returns 401, indicating the token is invalid
    /// even if our local expiration check passed.
    pub async fn force_refresh(&self) -> Result<SecretString> {
        if self.env_token.is_some() {
            // Nothing to refresh; the environment token is simply wrong
            return Err(ScoutError::RefreshFailed(format!(
                "{} was rejected by the platform",
                ACCESS_TOKEN_ENV
            )));
        }

        let observed = self.generation.load(Ordering::Acquire);
        self.refresh_after(observed, true).await
    }

    /// Run or join the refresh that follows generation `observed`
    async fn refresh_after(&self, observed: u64, force: bool) -> Result<SecretString> {
        let mut last = self.flight.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            // A refresh completed while we waited for the lock
            if let Some(outcome) = last.as_ref() {
                tracing::trace!("Joining completed refresh");
                return replay(outcome);
            }
        }

        if !force {
            // Double-check: a new session may have been stored while we waited
            if let Some(session) = self.store.session().await? {
                if !session.is_expired() {
                    return Ok(session.access_token);
                }
            }
        }

        let outcome = self.perform_refresh().await;
        *last = Some(match &outcome {
            Ok(token) => Ok(token.clone()),
            Err(e) => Err(duplicate(e)),
        });
        self.generation.fetch_add(1, Ordering::AcqRel);

        outcome
    }

    async fn perform_refresh(&self) -> Result<SecretString> {
        let session = self.store.session().await?.ok_or(ScoutError::NotAuthenticated)?;

        if !session.can_refresh() {
            self.drop_session().await;
            return Err(ScoutError::RefreshFailed(
                "No refresh token stored".to_string(),
            ));
        }

        match remote::call(&self.policy, self.endpoint.refresh(&session.refresh_token)).await {
            Ok(grant) => {
                let refreshed = Session {
                    access_token: SecretString::from(grant.access_token.clone()),
                    refresh_token: grant
                        .refresh_token
                        .clone()
                        .filter(|token| !token.is_empty())
                        .map(SecretString::from)
                        .unwrap_or(session.refresh_token),
                    user_id: session.user_id,
                    scope: grant.scope.clone().unwrap_or(session.scope),
                    expires_at: grant.expires_at(),
                };
                // Signed out (possibly by another process) while the request was in flight
                if self.store.session().await?.is_none() {
                    tracing::debug!("Session cleared during refresh, discarding new token");
                    return Err(ScoutError::NotAuthenticated);
                }
                self.store.set_session(&refreshed).await?;
                tracing::info!("Access token refreshed");
                Ok(refreshed.access_token)
            }
            Err(ScoutError::RefreshFailed(reason)) => {
                tracing::warn!("Refresh token rejected: {}", reason);
                self.drop_session().await;
                Err(ScoutError::RefreshFailed(reason))
            }
            Err(e) => {
                tracing::warn!("Token refresh failed, keeping session: {}", e);
                Err(e)
            }
        }
    }

    async fn drop_session(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!("Failed to clear rejected session: {}", e);
        }
    }

    /// Check if we have any form of authentication
    pub async fn is_authenticated(&self) -> Result<bool> {
        if self.env_token.is_some() {
            return Ok(true);
        }
        self.store.has_session().await
    }

    /// Platform user id of the stored session
    pub async fn user_id(&self) -> Result<Option<String>> {
        Ok(self.store.session().await?.map(|session| session.user_id))
    }
}

fn replay(outcome: &Outcome) -> Result<SecretString> {
    match outcome {
        Ok(token) => Ok(token.clone()),
        Err(e) => Err(duplicate(e)),
    }
}

/// Copy an error for another waiter; wrapped foreign errors keep their message
fn duplicate(error: &ScoutError) -> ScoutError {
    match error {
        ScoutError::RefreshFailed(reason) => ScoutError::RefreshFailed(reason.clone()),
        ScoutError::NotAuthenticated => ScoutError::NotAuthenticated,
        ScoutError::Network(reason) => ScoutError::Network(reason.clone()),
        ScoutError::Timeout => ScoutError::Timeout,
        ScoutError::Cancelled => ScoutError::Cancelled,
        ScoutError::Storage(reason) => ScoutError::Storage(reason.clone()),
        other => ScoutError::Network(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStore;
    use crate::spotify::auth::{MockTokenEndpoint, TokenResponse};
    use async_trait::async_trait;
    use chrono::Utc;
    use secrecy::ExposeSecret;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn expired_session() -> Session {
        Session {
            access_token: SecretString::from("stale"),
            refresh_token: SecretString::from("refresh-1"),
            user_id: "listener".into(),
            scope: "user-read-playback-state".into(),
            expires_at: Some(Utc::now() - chrono::Duration::minutes(5)),
        }
    }

    fn grant(access: &str, refresh: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: access.into(),
            token_type: "Bearer".into(),
            scope: None,
            expires_in: Some(3600),
            refresh_token: refresh.map(String::from),
        }
    }

    async fn store_with(session: Option<Session>) -> Arc<TokenStore> {
        let store = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
        if let Some(session) = session {
            store.set_session(&session).await.unwrap();
        }
        store
    }

    /// Slow endpoint that counts calls
    struct CountingEndpoint {
        calls: AtomicUsize,
        reject: bool,
    }

    #[async_trait]
    impl TokenEndpoint for CountingEndpoint {
        async fn exchange_code(&self, _code: &str, _verifier: &str) -> Result<TokenResponse> {
            unreachable!("not used by the refresher")
        }

        async fn refresh(&self, _refresh_token: &SecretString) -> Result<TokenResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.reject {
                Err(ScoutError::RefreshFailed("invalid_grant".into()))
            } else {
                Ok(grant(&format!("fresh-{}", n), None))
            }
        }
    }

    /// Endpoint that signs the user out while the refresh is in flight
    struct SignOutDuringRefresh {
        store: Arc<TokenStore>,
    }

    #[async_trait]
    impl TokenEndpoint for SignOutDuringRefresh {
        async fn exchange_code(&self, _code: &str, _verifier: &str) -> Result<TokenResponse> {
            unreachable!("not used by the refresher")
        }

        async fn refresh(&self, _refresh_token: &SecretString) -> Result<TokenResponse> {
            TokenStore::new(self.store.storage()).clear().await?;
            Ok(grant("fresh", Some("refresh-2")))
        }
    }

    #[tokio::test]
    async fn test_refresh_does_not_restore_signed_out_session() {
        let store = store_with(Some(expired_session())).await;
        let endpoint = Arc::new(SignOutDuringRefresh {
            store: store.clone(),
        });
        let manager = TokenManager::new(store.clone(), endpoint, CallPolicy::default());

        assert!(matches!(
            manager.ensure_valid_token().await,
            Err(ScoutError::NotAuthenticated)
        ));
        assert!(store.session().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let endpoint = Arc::new(CountingEndpoint {
            calls: AtomicUsize::new(0),
            reject: false,
        });
        let store = store_with(Some(expired_session())).await;
        let manager = Arc::new(TokenManager::new(store, endpoint.clone(), CallPolicy::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure_valid_token().await })
            })
            .collect();

        for handle in futures::future::join_all(handles).await {
            let token = handle.unwrap().unwrap();
            assert_eq!(token.expose_secret(), "fresh-1");
        }
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_failure() {
        let endpoint = Arc::new(CountingEndpoint {
            calls: AtomicUsize::new(0),
            reject: true,
        });
        let store = store_with(Some(expired_session())).await;
        let manager = Arc::new(TokenManager::new(store, endpoint.clone(), CallPolicy::default()));

        let results =
            futures::future::join_all((0..5).map(|_| manager.ensure_valid_token())).await;

        for result in results {
            assert!(matches!(result, Err(ScoutError::RefreshFailed(_))));
        }
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_valid_token_skips_refresh() {
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().never();

        let mut session = expired_session();
        session.access_token = SecretString::from("current");
        session.expires_at = Some(Utc::now() + chrono::Duration::hours(1));
        let manager = TokenManager::new(
            store_with(Some(session)).await,
            Arc::new(endpoint),
            CallPolicy::default(),
        );

        let token = manager.ensure_valid_token().await.unwrap();
        assert_eq!(token.expose_secret(), "current");
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_clears_session() {
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_refresh()
            .times(1)
            .returning(|_| Err(ScoutError::RefreshFailed("invalid_grant".into())));

        let store = store_with(Some(expired_session())).await;
        store.set_pending_verifier("left-over").await.unwrap();
        let manager = TokenManager::new(store.clone(), Arc::new(endpoint), CallPolicy::default());

        assert!(matches!(
            manager.ensure_valid_token().await,
            Err(ScoutError::RefreshFailed(_))
        ));
        assert!(store.session().await.unwrap().is_none());
        assert!(store.pending_verifier().await.unwrap().is_none());

        // Until a new sign-in completes
        assert!(matches!(
            manager.ensure_valid_token().await,
            Err(ScoutError::NotAuthenticated)
        ));
        assert!(!manager.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn test_new_session_after_failure_is_used() {
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_refresh()
            .times(1)
            .returning(|_| Err(ScoutError::RefreshFailed("invalid_grant".into())));

        let store = store_with(Some(expired_session())).await;
        let manager = TokenManager::new(store.clone(), Arc::new(endpoint), CallPolicy::default());
        assert!(manager.ensure_valid_token().await.is_err());

        let mut renewed = expired_session();
        renewed.access_token = SecretString::from("signed-in-again");
        renewed.expires_at = None;
        store.set_session(&renewed).await.unwrap();

        let token = manager.ensure_valid_token().await.unwrap();
        assert_eq!(token.expose_secret(), "signed-in-again");
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_session() {
        let mut endpoint = MockTokenEndpoint::new();
        endpoint
            .expect_refresh()
            .returning(|_| Err(ScoutError::Network("connection reset".into())));

        let store = store_with(Some(expired_session())).await;
        let manager = TokenManager::new(store.clone(), Arc::new(endpoint), CallPolicy::default());

        assert!(matches!(
            manager.ensure_valid_token().await,
            Err(ScoutError::Network(_))
        ));
        assert!(store.session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_token_rotation() {
        let mut endpoint = MockTokenEndpoint::new();
        let mut seq = mockall::Sequence::new();
        endpoint
            .expect_refresh()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(grant("access-2", Some("refresh-2"))));
        endpoint
            .expect_refresh()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|token| token.expose_secret() == "refresh-2")
            .returning(|_| Ok(grant("access-3", None)));

        let store = store_with(Some(expired_session())).await;
        let manager = TokenManager::new(store.clone(), Arc::new(endpoint), CallPolicy::default());

        manager.force_refresh().await.unwrap();
        let rotated = store.session().await.unwrap().unwrap();
        assert_eq!(rotated.access_token.expose_secret(), "access-2");
        assert_eq!(rotated.refresh_token.expose_secret(), "refresh-2");

        manager.force_refresh().await.unwrap();
        let kept = store.session().await.unwrap().unwrap();
        assert_eq!(kept.access_token.expose_secret(), "access-3");
        assert_eq!(kept.refresh_token.expose_secret(), "refresh-2");
        assert!(!kept.is_expired());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails() {
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().never();

        let mut session = expired_session();
        session.refresh_token = SecretString::from("");
        let store = store_with(Some(session)).await;
        let manager = TokenManager::new(store.clone(), Arc::new(endpoint), CallPolicy::default());

        assert!(matches!(
            manager.ensure_valid_token().await,
            Err(ScoutError::RefreshFailed(_))
        ));
        assert!(!store.has_session().await.unwrap());
    }

    #[tokio::test]
    async fn test_no_session_is_not_authenticated() {
        let mut endpoint = MockTokenEndpoint::new();
        endpoint.expect_refresh().never();
        let manager =
            TokenManager::new(store_with(None).await, Arc::new(endpoint), CallPolicy::default());

        assert!(matches!(
            manager.ensure_valid_token().await,
            Err(ScoutError::NotAuthenticated)
        ));
        assert_eq!(manager.user_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_is_authenticated_with_env_var() {
        std::env::set_var(ACCESS_TOKEN_ENV, "test_token");
        let manager = TokenManager::new(
            store_with(None).await,
            Arc::new(MockTokenEndpoint::new()),
            CallPolicy::default(),
        )
        .with_env_override();
        std::env::remove_var(ACCESS_TOKEN_ENV);

        assert!(manager.uses_env_token());
        assert!(manager.is_authenticated().await.unwrap());
        let token = manager.ensure_valid_token().await.unwrap();
        assert_eq!(token.expose_secret(), "test_token");
        assert!(matches!(
            manager.force_refresh().await,
            Err(ScoutError::RefreshFailed(_))
        ));
    }
}
