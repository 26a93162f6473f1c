//! Session persistence over the local key-value store
//!
//! The token store is the only writer of the session keys. Nothing is cached
//! in memory: a sign-out in one process must be seen by every other process
//! on its next read.

use std::sync::Arc;

use crate::core::session::{Session, StoredSession};
use crate::core::storage::KeyValueStore;
use crate::error::{Result, ScoutError};

pub(crate) const SESSION_KEY: &str = "session";
pub(crate) const PENDING_VERIFIER_KEY: &str = "pending_code_verifier";
pub(crate) const PROFILE_KEY: &str = "user_profile";

/// Every key owned by a signed-in user; removed together on sign-out
const SIGN_OUT_KEYS: &[&str] = &[SESSION_KEY, PENDING_VERIFIER_KEY, PROFILE_KEY];

/// Session store
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Backing storage, shared with the profile cache
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.storage)
    }

    /// Current session, if any
    pub async fn session(&self) -> Result<Option<Session>> {
        match self.storage.get(SESSION_KEY).await? {
            Some(json) => {
                let stored: StoredSession = serde_json::from_str(&json)
                    .map_err(|e| ScoutError::Storage(format!("Invalid stored session: {}", e)))?;
                Ok(Some(Session::from_stored(stored)?))
            }
            None => Ok(None),
        }
    }

    /// Persist a complete session
    pub async fn set_session(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(&session.to_stored())?;
        self.storage.set(SESSION_KEY, &json).await
    }

    /// Verifier of an authorization request that has not completed yet
    pub async fn pending_verifier(&self) -> Result<Option<String>> {
        self.storage.get(PENDING_VERIFIER_KEY).await
    }

    pub async fn set_pending_verifier(&self, verifier: &str) -> Result<()> {
        self.storage.set(PENDING_VERIFIER_KEY, verifier).await
    }

    pub async fn clear_pending_verifier(&self) -> Result<()> {
        self.storage.remove(PENDING_VERIFIER_KEY).await
    }

    /// Remove the session, pending verifier and cached profile in one write
    pub async fn clear(&self) -> Result<()> {
        self.storage.remove_many(SIGN_OUT_KEYS).await?;
        tracing::debug!("Local session cleared");
        Ok(())
    }

    /// Check if a session is stored
    pub async fn has_session(&self) -> Result<bool> {
        Ok(self.session().await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{MemoryStore, MockKeyValueStore};
    use secrecy::{ExposeSecret, SecretString};

    fn session() -> Session {
        Session {
            access_token: SecretString::from("access-1"),
            refresh_token: SecretString::from("refresh-1"),
            user_id: "listener".into(),
            scope: "user-read-playback-state".into(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_session_roundtrip_through_storage() {
        let storage = Arc::new(MemoryStore::new());
        let store = TokenStore::new(storage.clone());
        assert!(store.session().await.unwrap().is_none());

        store.set_session(&session()).await.unwrap();

        // A fresh store over the same backend sees the session
        let reopened = TokenStore::new(storage);
        let loaded = reopened.session().await.unwrap().unwrap();
        assert_eq!(loaded.user_id, "listener");
        assert_eq!(loaded.refresh_token.expose_secret(), "refresh-1");
    }

    #[tokio::test]
    async fn test_sign_out_elsewhere_is_seen_immediately() {
        let storage = Arc::new(MemoryStore::new());
        let daemon = TokenStore::new(storage.clone());
        daemon.set_session(&session()).await.unwrap();
        assert!(daemon.has_session().await.unwrap());

        TokenStore::new(storage).clear().await.unwrap();

        assert!(!daemon.has_session().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_removes_session_and_profile_keys() {
        let storage = Arc::new(MemoryStore::new());
        let store = TokenStore::new(storage.clone());
        store.set_session(&session()).await.unwrap();
        store.set_pending_verifier("verifier").await.unwrap();
        storage.set(PROFILE_KEY, "{}").await.unwrap();

        store.clear().await.unwrap();

        assert!(storage.is_empty().await);
        assert!(store.session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_clear_keeps_session() {
        let stored = serde_json::to_string(&session().to_stored()).unwrap();
        let mut storage = MockKeyValueStore::new();
        storage
            .expect_get()
            .returning(move |_| Ok(Some(stored.clone())));
        storage
            .expect_remove_many()
            .returning(|_| Err(ScoutError::Storage("disk full".into())));

        let store = TokenStore::new(Arc::new(storage));

        assert!(store.clear().await.is_err());
        assert!(store.has_session().await.unwrap());
    }
}
