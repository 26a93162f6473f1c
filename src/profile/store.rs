//! Profile document store contract and backends
//!
//! The remote document database is an external collaborator; this module
//! only implements the contract the app depends on:
//! get/set/update/delete by user id and a "ghost mode disabled" query.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use tokio::sync::RwLock;
use url::Url;

use crate::core::token_manager::TokenManager;
use crate::error::{Result, ScoutError};
use crate::profile::model::{ProfileUpdate, UserProfile};

/// Remote profile document store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a user's document
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Create or replace a user's document
    async fn set(&self, profile: &UserProfile) -> Result<()>;

    /// Apply a partial update to an existing document
    async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<()>;

    /// Delete a user's document
    async fn delete(&self, user_id: &str) -> Result<()>;

    /// All documents with ghost mode disabled
    async fn visible_profiles(&self) -> Result<Vec<UserProfile>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// JSON document store over HTTP
///
/// Documents live at `{base}/users/{id}`; requests carry the platform access
/// token as a bearer credential.
pub struct HttpProfileStore {
    client: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
}

impl HttpProfileStore {
    pub fn new(client: Client, base_url: &str, tokens: Arc<TokenManager>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// `{base}/users[/{id}]`, with the id encoded as a single path segment
    fn users_url(&self, user_id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ScoutError::Config(format!("Invalid profile store URL '{}': {}", self.base_url, e))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ScoutError::Config(format!(
                    "Profile store URL '{}' cannot be a base",
                    self.base_url
                ))
            })?;
            segments.pop_if_empty().push("users");
            if let Some(user_id) = user_id {
                segments.push(user_id);
            }
        }
        Ok(url)
    }

    fn user_url(&self, user_id: &str) -> Result<Url> {
        self.users_url(Some(user_id))
    }

    async fn bearer(&self) -> Result<String> {
        let token = self.tokens.ensure_valid_token().await?;
        Ok(format!("Bearer {}", token.expose_secret()))
    }

    /// Map non-success statuses to errors
    async fn check(response: Response, user_id: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(ScoutError::ProfileNotFound(user_id.to_string())),
            StatusCode::UNAUTHORIZED => Err(ScoutError::Unauthorized),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(ScoutError::ProfileStore(format!("{}: {}", status, body)))
            }
        }
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let response = self
            .client
            .get(self.user_url(user_id)?)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let profile: UserProfile = Self::check(response, user_id).await?.json().await?;
        Ok(Some(profile.migrated()))
    }

    async fn set(&self, profile: &UserProfile) -> Result<()> {
        let response = self
            .client
            .put(self.user_url(&profile.id)?)
            .header("Authorization", self.bearer().await?)
            .json(profile)
            .send()
            .await?;

        Self::check(response, &profile.id).await?;
        Ok(())
    }

    async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<()> {
        let response = self
            .client
            .patch(self.user_url(user_id)?)
            .header("Authorization", self.bearer().await?)
            .json(&update.to_patch())
            .send()
            .await?;

        Self::check(response, user_id).await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.user_url(user_id)?)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        match Self::check(response, user_id).await {
            Ok(_) | Err(ScoutError::ProfileNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn visible_profiles(&self) -> Result<Vec<UserProfile>> {
        let response = self
            .client
            .get(self.users_url(None)?)
            .query(&[("isGhostMode", "false")])
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        let profiles: Vec<UserProfile> = Self::check(response, "*").await?.json().await?;
        Ok(profiles
            .into_iter()
            .filter(|p| !p.is_ghost_mode)
            .map(UserProfile::migrated)
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory
// ─────────────────────────────────────────────────────────────────────────────

/// In-process document store
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    documents: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.documents.read().await.get(user_id).cloned())
    }

    async fn set(&self, profile: &UserProfile) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<()> {
        let mut documents = self.documents.write().await;
        let profile = documents
            .get_mut(user_id)
            .ok_or_else(|| ScoutError::ProfileNotFound(user_id.to_string()))?;
        update.apply(profile);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.documents.write().await.remove(user_id);
        Ok(())
    }

    async fn visible_profiles(&self) -> Result<Vec<UserProfile>> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .filter(|p| !p.is_ghost_mode)
            .cloned()
            .collect())
    }
}
