//! Local mirror of the signed-in user's profile document
//!
//! Reads go memory → local storage → remote store and populate every layer
//! they missed. Writes go to the remote store first and are mirrored locally
//! only once the store accepted them, so a failed write never leaves the
//! cache ahead of the remote document.
//!
//! All mutations of one user's document run under that user's async mutex
//! and start from the document as the remote store has it now. Other
//! processes (a running `sync`, a one-shot `likes add`) write the same
//! document, so the local copy is never the base of a read-modify-write.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, RwLock};

use crate::core::remote::{self, CallPolicy};
use crate::core::storage::KeyValueStore;
use crate::core::token_store::{TokenStore, PROFILE_KEY};
use crate::error::{Result, ScoutError};
use crate::profile::model::{
    Coordinates, LikedSong, LikedSongs, NearbyListener, Neighborhood, NowPlaying,
    PresenceSnapshot, ProfileUpdate, Settings, UserProfile,
};
use crate::profile::store::ProfileStore;
use crate::spotify::client::PlatformUser;

/// Result of [`ProfileCache::sign_up`]
#[derive(Debug, Clone)]
pub struct SignUp {
    pub profile: UserProfile,
    /// False when the user already had a document
    pub created: bool,
}

/// Read-through / write-through profile cache
pub struct ProfileCache {
    remote: Arc<dyn ProfileStore>,
    local: Arc<dyn KeyValueStore>,
    policy: CallPolicy,
    memory: RwLock<Option<UserProfile>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    settings: watch::Sender<Settings>,
}

impl ProfileCache {
    pub fn new(
        remote: Arc<dyn ProfileStore>,
        local: Arc<dyn KeyValueStore>,
        policy: CallPolicy,
    ) -> Self {
        let (settings, _) = watch::channel(Settings::default());
        Self {
            remote,
            local,
            policy,
            memory: RwLock::new(None),
            locks: Mutex::new(HashMap::new()),
            settings,
        }
    }

    /// Settings of the cached profile, updated on every settings change
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    /// The user's profile, loading it on a miss
    pub async fn profile(&self, user_id: &str) -> Result<UserProfile> {
        if let Some(profile) = self.cached(user_id).await {
            return Ok(profile);
        }
        self.refresh_profile(user_id).await
    }

    /// Reload the profile from the remote store
    pub async fn refresh_profile(&self, user_id: &str) -> Result<UserProfile> {
        let profile = remote::call(&self.policy, self.remote.get(user_id))
            .await?
            .ok_or_else(|| ScoutError::ProfileNotFound(user_id.to_string()))?;
        self.remember(profile.clone()).await;
        Ok(profile)
    }

    /// Create the user's document unless one exists already
    pub async fn sign_up(&self, user: &PlatformUser) -> Result<SignUp> {
        let lock = self.user_lock(&user.id).await;
        let _guard = lock.lock().await;

        if let Some(existing) = remote::call(&self.policy, self.remote.get(&user.id)).await? {
            tracing::debug!("Profile {} already exists", user.id);
            self.remember(existing.clone()).await;
            return Ok(SignUp {
                profile: existing,
                created: false,
            });
        }

        let mut profile = UserProfile::new(&user.id, user.username());
        profile.profile_pic_url = user.image_url();

        remote::call(&self.policy, self.remote.set(&profile)).await?;
        tracing::info!("Created profile for {}", user.id);
        self.remember(profile.clone()).await;

        Ok(SignUp {
            profile,
            created: true,
        })
    }

    /// Add a song to the liked set; returns false when it was already liked
    pub async fn add_song_to_likes(&self, user_id: &str, song: LikedSong) -> Result<bool> {
        if song.uri.is_empty() {
            return Err(ScoutError::InvalidInput("Song URI cannot be empty".into()));
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut liked = self.refresh_profile(user_id).await?.liked_songs;
        if !liked.insert(song) {
            return Ok(false);
        }
        self.write(user_id, ProfileUpdate::LikedSongs(liked)).await?;
        Ok(true)
    }

    /// Remove a song from the liked set; returns false when it was not liked
    pub async fn remove_song_from_likes(&self, user_id: &str, uri: &str) -> Result<bool> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut liked = self.refresh_profile(user_id).await?.liked_songs;
        if !liked.remove(uri) {
            return Ok(false);
        }
        self.write(user_id, ProfileUpdate::LikedSongs(liked)).await?;
        Ok(true)
    }

    pub async fn is_song_liked(&self, user_id: &str, uri: &str) -> Result<bool> {
        Ok(self.latest(user_id).await?.liked_songs.contains(uri))
    }

    pub async fn liked_songs(&self, user_id: &str) -> Result<LikedSongs> {
        Ok(self.latest(user_id).await?.liked_songs)
    }

    pub async fn set_ghost_mode(&self, user_id: &str, enabled: bool) -> Result<()> {
        self.update(user_id, ProfileUpdate::GhostMode(enabled)).await
    }

    pub async fn set_grid_view(&self, user_id: &str, enabled: bool) -> Result<()> {
        self.update(user_id, ProfileUpdate::GridView(enabled)).await
    }

    pub async fn update_username(&self, user_id: &str, username: &str) -> Result<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ScoutError::InvalidInput("Username cannot be empty".into()));
        }
        self.update(user_id, ProfileUpdate::Username(username.to_string()))
            .await
    }

    pub async fn update_profile_pic(&self, user_id: &str, url: &str) -> Result<()> {
        url::Url::parse(url)
            .map_err(|e| ScoutError::InvalidInput(format!("Invalid picture URL: {}", e)))?;
        self.update(user_id, ProfileUpdate::ProfilePic(url.to_string()))
            .await
    }

    /// Write a presence snapshot
    ///
    /// While ghost mode is on, or when no position is available, the
    /// coordinates of the previous snapshot are carried over unchanged so the
    /// stored location never moves. Ghost mode and the previous snapshot are
    /// read from the remote document on every call. Track fields are always
    /// replaced.
    pub async fn publish_presence(
        &self,
        user_id: &str,
        now_playing: Option<&NowPlaying>,
        location: Option<Coordinates>,
        at: DateTime<Utc>,
    ) -> Result<PresenceSnapshot> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let profile = self.refresh_profile(user_id).await?;
        let previous = profile.presence.as_ref().and_then(PresenceSnapshot::location);
        let location = if profile.is_ghost_mode {
            previous
        } else {
            location.or(previous)
        };

        let snapshot = PresenceSnapshot::new(now_playing, location, at);
        self.write(user_id, ProfileUpdate::Presence(snapshot.clone()))
            .await?;
        Ok(snapshot)
    }

    /// Delete the remote document, then the local session and cache
    pub async fn delete_account(&self, user_id: &str, tokens: &TokenStore) -> Result<()> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        remote::call(&self.policy, self.remote.delete(user_id)).await?;
        tracing::info!("Deleted profile {}", user_id);

        *self.memory.write().await = None;
        tokens.clear().await?;
        self.settings.send_replace(Settings::default());
        Ok(())
    }

    /// Drop the in-memory copy (sign-out)
    pub async fn forget(&self) {
        *self.memory.write().await = None;
        self.settings.send_replace(Settings::default());
    }

    /// Visible listeners around `origin`, excluding `user_id`
    pub async fn nearby_users(
        &self,
        user_id: &str,
        origin: Coordinates,
        radius_km: f64,
    ) -> Result<Neighborhood> {
        let profiles = remote::call(&self.policy, self.remote.visible_profiles()).await?;

        let mut listeners: Vec<NearbyListener> = profiles
            .into_iter()
            .filter(|profile| profile.id != user_id && !profile.is_ghost_mode)
            .filter_map(|profile| {
                let position = profile.presence.as_ref()?.location()?;
                Some(NearbyListener {
                    distance_km: origin.distance_km(&position),
                    profile,
                })
            })
            .collect();
        listeners.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        let (nearby, distant): (Vec<_>, Vec<_>) = listeners
            .into_iter()
            .partition(|listener| listener.distance_km <= radius_km);
        Ok(Neighborhood { nearby, distant })
    }

    async fn update(&self, user_id: &str, update: ProfileUpdate) -> Result<()> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        // Load first so the mirror step has a current copy to apply the change to
        self.refresh_profile(user_id).await?;
        self.write(user_id, update).await
    }

    /// Remote document, or the cached copy while the store is unreachable
    async fn latest(&self, user_id: &str) -> Result<UserProfile> {
        match self.refresh_profile(user_id).await {
            Err(e) if e.is_transient() => match self.cached(user_id).await {
                Some(profile) => {
                    tracing::warn!("Profile store unreachable, using cached profile: {}", e);
                    Ok(profile)
                }
                None => Err(e),
            },
            other => other,
        }
    }

    /// Remote first, then mirror; caller holds the user's lock
    async fn write(&self, user_id: &str, update: ProfileUpdate) -> Result<()> {
        remote::call(&self.policy, self.remote.update(user_id, &update)).await?;

        let mirrored = {
            let mut memory = self.memory.write().await;
            match memory.as_mut() {
                Some(profile) if profile.id == user_id => {
                    update.apply(profile);
                    Some(profile.clone())
                }
                _ => None,
            }
        };

        if let Some(profile) = mirrored {
            self.persist_local(&profile).await;
            if update.touches_settings() {
                self.settings.send_replace(profile.settings());
            }
        }
        Ok(())
    }

    /// Cached copy of `user_id`, from memory or local storage
    async fn cached(&self, user_id: &str) -> Option<UserProfile> {
        if let Some(profile) = self.memory.read().await.as_ref() {
            if profile.id == user_id {
                return Some(profile.clone());
            }
        }

        let json = match self.local.get(PROFILE_KEY).await {
            Ok(json) => json?,
            Err(e) => {
                tracing::warn!("Failed to read cached profile: {}", e);
                return None;
            }
        };
        let profile = match serde_json::from_str::<UserProfile>(&json) {
            Ok(profile) => profile.migrated(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable cached profile: {}", e);
                return None;
            }
        };
        if profile.id != user_id {
            return None;
        }

        self.settings.send_replace(profile.settings());
        *self.memory.write().await = Some(profile.clone());
        Some(profile)
    }

    /// Store a profile in memory and local storage
    async fn remember(&self, profile: UserProfile) {
        self.persist_local(&profile).await;
        self.settings.send_replace(profile.settings());
        *self.memory.write().await = Some(profile);
    }

    async fn persist_local(&self, profile: &UserProfile) {
        let result = match serde_json::to_string(profile) {
            Ok(json) => self.local.set(PROFILE_KEY, &json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to cache profile locally: {}", e);
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStore;
    use crate::profile::store::{MemoryProfileStore, MockProfileStore};

    const USER: &str = "listener";

    fn track(uri: &str) -> NowPlaying {
        NowPlaying {
            track_name: "Song".into(),
            artist_name: "Band".into(),
            album_cover_url: None,
            uri: uri.into(),
        }
    }

    fn platform_user(id: &str) -> PlatformUser {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "display_name": "Listener",
            "images": [{"url": "https://pic"}]
        }))
        .unwrap()
    }

    async fn signed_up() -> (ProfileCache, Arc<MemoryProfileStore>) {
        let remote = Arc::new(MemoryProfileStore::new());
        let cache = ProfileCache::new(
            remote.clone(),
            Arc::new(MemoryStore::new()),
            CallPolicy::default(),
        );
        cache.sign_up(&platform_user(USER)).await.unwrap();
        (cache, remote)
    }

    #[tokio::test]
    async fn test_sign_up_creates_empty_profile() {
        let (cache, remote) = signed_up().await;

        let profile = remote.get(USER).await.unwrap().unwrap();
        assert!(profile.liked_songs.is_empty());
        assert!(!profile.is_ghost_mode);
        assert!(!profile.is_grid_view);
        assert_eq!(profile.username, "Listener");
        assert_eq!(profile.profile_pic_url.as_deref(), Some("https://pic"));

        let again = cache.sign_up(&platform_user(USER)).await.unwrap();
        assert!(!again.created);
    }

    #[tokio::test]
    async fn test_add_song_is_idempotent() {
        let (cache, remote) = signed_up().await;
        let song = LikedSong::from(&track("spotify:track:1"));

        assert!(cache.add_song_to_likes(USER, song.clone()).await.unwrap());
        assert!(!cache.add_song_to_likes(USER, song.clone()).await.unwrap());
        assert!(!cache.add_song_to_likes(USER, song).await.unwrap());

        assert_eq!(cache.liked_songs(USER).await.unwrap().len(), 1);
        assert_eq!(remote.get(USER).await.unwrap().unwrap().liked_songs.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_remove_then_check_with_interleaved_tick() {
        let (cache, _) = signed_up().await;
        let cache = Arc::new(cache);
        let uri = "spotify:track:7";
        cache
            .add_song_to_likes(USER, LikedSong::from(&track(uri)))
            .await
            .unwrap();

        let ticker = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .publish_presence(USER, Some(&track(uri)), None, Utc::now())
                    .await
            })
        };
        assert!(cache.remove_song_from_likes(USER, uri).await.unwrap());
        ticker.await.unwrap().unwrap();

        assert!(!cache.is_song_liked(USER, uri).await.unwrap());
        assert!(!cache.refresh_profile(USER).await.unwrap().liked_songs.contains(uri));
    }

    #[tokio::test]
    async fn test_ghost_mode_freezes_location() {
        let (cache, remote) = signed_up().await;
        let home = Coordinates::new(43.07, -89.40);
        cache
            .publish_presence(USER, None, Some(home), Utc::now())
            .await
            .unwrap();

        cache.set_ghost_mode(USER, true).await.unwrap();
        let elsewhere = Coordinates::new(40.71, -74.00);
        let snapshot = cache
            .publish_presence(USER, Some(&track("spotify:track:2")), Some(elsewhere), Utc::now())
            .await
            .unwrap();

        assert_eq!(snapshot.location(), Some(home));
        assert_eq!(snapshot.track_uri.as_deref(), Some("spotify:track:2"));
        let stored = remote.get(USER).await.unwrap().unwrap().presence.unwrap();
        assert_eq!(stored.location(), Some(home));
    }

    #[tokio::test]
    async fn test_ghost_mode_from_another_instance_freezes_location() {
        let (daemon, remote) = signed_up().await;
        let local: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let settings_cmd = ProfileCache::new(remote.clone(), local, CallPolicy::default());

        let home = Coordinates::new(43.07, -89.40);
        daemon
            .publish_presence(USER, None, Some(home), Utc::now())
            .await
            .unwrap();

        settings_cmd.set_ghost_mode(USER, true).await.unwrap();

        let away = Coordinates::new(51.5, -0.1);
        let snapshot = daemon
            .publish_presence(USER, None, Some(away), Utc::now())
            .await
            .unwrap();
        assert_eq!(snapshot.location(), Some(home));

        let stored = remote.get(USER).await.unwrap().unwrap();
        assert!(stored.is_ghost_mode);
        assert_eq!(stored.presence.unwrap().location(), Some(home));
    }

    #[tokio::test]
    async fn test_presence_tick_after_sign_out_elsewhere_keeps_session_gone() {
        use crate::core::session::Session;
        use crate::core::storage::FileStore;
        use secrecy::SecretString;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let remote = Arc::new(MemoryProfileStore::new());

        let daemon_local: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(path.clone()));
        let daemon_tokens = TokenStore::new(daemon_local.clone());
        daemon_tokens
            .set_session(&Session {
                access_token: SecretString::from("access"),
                refresh_token: SecretString::from("refresh"),
                user_id: USER.into(),
                scope: "user-read-playback-state".into(),
                expires_at: None,
            })
            .await
            .unwrap();
        let daemon = ProfileCache::new(remote.clone(), daemon_local, CallPolicy::default());
        daemon.sign_up(&platform_user(USER)).await.unwrap();

        TokenStore::new(Arc::new(FileStore::new(path.clone())))
            .clear()
            .await
            .unwrap();
        assert!(!daemon_tokens.has_session().await.unwrap());

        daemon
            .publish_presence(USER, None, Some(Coordinates::new(1.0, 2.0)), Utc::now())
            .await
            .unwrap();

        assert!(!daemon_tokens.has_session().await.unwrap());
        let reopened = TokenStore::new(Arc::new(FileStore::new(path)));
        assert!(reopened.session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_likes_from_separate_instances_are_not_lost() {
        let (daemon, remote) = signed_up().await;
        let local: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first = ProfileCache::new(remote.clone(), local.clone(), CallPolicy::default());
        let second = ProfileCache::new(remote.clone(), local, CallPolicy::default());
        let a = "spotify:track:A";
        let b = "spotify:track:B";

        assert!(first.add_song_to_likes(USER, LikedSong::from(&track(a))).await.unwrap());
        daemon
            .publish_presence(USER, Some(&track(a)), None, Utc::now())
            .await
            .unwrap();
        assert!(second.add_song_to_likes(USER, LikedSong::from(&track(b))).await.unwrap());

        let stored = remote.get(USER).await.unwrap().unwrap().liked_songs;
        assert!(stored.contains(a));
        assert!(stored.contains(b));

        // The daemon's warm copy must not resurrect a removed song
        assert!(first.remove_song_from_likes(USER, a).await.unwrap());
        assert!(!daemon.is_song_liked(USER, a).await.unwrap());
        daemon
            .publish_presence(USER, None, None, Utc::now())
            .await
            .unwrap();
        assert!(!second.is_song_liked(USER, a).await.unwrap());
        assert!(second.is_song_liked(USER, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_location_keeps_previous() {
        let (cache, _) = signed_up().await;
        let home = Coordinates::new(1.0, 2.0);
        cache
            .publish_presence(USER, None, Some(home), Utc::now())
            .await
            .unwrap();

        let snapshot = cache
            .publish_presence(USER, None, None, Utc::now())
            .await
            .unwrap();
        assert_eq!(snapshot.location(), Some(home));
        assert!(snapshot.track_name.is_none());
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_cache_untouched() {
        let mut remote = MockProfileStore::new();
        remote
            .expect_get()
            .returning(|id| Ok(Some(UserProfile::new(id, "listener"))));
        remote
            .expect_update()
            .returning(|_, _| Err(ScoutError::ProfileStore("503".into())));

        let cache = ProfileCache::new(
            Arc::new(remote),
            Arc::new(MemoryStore::new()),
            CallPolicy::default(),
        );
        let mut settings = cache.subscribe();

        assert!(cache.set_ghost_mode(USER, true).await.is_err());
        assert!(!cache.profile(USER).await.unwrap().is_ghost_mode);
        assert!(!settings.borrow_and_update().is_ghost_mode);

        let added = cache
            .add_song_to_likes(USER, LikedSong::from(&track("spotify:track:1")))
            .await;
        assert!(matches!(added, Err(ScoutError::ProfileStore(_))));
        assert!(!cache.is_song_liked(USER, "spotify:track:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_through_populates_local_storage() {
        let remote = Arc::new(MemoryProfileStore::new());
        remote.set(&UserProfile::new(USER, "listener")).await.unwrap();
        let local = Arc::new(MemoryStore::new());

        let cache = ProfileCache::new(remote.clone(), local.clone(), CallPolicy::default());
        cache.profile(USER).await.unwrap();
        assert!(local.get(PROFILE_KEY).await.unwrap().is_some());

        // A second cache over the same local storage needs no remote document
        remote.delete(USER).await.unwrap();
        let reopened = ProfileCache::new(remote, local, CallPolicy::default());
        assert_eq!(reopened.profile(USER).await.unwrap().id, USER);
    }

    #[tokio::test]
    async fn test_unknown_profile_is_not_found() {
        let cache = ProfileCache::new(
            Arc::new(MemoryProfileStore::new()),
            Arc::new(MemoryStore::new()),
            CallPolicy::default(),
        );
        assert!(matches!(
            cache.profile("nobody").await,
            Err(ScoutError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_settings_are_published() {
        let (cache, _) = signed_up().await;
        let mut settings = cache.subscribe();

        cache.set_grid_view(USER, true).await.unwrap();
        assert!(settings.has_changed().unwrap());
        assert!(settings.borrow_and_update().is_grid_view);

        cache.update_username(USER, "renamed").await.unwrap();
        assert!(!settings.has_changed().unwrap());
        assert_eq!(cache.profile(USER).await.unwrap().username, "renamed");
    }

    #[tokio::test]
    async fn test_profile_edits_validate_input() {
        let (cache, _) = signed_up().await;
        assert!(matches!(
            cache.update_username(USER, "  ").await,
            Err(ScoutError::InvalidInput(_))
        ));
        assert!(matches!(
            cache.update_profile_pic(USER, "not a url").await,
            Err(ScoutError::InvalidInput(_))
        ));
        cache
            .update_profile_pic(USER, "https://img.example/me.png")
            .await
            .unwrap();
        assert_eq!(
            cache.profile(USER).await.unwrap().profile_pic_url.as_deref(),
            Some("https://img.example/me.png")
        );
    }

    #[tokio::test]
    async fn test_nearby_users_split_and_exclude_self() {
        let (cache, remote) = signed_up().await;
        let origin = Coordinates::new(43.0749, -89.4039);
        cache
            .publish_presence(USER, None, Some(origin), Utc::now())
            .await
            .unwrap();

        let place = |id: &str, lat: f64, lon: f64, ghost: bool| {
            let mut profile = UserProfile::new(id, id);
            profile.is_ghost_mode = ghost;
            profile.presence = Some(PresenceSnapshot::new(
                None,
                Some(Coordinates::new(lat, lon)),
                Utc::now(),
            ));
            profile
        };
        remote.set(&place("close", 43.0755, -89.4045, false)).await.unwrap();
        remote.set(&place("closer", 43.0750, -89.4040, false)).await.unwrap();
        remote.set(&place("far", 43.0389, -87.9065, false)).await.unwrap();
        remote.set(&place("hidden", 43.0750, -89.4040, true)).await.unwrap();
        remote.set(&UserProfile::new("nowhere", "nowhere")).await.unwrap();

        let hood = cache.nearby_users(USER, origin, 1.0).await.unwrap();
        let ids = |list: &[NearbyListener]| {
            list.iter().map(|l| l.profile.id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(hood.nearby.as_slice()), vec!["closer", "close"]);
        assert_eq!(ids(hood.distant.as_slice()), vec!["far"]);
    }

    #[tokio::test]
    async fn test_delete_account_clears_everything() {
        let local = Arc::new(MemoryStore::new());
        let tokens = TokenStore::new(local.clone());
        tokens.set_pending_verifier("verifier").await.unwrap();
        let remote = Arc::new(MemoryProfileStore::new());
        let cache = ProfileCache::new(remote.clone(), local.clone(), CallPolicy::default());
        cache.sign_up(&platform_user(USER)).await.unwrap();

        cache.delete_account(USER, &tokens).await.unwrap();

        assert!(remote.get(USER).await.unwrap().is_none());
        assert!(local.is_empty().await);
        assert!(matches!(
            cache.profile(USER).await,
            Err(ScoutError::ProfileNotFound(_))
        ));
    }
}
