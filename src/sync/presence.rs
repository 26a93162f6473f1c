//! Presence sync loop
//!
//! Periodically publishes what the user is listening to and where they are,
//! and reports what happened on an event channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::remote::{self, CallPolicy};
use crate::core::token_manager::TokenManager;
use crate::error::{Result, ScoutError};
use crate::profile::cache::ProfileCache;
use crate::profile::model::{Coordinates, NowPlaying, PresenceSnapshot};
use crate::spotify::client::MusicPlatform;
use crate::sync::location::{LocationProvider, Permission};

const EVENT_BUFFER: usize = 32;

/// Lifecycle of a [`PresenceSyncer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Tracking,
}

/// Events from the sync loop
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A snapshot was written to the profile store
    Published(PresenceSnapshot),
    /// Location permission is denied; only track data will be published
    PermissionDenied,
    /// A tick failed; the loop keeps running
    Error(String),
    /// The session is gone; the loop has stopped
    ReauthRequired,
    /// The loop exited
    Stopped,
}

/// Everything a tick talks to
#[derive(Clone)]
pub struct SyncServices {
    pub tokens: Arc<TokenManager>,
    pub platform: Arc<dyn MusicPlatform>,
    pub profiles: Arc<ProfileCache>,
    pub location: Arc<dyn LocationProvider>,
    pub policy: CallPolicy,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic presence publisher
///
/// `Idle` until [`start`](Self::start), `Tracking` until [`stop`](Self::stop)
/// or until the session can no longer be refreshed. Dropping the syncer stops
/// the loop.
pub struct PresenceSyncer {
    user_id: String,
    services: SyncServices,
    period: Duration,
    tx: mpsc::Sender<SyncEvent>,
    tracking: Arc<AtomicBool>,
    /// Set once location permission was found denied; never asked again
    location_denied: Arc<AtomicBool>,
    running: Option<Running>,
}

impl PresenceSyncer {
    /// Create a syncer and return the event receiver
    pub fn new(
        user_id: impl Into<String>,
        services: SyncServices,
        period: Duration,
    ) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let syncer = Self {
            user_id: user_id.into(),
            services,
            period,
            tx,
            tracking: Arc::new(AtomicBool::new(false)),
            location_denied: Arc::new(AtomicBool::new(false)),
            running: None,
        };
        (syncer, rx)
    }

    pub fn state(&self) -> SyncState {
        if self.tracking.load(Ordering::Acquire) {
            SyncState::Tracking
        } else {
            SyncState::Idle
        }
    }

    /// Idle → Tracking; no-op while already tracking
    pub fn start(&mut self) {
        if self.state() == SyncState::Tracking {
            tracing::debug!("Presence sync already running");
            return;
        }

        let cancel = CancellationToken::new();
        let worker = Worker {
            user_id: self.user_id.clone(),
            policy: self.services.policy.with_cancel(cancel.child_token()),
            services: self.services.clone(),
            tx: self.tx.clone(),
            tracking: Arc::clone(&self.tracking),
            location_denied: Arc::clone(&self.location_denied),
        };

        self.tracking.store(true, Ordering::Release);
        let handle = tokio::spawn(worker.run(self.period, cancel.clone()));
        tracing::info!("Presence sync started every {:?}", self.period);

        self.running = Some(Running { cancel, handle });
    }

    /// Tracking → Idle; waits for the loop to exit
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                tracing::warn!("Presence sync task ended abnormally: {}", e);
            }
        }
        self.tracking.store(false, Ordering::Release);
    }
}

impl Drop for PresenceSyncer {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

struct Worker {
    user_id: String,
    services: SyncServices,
    policy: CallPolicy,
    tx: mpsc::Sender<SyncEvent>,
    tracking: Arc<AtomicBool>,
    location_denied: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self, period: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.tick() => outcome,
            };

            match outcome {
                Ok(snapshot) => {
                    tracing::debug!(
                        "Published presence (track: {})",
                        snapshot.track_name.as_deref().unwrap_or("none")
                    );
                    self.emit(SyncEvent::Published(snapshot));
                }
                Err(e) if e.requires_reauth() => {
                    tracing::warn!("Presence sync stopping, sign-in required: {}", e);
                    self.tracking.store(false, Ordering::Release);
                    // A full channel must not keep stop() waiting
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        _ = self.tx.send(SyncEvent::ReauthRequired) => {}
                    }
                    break;
                }
                Err(ScoutError::Cancelled) => break,
                Err(e) => {
                    if e.is_transient() {
                        tracing::info!("Presence sync tick failed, retrying next tick: {}", e);
                    } else {
                        tracing::warn!("Presence sync tick failed: {}", e);
                    }
                    self.emit(SyncEvent::Error(e.to_string()));
                }
            }
        }

        self.tracking.store(false, Ordering::Release);
        self.emit(SyncEvent::Stopped);
    }

    async fn tick(&self) -> Result<PresenceSnapshot> {
        let token = self.services.tokens.ensure_valid_token().await?;
        let now_playing = self.now_playing(token).await?;
        let location = self.locate().await;

        self.services
            .profiles
            .publish_presence(&self.user_id, now_playing.as_ref(), location, Utc::now())
            .await
    }

    /// Current track; a rejected token is refreshed once and the call retried
    async fn now_playing(&self, token: SecretString) -> Result<Option<NowPlaying>> {
        let platform = &self.services.platform;
        match remote::call(&self.policy, platform.currently_playing(&token)).await {
            Err(ScoutError::Unauthorized) => {
                tracing::debug!("Access token rejected, forcing refresh");
                let token = self.services.tokens.force_refresh().await?;
                remote::call(&self.policy, platform.currently_playing(&token)).await
            }
            other => other,
        }
    }

    /// Position to publish, or `None` when it is unavailable this tick
    async fn locate(&self) -> Option<Coordinates> {
        if self.location_denied.load(Ordering::Acquire) {
            return None;
        }

        let provider = &self.services.location;
        if provider.permission().await == Permission::Denied {
            self.location_denied.store(true, Ordering::Release);
            tracing::info!("Location permission denied, publishing track data only");
            self.emit(SyncEvent::PermissionDenied);
            return None;
        }

        match remote::call(&self.policy, provider.current_position()).await {
            Ok(position) => Some(position),
            Err(ScoutError::PermissionDenied(reason)) => {
                self.location_denied.store(true, Ordering::Release);
                tracing::info!("Location permission revoked: {}", reason);
                self.emit(SyncEvent::PermissionDenied);
                None
            }
            Err(e) => {
                tracing::debug!("Location unavailable this tick: {}", e);
                None
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::trace!("Dropped sync event: {}", e);
        }
    }
}
