//! Presence synchronization

pub mod location;
pub mod presence;

pub use presence::{PresenceSyncer, SyncEvent, SyncServices, SyncState};
