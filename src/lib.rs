//! soundscout - Session, presence sync and profile cache for SoundScout
//!
//! This library signs users in to Spotify (OAuth 2.0 with PKCE), keeps their
//! access token fresh, periodically publishes what they are listening to and
//! where, and mirrors their profile document locally. The `soundscout` binary
//! drives it from the command line.

pub mod cli;
pub mod core;
pub mod error;
pub mod profile;
pub mod spotify;
pub mod sync;

pub use error::{Result, ScoutError};
