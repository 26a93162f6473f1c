//! Spotify integration
//!
//! Sign-in with PKCE and the Web API endpoints the app uses.

pub mod auth;
pub mod client;
pub mod pkce;

pub use auth::{PkceAuth, SpotifyAccounts, TokenEndpoint};
pub use client::{MusicPlatform, SpotifyClient};
