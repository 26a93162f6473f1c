//! Core functionality for soundscout
//!
//! This module contains shared plumbing including:
//! - Application configuration
//! - Local key-value persistence
//! - Session storage and token lifecycle management
//! - Deadlines and cancellation for remote calls

pub mod config;
pub mod remote;
pub mod session;
pub mod storage;
pub mod token_manager;
pub mod token_store;

pub use config::Config;
pub use session::Session;
pub use token_manager::TokenManager;
pub use token_store::TokenStore;
