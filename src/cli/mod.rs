//! CLI module for soundscout
//!
//! This module contains all CLI command definitions and handlers using clap.

pub mod commands;
pub mod context;
pub mod auth;
pub mod sync;
pub mod likes;
pub mod playlist;
pub mod settings;
pub mod profile;
pub mod nearby;
pub mod config;

pub use commands::{Cli, Commands};
