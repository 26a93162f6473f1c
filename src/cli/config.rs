//! Configuration CLI command handlers

use crate::cli::commands::{ConfigCommand, ConfigKey};
use crate::core::config::{Config, StorageBackend};
use crate::error::{Result, ScoutError};
use crate::profile::model::Coordinates;

/// Handle configuration commands
pub fn handle_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Set { key, value } => handle_set(key, value),
        ConfigCommand::Get { key } => handle_get(key),
        ConfigCommand::Remove { key } => handle_remove(key),
        ConfigCommand::Path => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
    }
}

/// Handle setting a configuration value
fn handle_set(key: ConfigKey, value: String) -> Result<()> {
    let mut config = Config::load()?;
    apply(&mut config, key, value.trim())?;
    config.save()?;

    println!("{} set to: {}", key_name(key), display(&config, key));
    Ok(())
}

/// Handle getting a configuration value
fn handle_get(key: ConfigKey) -> Result<()> {
    let config = Config::load()?;
    println!("{}: {}", key_name(key), display(&config, key));
    Ok(())
}

/// Handle removing a configuration value
fn handle_remove(key: ConfigKey) -> Result<()> {
    let mut config = Config::load()?;
    reset(&mut config, key);
    config.save()?;

    println!("{} reset to default: {}", key_name(key), display(&config, key));
    Ok(())
}

/// Parse and store `value` under `key`
pub fn apply(config: &mut Config, key: ConfigKey, value: &str) -> Result<()> {
    match key {
        ConfigKey::ClientId => {
            if value.is_empty() {
                return Err(ScoutError::InvalidInput("Client ID cannot be empty".into()));
            }
            config.client_id = value.to_string();
        }
        ConfigKey::RedirectUri => config.redirect_uri = parse_url(value)?,
        ConfigKey::ProfileStoreUrl => config.profile_store_url = Some(parse_url(value)?),
        ConfigKey::SyncInterval => config.sync_interval_secs = parse_positive(value)?,
        ConfigKey::RequestTimeout => config.request_timeout_secs = parse_positive(value)?,
        ConfigKey::Storage => {
            let storage = StorageBackend::from_str(value).ok_or_else(|| {
                ScoutError::InvalidInput(format!(
                    "Invalid storage '{}'. Available backends: {}",
                    value,
                    StorageBackend::all()
                        .iter()
                        .map(|b| b.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;
            config.set_storage(storage);
        }
        ConfigKey::Location => config.location = Some(parse_location(value)?),
        ConfigKey::NearbyRadius => {
            let radius: f64 = value
                .parse()
                .map_err(|_| ScoutError::InvalidInput(format!("Invalid radius '{}'", value)))?;
            if !radius.is_finite() || radius <= 0.0 {
                return Err(ScoutError::InvalidInput("Radius must be positive".into()));
            }
            config.nearby_radius_km = radius;
        }
    }
    Ok(())
}

fn reset(config: &mut Config, key: ConfigKey) {
    let defaults = Config::default();
    match key {
        ConfigKey::ClientId => config.client_id = defaults.client_id,
        ConfigKey::RedirectUri => config.redirect_uri = defaults.redirect_uri,
        ConfigKey::ProfileStoreUrl => config.profile_store_url = None,
        ConfigKey::SyncInterval => config.sync_interval_secs = defaults.sync_interval_secs,
        ConfigKey::RequestTimeout => config.request_timeout_secs = defaults.request_timeout_secs,
        ConfigKey::Storage => config.set_storage(defaults.storage),
        ConfigKey::Location => config.location = None,
        ConfigKey::NearbyRadius => config.nearby_radius_km = defaults.nearby_radius_km,
    }
}

fn key_name(key: ConfigKey) -> &'static str {
    match key {
        ConfigKey::ClientId => "Client ID",
        ConfigKey::RedirectUri => "Redirect URI",
        ConfigKey::ProfileStoreUrl => "Profile store URL",
        ConfigKey::SyncInterval => "Sync interval",
        ConfigKey::RequestTimeout => "Request timeout",
        ConfigKey::Storage => "Storage",
        ConfigKey::Location => "Location",
        ConfigKey::NearbyRadius => "Nearby radius",
    }
}

fn display(config: &Config, key: ConfigKey) -> String {
    match key {
        ConfigKey::ClientId => config.client_id.clone(),
        ConfigKey::RedirectUri => config.redirect_uri.clone(),
        ConfigKey::ProfileStoreUrl => config
            .profile_store_url
            .clone()
            .unwrap_or_else(|| "Not configured".to_string()),
        ConfigKey::SyncInterval => format!("{}s", config.sync_interval_secs),
        ConfigKey::RequestTimeout => format!("{}s", config.request_timeout_secs),
        ConfigKey::Storage => config.storage.to_string(),
        ConfigKey::Location => config
            .location
            .map(|c| format!("{}, {}", c.latitude, c.longitude))
            .unwrap_or_else(|| "Not configured".to_string()),
        ConfigKey::NearbyRadius => format!("{} km", config.nearby_radius_km),
    }
}

fn parse_url(value: &str) -> Result<String> {
    url::Url::parse(value)
        .map_err(|e| ScoutError::InvalidInput(format!("Invalid URL '{}': {}", value, e)))?;
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_positive(value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ScoutError::InvalidInput(format!(
            "Expected a positive number of seconds, got '{}'",
            value
        ))),
    }
}

/// Parse "lat,lon" in decimal degrees
fn parse_location(value: &str) -> Result<Coordinates> {
    let invalid = || {
        ScoutError::InvalidInput(format!(
            "Invalid location '{}'. Expected \"<lat>,<lon>\", e.g. 43.07,-89.40",
            value
        ))
    };

    let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;
    let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let longitude: f64 = lon.trim().parse().map_err(|_| invalid())?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid());
    }
    Ok(Coordinates::new(latitude, longitude))
}
