//! Device position source

use async_trait::async_trait;

use crate::core::config::Config;
use crate::error::{Result, ScoutError};
use crate::profile::model::Coordinates;

/// Whether the user allowed position access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Where the device is
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn permission(&self) -> Permission;

    /// Current position; only asked while permission is granted
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Position pinned in the configuration
///
/// No configured position means no permission.
#[derive(Debug, Clone, Default)]
pub struct FixedLocation {
    position: Option<Coordinates>,
}

impl FixedLocation {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.location)
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn permission(&self) -> Permission {
        match self.position {
            Some(_) => Permission::Granted,
            None => Permission::Denied,
        }
    }

    async fn current_position(&self) -> Result<Coordinates> {
        self.position.ok_or_else(|| {
            ScoutError::PermissionDenied("No location configured".to_string())
        })
    }
}
