//! Deadline and cancellation policy for remote calls
//!
//! Every network operation goes through [`call`]: it fails with `Timeout`
//! once the deadline passes and with `Cancelled` as soon as the token fires,
//! whichever comes first.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScoutError};

/// Deadline plus cancellation for a single remote operation
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl CallPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Same deadline, cancelled together with `cancel`
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            timeout: self.timeout,
            cancel,
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// Shared HTTP client; `timeout` also bounds requests made outside [`call`]
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("soundscout/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ScoutError::from)
}

/// Run `fut` under `policy`
pub async fn call<T, F>(policy: &CallPolicy, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if policy.cancel.is_cancelled() {
        return Err(ScoutError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = policy.cancel.cancelled() => Err(ScoutError::Cancelled),
        outcome = tokio::time::timeout(policy.timeout, fut) => match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!("Remote call exceeded {:?}", policy.timeout);
                Err(ScoutError::Timeout)
            }
        },
    }
}
