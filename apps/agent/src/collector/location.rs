//! Permission-gated location lookup with a freshness cutoff.
//!
//! Policy, in order:
//! 1. No permission → sentinel pair.
//! 2. Cached last-known fix younger than `max_age` → use it.
//! 3. Fresh fix, bounded by `timeout` → use it.
//! 4. Anything else (timeout, provider error, no fix) → sentinel pair.
//!
//! The collector never returns an error; a missing location only degrades the
//! GPS fields of the snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::snapshot::GeoPoint;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed fix: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A position sample and the time it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// The most recent cached fix, if any. Must not block on hardware.
    async fn last_known(&self) -> Result<Option<LocationFix>, LocationError>;

    /// Requests a new fix taken no earlier than `since`. May wait arbitrarily
    /// long; the collector bounds it with its own timeout.
    async fn current(&self, since: DateTime<Utc>) -> Result<Option<LocationFix>, LocationError>;
}

#[derive(Debug, Clone, Copy)]
pub struct LocationPolicy {
    pub permission_granted: bool,
    pub max_age: Duration,
    pub timeout: Duration,
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            permission_granted: true,
            max_age: Duration::from_secs(5 * 60),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Clone)]
pub struct LocationCollector {
    provider: Arc<dyn LocationProvider>,
    policy: LocationPolicy,
}

impl LocationCollector {
    pub fn new(provider: Arc<dyn LocationProvider>, policy: LocationPolicy) -> Self {
        Self { provider, policy }
    }

    pub async fn locate(&self) -> GeoPoint {
        let point = self.locate_at(Utc::now()).await;
        if point.is_sentinel() {
            warn!("GPS coordinates are 0,0 - location may not be available");
        }
        point
    }

    /// Applies the policy as if the current time were `now`.
    pub async fn locate_at(&self, now: DateTime<Utc>) -> GeoPoint {
        if !self.policy.permission_granted {
            warn!("Location permission not granted");
            return GeoPoint::SENTINEL;
        }

        match self.provider.last_known().await {
            Ok(Some(fix)) => {
                let age = now.signed_duration_since(fix.timestamp);
                debug!("Last known location age: {} seconds", age.num_seconds());
                // A fix stamped in the future (clock skew) counts as fresh.
                let fresh = age
                    .to_std()
                    .map(|age| age < self.policy.max_age)
                    .unwrap_or(true);
                if fresh {
                    debug!("Using cached location");
                    return fix.point();
                }
                debug!("Cached location too old, requesting fresh location");
            }
            Ok(None) => debug!("No cached location"),
            Err(e) => warn!("Failed to get last location: {e}"),
        }

        match tokio::time::timeout(self.policy.timeout, self.provider.current(now)).await {
            Ok(Ok(Some(fix))) => {
                debug!("Fresh location obtained");
                fix.point()
            }
            Ok(Ok(None)) => {
                warn!("Fresh location request returned nothing");
                GeoPoint::SENTINEL
            }
            Ok(Err(e)) => {
                warn!("Fresh location request failed: {e}");
                GeoPoint::SENTINEL
            }
            Err(_) => {
                warn!(
                    "Fresh location request timed out after {}s",
                    self.policy.timeout.as_secs()
                );
                GeoPoint::SENTINEL
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Providers
// ────────────────────────────────────────────────────────────────────────────

/// Host has no positioning source; every lookup yields the sentinel pair.
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn last_known(&self) -> Result<Option<LocationFix>, LocationError> {
        Ok(None)
    }

    async fn current(&self, _since: DateTime<Utc>) -> Result<Option<LocationFix>, LocationError> {
        Ok(None)
    }
}

/// Reads fixes from a JSON file (`{"lat":..,"lon":..,"timestamp":".."}`)
/// kept up to date by an external GPS bridge (e.g. a gpsd client).
/// A fresh request polls the file until a fix newer than the request appears.
pub struct FileLocationProvider {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileLocationProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn read_fix(&self) -> Result<Option<LocationFix>, LocationError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LocationError::Io(e)),
        }
    }
}

#[async_trait]
impl LocationProvider for FileLocationProvider {
    async fn last_known(&self) -> Result<Option<LocationFix>, LocationError> {
        self.read_fix().await
    }

    async fn current(&self, since: DateTime<Utc>) -> Result<Option<LocationFix>, LocationError> {
        loop {
            match self.read_fix().await {
                Ok(Some(fix)) if fix.timestamp >= since => return Ok(Some(fix)),
                Ok(_) => {}
                Err(LocationError::Parse(e)) => debug!("Skipping malformed fix: {e}"),
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
