//! Location domain — best-effort geotagging of scans.
//!
//! The device side (permission prompt, GPS fix) is a capability behind
//! `LocationProvider`. `LocationEnricher` wraps it with the rules the scan
//! flow relies on: permission first, one high-accuracy fix, bounded by a
//! timeout, and every failure reported instead of raised.
//!
//! - static_provider.rs — fixed coordinates (CLI flags, fixed installs)

mod static_provider;

pub use static_provider::StaticLocationProvider;

use crate::error::LocationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "accuracy", default)]
    pub accuracy_meters: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Requested fix quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    High,
    Balanced,
}

/// Device geolocation capability.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask for foreground location permission.
    async fn request_permission(&self) -> PermissionStatus;

    /// Single-shot position.
    async fn current_position(&self, accuracy: Accuracy) -> Result<LocationSample, String>;
}

/// What happened when location was attempted for a scan.
///
/// `Absent` (no enricher configured) is a normal state, distinct from
/// `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationStatus {
    Absent,
    Acquired(LocationSample),
    Failed(LocationError),
}

impl LocationStatus {
    pub fn sample(&self) -> Option<LocationSample> {
        match self {
            LocationStatus::Acquired(sample) => Some(*sample),
            _ => None,
        }
    }
}

/// Acquires a location for a scan without ever failing the scan.
#[derive(Clone)]
pub struct LocationEnricher {
    provider: Arc<dyn LocationProvider>,
    timeout: Duration,
}

impl LocationEnricher {
    pub fn new(provider: Arc<dyn LocationProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Permission, then one high-accuracy fix within the timeout.
    pub async fn acquire(&self) -> Result<LocationSample, LocationError> {
        if self.provider.request_permission().await == PermissionStatus::Denied {
            log::warn!("[LOCATION] Permission to access location was denied");
            return Err(LocationError::PermissionDenied);
        }

        let start = std::time::Instant::now();
        let fix = tokio::time::timeout(self.timeout, self.provider.current_position(Accuracy::High))
            .await;
        match fix {
            Ok(Ok(sample)) => {
                log::info!(
                    "[LOCATION] Fix {:.6}, {:.6} in {}ms",
                    sample.latitude,
                    sample.longitude,
                    start.elapsed().as_millis()
                );
                Ok(sample)
            }
            Ok(Err(reason)) => {
                log::warn!("[LOCATION] Error getting location: {}", reason);
                Err(LocationError::AcquisitionFailed { reason })
            }
            Err(_) => {
                log::warn!("[LOCATION] No fix within {:?}", self.timeout);
                Err(LocationError::AcquisitionFailed {
                    reason: format!("timed out after {:?}", self.timeout),
                })
            }
        }
    }

    /// `acquire()` folded into a status for the scan flow.
    pub async fn status(&self) -> LocationStatus {
        match self.acquire().await {
            Ok(sample) => LocationStatus::Acquired(sample),
            Err(e) => LocationStatus::Failed(e),
        }
    }
}
