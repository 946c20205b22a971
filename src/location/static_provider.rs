//! Fixed-position provider.
//!
//! Stands in for a GPS on machines without one: a field-station camera
//! or a CLI run with `--lat/--lon`. Permission is always granted.

use super::{Accuracy, LocationProvider, LocationSample, PermissionStatus};
use crate::error::LocationError;

#[derive(Debug, Clone, Copy)]
pub struct StaticLocationProvider {
    sample: LocationSample,
}

impl StaticLocationProvider {
    /// Coordinates outside WGS84 ranges are rejected.
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: Option<f64>) -> Result<Self, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::InvalidCoordinates(format!(
                "latitude {} out of range",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidCoordinates(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        if let Some(acc) = accuracy_meters {
            if !acc.is_finite() || acc < 0.0 {
                return Err(LocationError::InvalidCoordinates(format!(
                    "accuracy {} must be a non-negative number",
                    acc
                )));
            }
        }
        Ok(Self {
            sample: LocationSample {
                latitude,
                longitude,
                accuracy_meters,
            },
        })
    }
}

#[async_trait::async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<LocationSample, String> {
        Ok(self.sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(
            StaticLocationProvider::new(91.0, 0.0, None).unwrap_err(),
            LocationError::InvalidCoordinates("latitude 91 out of range".to_string())
        );
        assert_eq!(
            StaticLocationProvider::new(0.0, -181.0, None).unwrap_err(),
            LocationError::InvalidCoordinates("longitude -181 out of range".to_string())
        );
        assert!(matches!(
            StaticLocationProvider::new(0.0, 0.0, Some(-1.0)),
            Err(LocationError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            StaticLocationProvider::new(f64::NAN, 0.0, None),
            Err(LocationError::InvalidCoordinates(_))
        ));
    }

    #[tokio::test]
    async fn returns_configured_sample() {
        let provider = StaticLocationProvider::new(52.1, 5.2, Some(10.0)).unwrap();
        assert_eq!(provider.request_permission().await, PermissionStatus::Granted);
        let fix = provider.current_position(Accuracy::High).await.unwrap();
        assert_eq!(fix.latitude, 52.1);
        assert_eq!(fix.accuracy_meters, Some(10.0));
    }
}
