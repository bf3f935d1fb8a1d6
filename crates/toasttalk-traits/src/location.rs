//! Location collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// Reserved coordinate value meaning "resolve the device's current location".
/// A coordinate pair where both parts equal this value is the sentinel.
pub const CURRENT_LOCATION_SENTINEL: f64 = -999.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_current_location(&self) -> bool {
        self.latitude == CURRENT_LOCATION_SENTINEL && self.longitude == CURRENT_LOCATION_SENTINEL
    }
}

/// Resolves the device's current position.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn current_location(&self) -> Result<Coordinate, CollaboratorError>;
}

/// Always answers with a configured position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

#[async_trait]
impl LocationResolver for FixedLocation {
    async fn current_location(&self) -> Result<Coordinate, CollaboratorError> {
        Ok(self.0)
    }
}

/// Used when no location source is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLocation;

#[async_trait]
impl LocationResolver for UnavailableLocation {
    async fn current_location(&self) -> Result<Coordinate, CollaboratorError> {
        Err(CollaboratorError::LocationUnavailable(
            "no location source configured".to_string(),
        ))
    }
}
