//! Gateway used in offline mode: never reaches the network, never finds
//! anything. Resolution then relies on neighborhood names, stored
//! coordinates and the fallback strategies.

use async_trait::async_trait;

use super::types::{GeocodeError, StructuredAddress};
use super::GeocodingGateway;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGateway;

#[async_trait]
impl GeocodingGateway for OfflineGateway {
    async fn forward(&self, query: &str) -> Result<GeoPoint, GeocodeError> {
        Err(GeocodeError::NotFound(query.to_string()))
    }

    async fn reverse(&self, point: GeoPoint) -> Result<StructuredAddress, GeocodeError> {
        Err(GeocodeError::NotFound(format!("{}, {}", point.latitude, point.longitude)))
    }
}
