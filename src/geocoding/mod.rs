//! Geocoding gateway: address text to coordinates and back.
//!
//! The engine only talks to the [`GeocodingGateway`] trait. Concrete
//! providers live in submodules: Nominatim over HTTP and an offline gateway
//! that never finds anything.

pub mod nominatim;
pub mod offline;
pub mod types;

use async_trait::async_trait;

use crate::geo::GeoPoint;

pub use nominatim::{NominatimConfig, NominatimGateway};
pub use offline::OfflineGateway;
pub use types::{GeocodeError, StructuredAddress};

/// Converts address text into coordinates and coordinates into addresses.
///
/// `GeocodeError::NotFound` is the normal "no result" answer. Every other
/// variant is a provider failure; callers decide through
/// [`crate::policy::GatewayErrorPolicy`] whether that aborts or falls through.
/// Implementations must not retry on their own.
#[async_trait]
pub trait GeocodingGateway: Send + Sync {
    async fn forward(&self, query: &str) -> Result<GeoPoint, GeocodeError>;

    async fn reverse(&self, point: GeoPoint) -> Result<StructuredAddress, GeocodeError>;
}
