//! Delivery zone engine: decides whether an address is serviceable and which
//! delivery fee applies, given a business's configured service regions.
//!
//! ```no_run
//! use std::sync::Arc;
//! use zonefee::{AddressValidator, DeliveryFeeResolver, OfflineGateway, ResolutionPolicy};
//!
//! # async fn demo(address: zonefee::Address, regions: Vec<zonefee::ServiceRegion>) {
//! let fees = DeliveryFeeResolver::new(Arc::new(OfflineGateway), ResolutionPolicy::default());
//! let validator = AddressValidator::new(fees);
//! let verdict = validator.validate(&address, &regions).await;
//! println!("{} {:?}", verdict.is_valid, verdict.fee);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fee;
pub mod geo;
pub mod geocoding;
pub mod logging;
pub mod policy;
pub mod server;
pub mod validator;
pub mod zone;

pub use error::{Result, ZoneError};
pub use fee::{DeliveryFeeResolver, FeeQuote, Lookup};
pub use geo::{distance_km, GeoPoint};
pub use geocoding::{GeocodeError, GeocodingGateway, NominatimGateway, OfflineGateway, StructuredAddress};
pub use policy::{GatewayErrorPolicy, ResolutionPolicy, UnmatchedPolicy};
pub use validator::{AddressValidator, Validation};
pub use zone::{Address, RegionKind, RegionSnapshot, ServiceRegion, Strategy, ZoneMatch, ZoneResolver};
