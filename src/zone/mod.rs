//! Zone model and the strategy chain that maps an address to a region.

pub mod resolver;
pub mod strategy;
pub mod types;

pub use resolver::ZoneResolver;
pub use strategy::Strategy;
pub use types::{Address, RegionKind, RegionSnapshot, ServiceRegion, ZoneMatch};
