//! Core types for zone resolution: regions, addresses and match results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ZoneError};
use crate::geo::GeoPoint;

use super::strategy::Strategy;

/// Kind-specific shape of a service region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegionKind {
    /// Matched by name against the address neighborhood.
    Neighborhood {
        neighborhood_name: String,
        #[serde(default)]
        city: Option<String>,
    },
    /// Circle around a center point.
    RadiusFromPoint {
        center_latitude: f64,
        center_longitude: f64,
        radius_km: f64,
    },
    /// Postal code interval. No matching rule exists yet, never matches.
    PostalCodeRange { start_code: String, end_code: String },
    /// Explicit catch-all region for the business.
    DefaultFallback,
    /// Reserved. Containment is not implemented, never matches.
    Polygon {
        #[serde(default)]
        vertices: Vec<GeoPoint>,
    },
}

impl RegionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Neighborhood { .. } => "neighborhood",
            Self::RadiusFromPoint { .. } => "radius_from_point",
            Self::PostalCodeRange { .. } => "postal_code_range",
            Self::DefaultFallback => "default_fallback",
            Self::Polygon { .. } => "polygon",
        }
    }
}

/// A configured area with its delivery fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRegion {
    pub id: String,
    pub business_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub fee: Decimal,
    #[serde(flatten)]
    pub kind: RegionKind,
}

fn default_active() -> bool {
    true
}

impl ServiceRegion {
    /// Check the numeric invariants: non-negative fee, positive finite
    /// radius and sane center for radius regions.
    pub fn validate(&self) -> Result<()> {
        if self.fee < Decimal::ZERO {
            return Err(self.invalid(format!("negative fee {}", self.fee)));
        }
        if let RegionKind::RadiusFromPoint {
            center_latitude,
            center_longitude,
            radius_km,
        } = self.kind
        {
            if !(radius_km.is_finite() && radius_km > 0.0) {
                return Err(self.invalid(format!("radius must be positive, got {}", radius_km)));
            }
            if !GeoPoint::new(center_latitude, center_longitude).is_valid() {
                return Err(self.invalid(format!(
                    "center out of range: {}, {}",
                    center_latitude, center_longitude
                )));
            }
        }
        Ok(())
    }

    /// Center and radius, for radius regions only.
    pub fn circle(&self) -> Option<(GeoPoint, f64)> {
        match self.kind {
            RegionKind::RadiusFromPoint {
                center_latitude,
                center_longitude,
                radius_km,
            } => Some((GeoPoint::new(center_latitude, center_longitude), radius_km)),
            _ => None,
        }
    }

    pub fn is_radius(&self) -> bool {
        matches!(self.kind, RegionKind::RadiusFromPoint { .. })
    }

    fn invalid(&self, reason: String) -> ZoneError {
        ZoneError::InvalidRegion {
            id: self.id.clone(),
            reason,
        }
    }
}

/// The active, validated regions of one call. Built once per resolution and
/// never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct RegionSnapshot {
    regions: Vec<ServiceRegion>,
}

impl RegionSnapshot {
    /// Keep active regions in their original order. An active region that
    /// breaks an invariant fails the whole snapshot.
    pub fn new(regions: &[ServiceRegion]) -> Result<Self> {
        let mut active = Vec::with_capacity(regions.len());
        for region in regions.iter().filter(|r| r.active) {
            if let Err(e) = region.validate() {
                tracing::error!(region = %region.id, business = %region.business_id, error = %e, "rejecting region snapshot");
                return Err(e);
            }
            active.push(region.clone());
        }
        Ok(Self { regions: active })
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceRegion> {
        self.regions.iter()
    }

    pub fn radius_regions(&self) -> impl Iterator<Item = &ServiceRegion> {
        self.regions.iter().filter(|r| r.is_radius())
    }

    pub fn has_radius_regions(&self) -> bool {
        self.radius_regions().next().is_some()
    }

    /// Radius regions whose circle contains `point`, by plain distance.
    pub fn covering(&self, point: GeoPoint) -> impl Iterator<Item = &ServiceRegion> {
        self.radius_regions().filter(move |r| match r.circle() {
            Some((center, radius_km)) => center.distance_km(&point) <= radius_km,
            None => false,
        })
    }
}

/// A customer address. Coordinates stay empty until geocoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Address {
    /// Usable coordinates. Half-filled or out-of-range pairs count as none.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        let point = GeoPoint::new(self.latitude?, self.longitude?);
        point.is_valid().then_some(point)
    }

    pub fn with_coordinates(mut self, point: GeoPoint) -> Self {
        self.latitude = Some(point.latitude);
        self.longitude = Some(point.longitude);
        self
    }

    /// Free-text query for forward geocoding: "street, number, neighborhood,
    /// city, state, postal code" with blank parts dropped.
    pub fn geocoding_query(&self) -> String {
        let street = match (self.street.trim(), self.number.trim()) {
            ("", _) => String::new(),
            (s, "") => s.to_string(),
            (s, n) => format!("{} {}", s, n),
        };
        [
            street.as_str(),
            self.neighborhood.trim(),
            self.city.trim(),
            self.state.trim(),
            self.postal_code.trim(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.geocoding_query())
    }
}

/// Outcome of zone resolution. `matched == false` is the explicit
/// "unresolved" answer and carries a zero fee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneMatch {
    pub matched: bool,
    pub fee: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<ServiceRegion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
}

impl ZoneMatch {
    pub fn matched(region: &ServiceRegion, strategy: Strategy) -> Self {
        Self {
            matched: true,
            fee: region.fee,
            region: Some(region.clone()),
            strategy: Some(strategy),
        }
    }

    pub fn unresolved() -> Self {
        Self {
            matched: false,
            fee: Decimal::ZERO,
            region: None,
            strategy: None,
        }
    }
}
