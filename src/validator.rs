//! Address validation — the caller-facing yes/no on serviceability.
//!
//! A geometric pre-check against the radius regions comes first; the fee
//! itself comes from `DeliveryFeeResolver`. Anything unexpected turns into
//! a rejection with a retry message.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;
use crate::fee::{DeliveryFeeResolver, Lookup};
use crate::geo::GeoPoint;
use crate::zone::{Address, RegionSnapshot, ServiceRegion};

pub const MSG_OUTSIDE_AREA: &str = "address outside service area";
pub const MSG_NOT_LOCATED: &str = "address could not be located";
pub const MSG_NO_REGION: &str = "no delivery region covers this address";
pub const MSG_RETRY: &str = "could not validate address, please try again";

/// Caller-facing validation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<ServiceRegion>,
    /// Coordinates found while validating, for the caller to keep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoded: Option<GeoPoint>,
}

impl Validation {
    fn accepted(fee: Decimal, region: Option<ServiceRegion>, geocoded: Option<GeoPoint>) -> Self {
        Self {
            is_valid: true,
            message: None,
            fee: Some(fee),
            region,
            geocoded,
        }
    }

    fn rejected(message: &str, geocoded: Option<GeoPoint>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.to_string()),
            fee: None,
            region: None,
            geocoded,
        }
    }
}

pub struct AddressValidator {
    fees: DeliveryFeeResolver,
}

impl AddressValidator {
    pub fn new(fees: DeliveryFeeResolver) -> Self {
        Self { fees }
    }

    pub fn fees(&self) -> &DeliveryFeeResolver {
        &self.fees
    }

    /// Never fails: errors become a rejection carrying [`MSG_RETRY`].
    pub async fn validate(&self, address: &Address, regions: &[ServiceRegion]) -> Validation {
        match self.try_validate(address, regions).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "address validation failed");
                Validation::rejected(MSG_RETRY, None)
            }
        }
    }

    async fn try_validate(&self, address: &Address, regions: &[ServiceRegion]) -> Result<Validation> {
        let snapshot = RegionSnapshot::new(regions)?;
        if snapshot.is_empty() {
            // nothing configured means no restriction
            return Ok(Validation::accepted(Decimal::ZERO, None, None));
        }

        let mut address = address.clone();
        let mut geocoded = None;

        if snapshot.has_radius_regions() {
            let point = match address.coordinates() {
                Some(p) => p,
                None => match self.fees.locate(&address).await? {
                    Lookup::Found(p) => {
                        self.fees.notify(&address, p);
                        geocoded = Some(p);
                        address = address.with_coordinates(p);
                        p
                    }
                    Lookup::NotFound => return Ok(Validation::rejected(MSG_NOT_LOCATED, None)),
                    // a provider outage is not the customer's fault
                    Lookup::Unavailable => return Ok(Validation::rejected(MSG_RETRY, None)),
                },
            };

            if snapshot.covering(point).next().is_none() {
                tracing::debug!(lat = point.latitude, lon = point.longitude, "outside every radius region");
                return Ok(Validation::rejected(MSG_OUTSIDE_AREA, geocoded));
            }
        }

        // coordinates are already settled here, so the fee resolver won't geocode again
        let quote = self.fees.resolve_snapshot(&address, &snapshot).await?;
        if !quote.matched() {
            return Ok(Validation::rejected(MSG_NO_REGION, geocoded));
        }
        Ok(Validation::accepted(quote.fee(), quote.zone.region, geocoded))
    }
}
