//! Delivery fee resolver — runs the zone chain and performs the single
//! geocoding call when an address arrives without coordinates.
//!
//! Flow:  snapshot → neighborhood / radius → geocode (at most once, bounded
//!        by the policy timeout) → radius again → fallbacks → unresolved

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Result, ZoneError};
use crate::geo::GeoPoint;
use crate::geocoding::{GeocodeError, GeocodingGateway, StructuredAddress};
use crate::policy::{GatewayErrorPolicy, ResolutionPolicy};
use crate::zone::{Address, RegionSnapshot, ServiceRegion, ZoneMatch, ZoneResolver};

/// Called with the original address and the coordinates found for it, so
/// the caller can store them on its own record.
pub type CoordinatesHook = Arc<dyn Fn(&Address, GeoPoint) + Send + Sync>;

/// Result of one fee resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeQuote {
    #[serde(flatten)]
    pub zone: ZoneMatch,
    /// Coordinates obtained from the gateway during this call, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoded: Option<GeoPoint>,
}

impl FeeQuote {
    pub fn fee(&self) -> Decimal {
        self.zone.fee
    }

    pub fn matched(&self) -> bool {
        self.zone.matched
    }
}

/// Outcome of one forward lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup {
    Found(GeoPoint),
    /// The provider had no result, or the address has no text to search.
    NotFound,
    /// The provider failed and the policy let resolution continue.
    Unavailable,
}

impl Lookup {
    pub fn point(&self) -> Option<GeoPoint> {
        match self {
            Self::Found(p) => Some(*p),
            _ => None,
        }
    }
}

pub struct DeliveryFeeResolver {
    zones: ZoneResolver,
    gateway: Arc<dyn GeocodingGateway>,
    on_coordinates: Option<CoordinatesHook>,
}

impl DeliveryFeeResolver {
    pub fn new(gateway: Arc<dyn GeocodingGateway>, policy: ResolutionPolicy) -> Self {
        Self {
            zones: ZoneResolver::new(policy),
            gateway,
            on_coordinates: None,
        }
    }

    pub fn with_coordinates_hook(
        mut self,
        hook: impl Fn(&Address, GeoPoint) + Send + Sync + 'static,
    ) -> Self {
        self.on_coordinates = Some(Arc::new(hook));
        self
    }

    pub fn policy(&self) -> &ResolutionPolicy {
        self.zones.policy()
    }

    pub fn zones(&self) -> &ZoneResolver {
        &self.zones
    }

    /// Fee for `address`; zero when no region applies.
    pub async fn resolve_fee(&self, address: &Address, regions: &[ServiceRegion]) -> Result<Decimal> {
        Ok(self.resolve(address, regions).await?.fee())
    }

    pub async fn resolve(&self, address: &Address, regions: &[ServiceRegion]) -> Result<FeeQuote> {
        let snapshot = RegionSnapshot::new(regions)?;
        self.resolve_snapshot(address, &snapshot).await
    }

    /// Same as [`resolve`](Self::resolve) on an already validated snapshot.
    pub async fn resolve_snapshot(&self, address: &Address, regions: &RegionSnapshot) -> Result<FeeQuote> {
        if let Some(zone) = self.zones.primary(address, regions) {
            return Ok(FeeQuote { zone, geocoded: None });
        }

        let mut geocoded = None;
        // geocoding only feeds the radius step, so skip it when there is no circle to test
        if address.coordinates().is_none() && regions.has_radius_regions() {
            if let Lookup::Found(point) = self.locate(address).await? {
                geocoded = Some(point);
                let located = address.clone().with_coordinates(point);
                if let Some(zone) = self.zones.within_radius(&located, regions) {
                    self.notify(address, point);
                    return Ok(FeeQuote { zone, geocoded });
                }
            }
        }

        let zone = self
            .zones
            .fallback(address, regions)
            .unwrap_or_else(ZoneMatch::unresolved);
        if !zone.matched {
            tracing::info!(address = %address, regions = regions.len(), "no delivery region matched");
        }
        if let Some(point) = geocoded {
            self.notify(address, point);
        }
        Ok(FeeQuote { zone, geocoded })
    }

    /// Forward-geocode an address under the policy timeout. Failures the
    /// policy lets through come back as [`Lookup::Unavailable`].
    pub async fn locate(&self, address: &Address) -> Result<Lookup> {
        let query = address.geocoding_query();
        if query.is_empty() {
            tracing::debug!("address has no text to geocode");
            return Ok(Lookup::NotFound);
        }

        let policy = self.zones.policy();
        let outcome = match tokio::time::timeout(policy.geocode_timeout, self.gateway.forward(&query)).await {
            Ok(result) => result,
            Err(_) => Err(GeocodeError::Timeout(policy.geocode_timeout)),
        };

        match outcome {
            Ok(point) if point.is_valid() => {
                tracing::debug!(%query, lat = point.latitude, lon = point.longitude, "geocoded address");
                Ok(Lookup::Found(point))
            }
            Ok(point) => self.absorb(GeocodeError::InvalidResponse(format!(
                "coordinates out of range: {}, {}",
                point.latitude, point.longitude
            ))),
            Err(e) if e.is_not_found() => {
                tracing::debug!(%query, "geocoder found nothing");
                Ok(Lookup::NotFound)
            }
            Err(e) => self.absorb(e),
        }
    }

    /// Reverse-geocode a point under the same timeout. Errors always surface:
    /// there is no chain to continue.
    pub async fn reverse(&self, point: GeoPoint) -> Result<StructuredAddress> {
        let timeout = self.zones.policy().geocode_timeout;
        match tokio::time::timeout(timeout, self.gateway.reverse(point)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ZoneError::Gateway(GeocodeError::Timeout(timeout))),
        }
    }

    fn absorb(&self, error: GeocodeError) -> Result<Lookup> {
        match self.zones.policy().on_gateway_error {
            GatewayErrorPolicy::FallThrough => {
                tracing::warn!(%error, "geocoding failed, continuing without coordinates");
                Ok(Lookup::Unavailable)
            }
            GatewayErrorPolicy::Fail => Err(ZoneError::Gateway(error)),
        }
    }

    pub(crate) fn notify(&self, address: &Address, point: GeoPoint) {
        if let Some(hook) = &self.on_coordinates {
            hook(address, point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::OfflineGateway;
    use crate::zone::{RegionKind, Strategy};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Gateway double: fixed forward answer plus a call counter.
    struct FixedGateway {
        answer: std::result::Result<GeoPoint, GeocodeError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FixedGateway {
        fn new(answer: std::result::Result<GeoPoint, GeocodeError>) -> Arc<Self> {
            Arc::new(Self { answer, delay: None, calls: AtomicUsize::new(0) })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(GeoPoint::new(-23.55, -46.63)),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GeocodingGateway for FixedGateway {
        async fn forward(&self, _query: &str) -> std::result::Result<GeoPoint, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.answer.clone()
        }

        async fn reverse(&self, _point: GeoPoint) -> std::result::Result<StructuredAddress, GeocodeError> {
            Ok(StructuredAddress {
                city: Some("São Paulo".into()),
                ..StructuredAddress::default()
            })
        }
    }

    fn circle(id: &str, lat: f64, lon: f64, radius_km: f64, fee: Decimal) -> ServiceRegion {
        ServiceRegion {
            id: id.into(),
            business_id: "b1".into(),
            name: None,
            active: true,
            fee,
            kind: RegionKind::RadiusFromPoint {
                center_latitude: lat,
                center_longitude: lon,
                radius_km,
            },
        }
    }

    fn street_address() -> Address {
        Address {
            street: "Rua Augusta".into(),
            number: "500".into(),
            neighborhood: "Consolação".into(),
            city: "São Paulo".into(),
            ..Address::default()
        }
    }

    #[tokio::test]
    async fn test_geocoded_address_matches_radius() {
        let gw = FixedGateway::new(Ok(GeoPoint::new(-23.553, -46.656)));
        let resolver = DeliveryFeeResolver::new(gw.clone(), ResolutionPolicy::default());
        let regions = vec![
            circle("far", -22.9, -47.06, 4.0, dec!(20)),
            circle("near", -23.55, -46.65, 3.0, dec!(6)),
        ];
        let quote = resolver.resolve(&street_address(), &regions).await.unwrap();
        assert_eq!(quote.fee(), dec!(6));
        assert_eq!(quote.zone.strategy, Some(Strategy::WithinRadius));
        assert!(quote.geocoded.is_some());
        assert_eq!(gw.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_existing_coordinates_skip_gateway() {
        let gw = FixedGateway::new(Err(GeocodeError::Network("down".into())));
        let resolver = DeliveryFeeResolver::new(gw.clone(), ResolutionPolicy::default());
        let addr = street_address().with_coordinates(GeoPoint::new(-23.55, -46.65));
        let regions = vec![circle("c", -23.55, -46.65, 2.0, dec!(4))];
        assert_eq!(resolver.resolve_fee(&addr, &regions).await.unwrap(), dec!(4));
        assert_eq!(gw.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_radius_regions_skip_gateway() {
        let gw = FixedGateway::new(Ok(GeoPoint::new(0.0, 0.0)));
        let resolver = DeliveryFeeResolver::new(gw.clone(), ResolutionPolicy::default());
        let quote = resolver.resolve(&street_address(), &[]).await.unwrap();
        assert!(!quote.matched());
        assert_eq!(gw.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gateway_error_falls_through_by_default() {
        let gw = FixedGateway::new(Err(GeocodeError::Network("connection reset".into())));
        let resolver = DeliveryFeeResolver::new(gw, ResolutionPolicy::default());
        let regions = vec![circle("c", -23.55, -46.65, 2.0, dec!(4))];
        let quote = resolver.resolve(&street_address(), &regions).await.unwrap();
        assert_eq!(quote.zone.strategy, Some(Strategy::FirstAvailable));
        assert_eq!(quote.fee(), dec!(4));
        assert!(quote.geocoded.is_none());
    }

    #[tokio::test]
    async fn test_gateway_error_fails_when_policy_says_so() {
        let gw = FixedGateway::new(Err(GeocodeError::InvalidResponse("html".into())));
        let policy = ResolutionPolicy::default().with_gateway_errors(GatewayErrorPolicy::Fail);
        let resolver = DeliveryFeeResolver::new(gw, policy);
        let regions = vec![circle("c", -23.55, -46.65, 2.0, dec!(4))];
        let err = resolver.resolve(&street_address(), &regions).await.unwrap_err();
        assert!(matches!(err, ZoneError::Gateway(GeocodeError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_not_found_never_fails_even_under_fail_policy() {
        let policy = ResolutionPolicy::default().with_gateway_errors(GatewayErrorPolicy::Fail);
        let resolver = DeliveryFeeResolver::new(Arc::new(OfflineGateway), policy);
        let regions = vec![circle("c", -23.55, -46.65, 2.0, dec!(4))];
        assert_eq!(resolver.resolve_fee(&street_address(), &regions).await.unwrap(), dec!(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_gateway_times_out() {
        let gw = FixedGateway::slow(Duration::from_secs(60));
        let policy = ResolutionPolicy::default()
            .with_geocode_timeout(Duration::from_secs(5))
            .with_gateway_errors(GatewayErrorPolicy::Fail);
        let resolver = DeliveryFeeResolver::new(gw, policy);
        let regions = vec![circle("c", -23.55, -46.65, 2.0, dec!(4))];
        let err = resolver.resolve(&street_address(), &regions).await.unwrap_err();
        assert!(matches!(err, ZoneError::Gateway(GeocodeError::Timeout(d)) if d == Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_keeps_its_precision() {
        let policy = ResolutionPolicy::default()
            .with_geocode_timeout(Duration::from_millis(250))
            .with_gateway_errors(GatewayErrorPolicy::Fail);
        let resolver = DeliveryFeeResolver::new(FixedGateway::slow(Duration::from_secs(2)), policy);
        let err = resolver.locate(&street_address()).await.unwrap_err();
        assert!(matches!(err, ZoneError::Gateway(GeocodeError::Timeout(d)) if d == Duration::from_millis(250)));
        assert!(err.to_string().contains("250ms"), "got {err}");
    }

    #[tokio::test]
    async fn test_locate_tells_not_found_from_failure() {
        let not_found = DeliveryFeeResolver::new(Arc::new(OfflineGateway), ResolutionPolicy::default());
        assert_eq!(not_found.locate(&street_address()).await.unwrap(), Lookup::NotFound);
        assert_eq!(not_found.locate(&Address::default()).await.unwrap(), Lookup::NotFound);

        let down = DeliveryFeeResolver::new(
            FixedGateway::new(Err(GeocodeError::Network("down".into()))),
            ResolutionPolicy::default(),
        );
        assert_eq!(down.locate(&street_address()).await.unwrap(), Lookup::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_resolution_never_fires_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let gw = FixedGateway::slow(Duration::from_secs(30));
        let resolver = DeliveryFeeResolver::new(gw.clone(), ResolutionPolicy::default())
            .with_coordinates_hook(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let regions = vec![circle("c", -23.55, -46.63, 2.0, dec!(4))];

        let address = street_address();
        let outcome = tokio::time::timeout(Duration::from_secs(1), resolver.resolve(&address, &regions)).await;
        assert!(outcome.is_err());
        assert_eq!(gw.calls.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hook_receives_geocoded_point() {
        let seen: Arc<Mutex<Vec<(String, GeoPoint)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let point = GeoPoint::new(-23.553, -46.656);
        let resolver = DeliveryFeeResolver::new(FixedGateway::new(Ok(point)), ResolutionPolicy::default())
            .with_coordinates_hook(move |addr, p| sink.lock().unwrap().push((addr.street.clone(), p)));

        // far away from the only region: the hook still fires, the fallback still applies
        let regions = vec![circle("far", -22.9, -47.06, 1.0, dec!(20))];
        let quote = resolver.resolve(&street_address(), &regions).await.unwrap();
        assert_eq!(quote.zone.strategy, Some(Strategy::FirstAvailable));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("Rua Augusta".to_string(), point));
    }

    #[tokio::test]
    async fn test_invalid_region_is_an_error() {
        let resolver = DeliveryFeeResolver::new(Arc::new(OfflineGateway), ResolutionPolicy::default());
        let regions = vec![circle("bad", -23.55, -46.65, -1.0, dec!(4))];
        let err = resolver.resolve(&street_address(), &regions).await.unwrap_err();
        assert!(matches!(err, ZoneError::InvalidRegion { .. }));
    }

    #[tokio::test]
    async fn test_reverse_passthrough() {
        let resolver = DeliveryFeeResolver::new(
            FixedGateway::new(Ok(GeoPoint::new(0.0, 0.0))),
            ResolutionPolicy::default(),
        );
        let addr = resolver.reverse(GeoPoint::new(-23.55, -46.63)).await.unwrap();
        assert_eq!(addr.city.as_deref(), Some("São Paulo"));
    }
}
