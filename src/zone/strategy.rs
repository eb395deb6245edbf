//! Matching strategies. Each one looks at a single address against the
//! region snapshot and either claims a region or passes.

use serde::Serialize;
use std::fmt;

use crate::policy::ResolutionPolicy;

use super::types::{Address, RegionKind, RegionSnapshot, ServiceRegion, ZoneMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Neighborhood name containment, first region in list order wins.
    Neighborhood,
    /// Distance to center within radius, smallest radius wins.
    WithinRadius,
    /// First active radius region regardless of distance.
    FirstAvailable,
    /// Declared default region, or a region whose name carries a default marker.
    DefaultRegion,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neighborhood => write!(f, "neighborhood"),
            Self::WithinRadius => write!(f, "within_radius"),
            Self::FirstAvailable => write!(f, "first_available"),
            Self::DefaultRegion => write!(f, "default_region"),
        }
    }
}

impl Strategy {
    pub fn apply(
        &self,
        address: &Address,
        regions: &RegionSnapshot,
        policy: &ResolutionPolicy,
    ) -> Option<ZoneMatch> {
        let region = match self {
            Self::Neighborhood => match_neighborhood(address, regions, policy),
            Self::WithinRadius => match_within_radius(address, regions),
            Self::FirstAvailable => regions.radius_regions().next(),
            Self::DefaultRegion => match_default(regions, policy),
        }?;
        tracing::debug!(strategy = %self, region = %region.id, fee = %region.fee, "zone matched");
        Some(ZoneMatch::matched(region, *self))
    }
}

fn match_neighborhood<'a>(
    address: &Address,
    regions: &'a RegionSnapshot,
    policy: &ResolutionPolicy,
) -> Option<&'a ServiceRegion> {
    let wanted = address.neighborhood.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let address_city = address.city.trim().to_lowercase();

    regions.iter().find(|region| {
        let RegionKind::Neighborhood { neighborhood_name, city } = &region.kind else {
            return false;
        };
        let name = neighborhood_name.trim().to_lowercase();
        if name.is_empty() {
            return false;
        }
        if let (true, Some(city)) = (policy.neighborhood_city_filter, city) {
            let city = city.trim().to_lowercase();
            if !city.is_empty() && !address_city.is_empty() && city != address_city {
                return false;
            }
        }
        name.contains(&wanted) || wanted.contains(&name)
    })
}

fn match_within_radius<'a>(address: &Address, regions: &'a RegionSnapshot) -> Option<&'a ServiceRegion> {
    let point = address.coordinates()?;
    let mut best: Option<(&ServiceRegion, f64)> = None;

    for region in regions.covering(point) {
        let Some((_, radius_km)) = region.circle() else {
            continue;
        };
        // strict less-than keeps the earlier region on equal radii
        if best.map_or(true, |(_, r)| radius_km < r) {
            best = Some((region, radius_km));
        }
    }

    best.map(|(region, _)| region)
}

fn match_default<'a>(regions: &'a RegionSnapshot, policy: &ResolutionPolicy) -> Option<&'a ServiceRegion> {
    regions
        .iter()
        .find(|r| matches!(r.kind, RegionKind::DefaultFallback))
        .or_else(|| {
            regions
                .iter()
                .find(|r| r.name.as_deref().is_some_and(|n| policy.is_default_name(n)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const CENTER: (f64, f64) = (-23.5505, -46.6333);

    fn region(id: &str, fee: Decimal, kind: RegionKind) -> ServiceRegion {
        ServiceRegion {
            id: id.into(),
            business_id: "b1".into(),
            name: None,
            active: true,
            fee,
            kind,
        }
    }

    fn hood(id: &str, name: &str, fee: Decimal) -> ServiceRegion {
        region(
            id,
            fee,
            RegionKind::Neighborhood {
                neighborhood_name: name.into(),
                city: None,
            },
        )
    }

    fn circle(id: &str, radius_km: f64, fee: Decimal) -> ServiceRegion {
        region(
            id,
            fee,
            RegionKind::RadiusFromPoint {
                center_latitude: CENTER.0,
                center_longitude: CENTER.1,
                radius_km,
            },
        )
    }

    fn snapshot(regions: &[ServiceRegion]) -> RegionSnapshot {
        RegionSnapshot::new(regions).unwrap()
    }

    /// Point `km` kilometres due north of the shared center.
    fn north_of_center(km: f64) -> Address {
        Address::default().with_coordinates(GeoPoint::new(CENTER.0 + km / 111.195, CENTER.1))
    }

    fn in_neighborhood(name: &str) -> Address {
        Address {
            neighborhood: name.into(),
            ..Address::default()
        }
    }

    #[test]
    fn test_neighborhood_exact_case_insensitive() {
        let snap = snapshot(&[hood("n1", "Centro", dec!(5))]);
        let m = Strategy::Neighborhood
            .apply(&in_neighborhood("CENTRO"), &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.fee, dec!(5));
        assert_eq!(m.strategy, Some(Strategy::Neighborhood));
    }

    #[test]
    fn test_neighborhood_containment_both_ways() {
        let snap = snapshot(&[hood("n1", "Jardim Paulista", dec!(6))]);
        let policy = ResolutionPolicy::default();
        assert!(Strategy::Neighborhood.apply(&in_neighborhood("jardim"), &snap, &policy).is_some());
        assert!(Strategy::Neighborhood
            .apply(&in_neighborhood("Jardim Paulista Sul"), &snap, &policy)
            .is_some());
        assert!(Strategy::Neighborhood.apply(&in_neighborhood("Moema"), &snap, &policy).is_none());
    }

    #[test]
    fn test_neighborhood_first_in_list_wins() {
        // "Vila" is contained in both names; list order decides, not closeness
        let snap = snapshot(&[hood("a", "Vila Mariana", dec!(8)), hood("b", "Vila", dec!(4))]);
        let m = Strategy::Neighborhood
            .apply(&in_neighborhood("Vila"), &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.region.unwrap().id, "a");
    }

    #[test]
    fn test_neighborhood_blank_inputs_never_match() {
        let snap = snapshot(&[hood("blank", "  ", dec!(1)), hood("n", "Centro", dec!(2))]);
        let policy = ResolutionPolicy::default();
        assert!(Strategy::Neighborhood.apply(&in_neighborhood(""), &snap, &policy).is_none());
        let m = Strategy::Neighborhood.apply(&in_neighborhood("Centro"), &snap, &policy).unwrap();
        assert_eq!(m.region.unwrap().id, "n");
    }

    fn centro_in_campinas() -> RegionSnapshot {
        snapshot(&[region(
            "n",
            dec!(5),
            RegionKind::Neighborhood {
                neighborhood_name: "Centro".into(),
                city: Some("Campinas".into()),
            },
        )])
    }

    #[test]
    fn test_neighborhood_ignores_region_city_by_default() {
        let snap = centro_in_campinas();
        let mut addr = in_neighborhood("Centro");
        addr.city = "São Paulo".into();
        let m = Strategy::Neighborhood
            .apply(&addr, &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.fee, dec!(5));
    }

    #[test]
    fn test_neighborhood_city_filter_when_enabled() {
        let snap = centro_in_campinas();
        let policy = ResolutionPolicy::default().with_neighborhood_city_filter(true);
        let mut addr = in_neighborhood("Centro");
        addr.city = "São Paulo".into();
        assert!(Strategy::Neighborhood.apply(&addr, &snap, &policy).is_none());
        addr.city = "campinas".into();
        assert!(Strategy::Neighborhood.apply(&addr, &snap, &policy).is_some());
        addr.city = String::new();
        assert!(Strategy::Neighborhood.apply(&addr, &snap, &policy).is_some());
    }

    #[test]
    fn test_radius_smallest_qualifying_wins() {
        let snap = snapshot(&[circle("wide", 10.0, dec!(7)), circle("tight", 5.0, dec!(3))]);
        let m = Strategy::WithinRadius
            .apply(&north_of_center(3.0), &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.fee, dec!(3));
    }

    #[test]
    fn test_radius_only_outer_ring_qualifies() {
        let snap = snapshot(&[circle("tight", 5.0, dec!(3)), circle("wide", 10.0, dec!(7))]);
        let m = Strategy::WithinRadius
            .apply(&north_of_center(8.0), &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.fee, dec!(7));
    }

    #[test]
    fn test_radius_needs_coordinates_and_coverage() {
        let snap = snapshot(&[circle("c", 5.0, dec!(3))]);
        let policy = ResolutionPolicy::default();
        assert!(Strategy::WithinRadius.apply(&Address::default(), &snap, &policy).is_none());
        assert!(Strategy::WithinRadius.apply(&north_of_center(6.0), &snap, &policy).is_none());
    }

    #[test]
    fn test_radius_tie_keeps_list_order() {
        let snap = snapshot(&[circle("first", 5.0, dec!(3)), circle("second", 5.0, dec!(9))]);
        let m = Strategy::WithinRadius
            .apply(&north_of_center(1.0), &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.region.unwrap().id, "first");
    }

    #[test]
    fn test_first_available_ignores_distance() {
        let snap = snapshot(&[hood("n", "Centro", dec!(1)), circle("c", 1.0, dec!(12))]);
        let m = Strategy::FirstAvailable
            .apply(&north_of_center(500.0), &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.region.unwrap().id, "c");
    }

    #[test]
    fn test_default_region_prefers_declared_kind() {
        let mut named = hood("named", "Zona Norte", dec!(9));
        named.name = Some("Taxa padrão".into());
        let declared = region("declared", dec!(6), RegionKind::DefaultFallback);
        let snap = snapshot(&[named, declared]);
        let m = Strategy::DefaultRegion
            .apply(&Address::default(), &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.region.unwrap().id, "declared");
    }

    #[test]
    fn test_default_region_by_name_marker() {
        let mut named = hood("named", "Zona Norte", dec!(9));
        named.name = Some("Entrega Default".into());
        let snap = snapshot(&[hood("other", "Centro", dec!(2)), named]);
        let m = Strategy::DefaultRegion
            .apply(&Address::default(), &snap, &ResolutionPolicy::default())
            .unwrap();
        assert_eq!(m.fee, dec!(9));
    }

    #[test]
    fn test_stub_kinds_never_match() {
        let snap = snapshot(&[
            region("poly", dec!(1), RegionKind::Polygon { vertices: vec![] }),
            region(
                "cep",
                dec!(1),
                RegionKind::PostalCodeRange {
                    start_code: "01000-000".into(),
                    end_code: "05999-999".into(),
                },
            ),
        ]);
        let mut addr = north_of_center(0.0);
        addr.neighborhood = "Centro".into();
        addr.postal_code = "01310-200".into();
        let policy = ResolutionPolicy::default();
        for s in [Strategy::Neighborhood, Strategy::WithinRadius, Strategy::FirstAvailable, Strategy::DefaultRegion] {
            assert!(s.apply(&addr, &snap, &policy).is_none(), "{s} matched a stub region");
        }
    }
}
