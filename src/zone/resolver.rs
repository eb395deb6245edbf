//! Zone resolver — the ordered strategy chain.
//!
//! Chain:  neighborhood → within radius → [geocode, within radius again]
//!         → first available radius → default region → unresolved
//!
//! The bracketed step needs I/O and is driven by `DeliveryFeeResolver`; the
//! resolver itself stays synchronous and only ever reads the snapshot.

use crate::policy::{ResolutionPolicy, UnmatchedPolicy};

use super::strategy::Strategy;
use super::types::{Address, RegionSnapshot, ZoneMatch};

pub struct ZoneResolver {
    policy: ResolutionPolicy,
    primary: Vec<Strategy>,
    fallback: Vec<Strategy>,
}

impl ZoneResolver {
    pub fn new(policy: ResolutionPolicy) -> Self {
        let mut fallback = Vec::with_capacity(2);
        if policy.unmatched == UnmatchedPolicy::FirstAvailableRadius {
            fallback.push(Strategy::FirstAvailable);
        }
        fallback.push(Strategy::DefaultRegion);

        Self {
            policy,
            primary: vec![Strategy::Neighborhood, Strategy::WithinRadius],
            fallback,
        }
    }

    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    /// Every strategy in the order it is tried. Geocoding sits between the
    /// two groups and is not listed.
    pub fn strategies(&self) -> impl Iterator<Item = Strategy> + '_ {
        self.primary.iter().chain(self.fallback.iter()).copied()
    }

    /// Steps that need no external help: neighborhood, then radius when the
    /// address already has coordinates.
    pub fn primary(&self, address: &Address, regions: &RegionSnapshot) -> Option<ZoneMatch> {
        run(&self.primary, address, regions, &self.policy)
    }

    /// The radius step alone, for re-running once geocoding filled in
    /// coordinates.
    pub fn within_radius(&self, address: &Address, regions: &RegionSnapshot) -> Option<ZoneMatch> {
        Strategy::WithinRadius.apply(address, regions, &self.policy)
    }

    /// Steps that no longer look at where the address is.
    pub fn fallback(&self, address: &Address, regions: &RegionSnapshot) -> Option<ZoneMatch> {
        run(&self.fallback, address, regions, &self.policy)
    }

    /// Whole chain without geocoding. An address without coordinates simply
    /// skips the radius step.
    pub fn resolve(&self, address: &Address, regions: &RegionSnapshot) -> ZoneMatch {
        self.primary(address, regions)
            .or_else(|| self.fallback(address, regions))
            .unwrap_or_else(ZoneMatch::unresolved)
    }
}

impl Default for ZoneResolver {
    fn default() -> Self {
        Self::new(ResolutionPolicy::default())
    }
}

fn run(
    chain: &[Strategy],
    address: &Address,
    regions: &RegionSnapshot,
    policy: &ResolutionPolicy,
) -> Option<ZoneMatch> {
    chain.iter().find_map(|s| s.apply(address, regions, policy))
}
