//! Resolution policy shared by the fee resolver and the address validator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What to do with an address that no geographic strategy could place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Charge the fee of the first active radius region regardless of
    /// distance. Permissive legacy behavior, kept until product decides.
    FirstAvailableRadius,
    /// Skip that step; the address falls through to the default region or
    /// ends unresolved.
    Reject,
}

impl Default for UnmatchedPolicy {
    fn default() -> Self {
        Self::FirstAvailableRadius
    }
}

impl fmt::Display for UnmatchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstAvailableRadius => write!(f, "first_available_radius"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// How a geocoding failure (timeout, network, bad payload) is handled.
/// A plain not-found answer always falls through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorPolicy {
    /// Treat the failure as not-found and keep walking the chain.
    FallThrough,
    /// Stop and return the error. The validator turns it into a rejection.
    Fail,
}

impl Default for GatewayErrorPolicy {
    fn default() -> Self {
        Self::FallThrough
    }
}

impl fmt::Display for GatewayErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FallThrough => write!(f, "fall_through"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

pub const DEFAULT_MARKERS: &[&str] = &["default", "fallback", "padrão", "padrao"];
pub const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionPolicy {
    pub unmatched: UnmatchedPolicy,
    pub on_gateway_error: GatewayErrorPolicy,
    /// Lower-cased substrings that mark a region as the business default.
    pub default_markers: Vec<String>,
    pub geocode_timeout: Duration,
    /// Require a neighborhood region's `city` to equal the address city when
    /// both are present. Off: names alone decide.
    pub neighborhood_city_filter: bool,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            unmatched: UnmatchedPolicy::default(),
            on_gateway_error: GatewayErrorPolicy::default(),
            default_markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
            geocode_timeout: DEFAULT_GEOCODE_TIMEOUT,
            neighborhood_city_filter: false,
        }
    }
}

impl ResolutionPolicy {
    pub fn with_unmatched(mut self, unmatched: UnmatchedPolicy) -> Self {
        self.unmatched = unmatched;
        self
    }

    pub fn with_gateway_errors(mut self, on_gateway_error: GatewayErrorPolicy) -> Self {
        self.on_gateway_error = on_gateway_error;
        self
    }

    pub fn with_geocode_timeout(mut self, timeout: Duration) -> Self {
        self.geocode_timeout = timeout;
        self
    }

    pub fn with_neighborhood_city_filter(mut self, enabled: bool) -> Self {
        self.neighborhood_city_filter = enabled;
        self
    }

    /// True when `name` contains one of the default markers, ignoring case.
    pub fn is_default_name(&self, name: &str) -> bool {
        let n = name.to_lowercase();
        self.default_markers
            .iter()
            .any(|m| !m.is_empty() && n.contains(&m.to_lowercase()))
    }
}
