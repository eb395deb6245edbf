//! Types shared by geocoding providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Address fields recovered by reverse geocoding. Every field is optional
/// because providers fill in whatever they know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Geocoding failures.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeError {
    /// The provider answered but had no result for the query.
    NotFound(String),
    Network(String),
    Timeout(Duration),
    InvalidResponse(String),
}

impl GeocodeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(q) => write!(f, "no geocoding result for '{}'", q),
            Self::Network(msg) => write!(f, "network error: {}", msg),
            Self::Timeout(limit) => write!(f, "geocoder did not answer within {:?}", limit),
            Self::InvalidResponse(msg) => write!(f, "invalid geocoder response: {}", msg),
        }
    }
}

impl std::error::Error for GeocodeError {}
