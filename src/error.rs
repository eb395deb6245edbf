//! Error types for the resolution engine.
//!
//! Business outcomes (no region configured, no match, address not locatable)
//! are not errors; they travel in `ZoneMatch` / `Validation`. What ends up
//! here is either a broken region snapshot, a gateway failure the policy
//! refuses to absorb, or ambient I/O and config trouble.

use thiserror::Error;

use crate::geocoding::GeocodeError;

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("invalid region {id}: {reason}")]
    InvalidRegion { id: String, reason: String },

    #[error("geocoding failed: {0}")]
    Gateway(#[from] GeocodeError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ZoneError>;
