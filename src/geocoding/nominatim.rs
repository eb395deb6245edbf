//! OpenStreetMap Nominatim provider.
//!
//! ureq is blocking, so each request runs on tokio's blocking pool. The
//! caller owns the overall deadline; the per-request ureq timeout is only a
//! backstop for sockets that never close.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::types::{GeocodeError, StructuredAddress};
use super::GeocodingGateway;
use crate::geo::GeoPoint;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "zonefee/0.3 (delivery-zone-engine)";

/// Connection settings for a Nominatim instance.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    pub user_agent: String,
    /// ISO 3166-1 alpha-2 codes passed as `countrycodes`, e.g. `["br"]`.
    pub country_codes: Vec<String>,
    pub timeout: Duration,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            country_codes: Vec::new(),
            timeout: Duration::from_secs(8),
        }
    }
}

pub struct NominatimGateway {
    config: NominatimConfig,
}

impl NominatimGateway {
    pub fn new(config: NominatimConfig) -> Self {
        Self { config }
    }

    fn search_url(&self, query: &str) -> String {
        let country_param = if self.config.country_codes.is_empty() {
            String::new()
        } else {
            format!("&countrycodes={}", urlencode(&self.config.country_codes.join(",")))
        };
        format!(
            "{}/search?q={}&format=json&limit=1&addressdetails=0{}",
            self.config.base_url.trim_end_matches('/'),
            urlencode(query),
            country_param,
        )
    }

    fn reverse_url(&self, point: GeoPoint) -> String {
        format!(
            "{}/reverse?lat={}&lon={}&format=json&addressdetails=1",
            self.config.base_url.trim_end_matches('/'),
            point.latitude,
            point.longitude,
        )
    }

    async fn fetch(&self, url: String) -> Result<String, GeocodeError> {
        let user_agent = self.config.user_agent.clone();
        let timeout = self.config.timeout;
        tracing::debug!(%url, "nominatim request");

        tokio::task::spawn_blocking(move || {
            let response = ureq::get(&url)
                .set("User-Agent", &user_agent)
                .timeout(timeout)
                .call()
                .map_err(|e| GeocodeError::Network(e.to_string()))?;
            response
                .into_string()
                .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))
        })
        .await
        .map_err(|e| GeocodeError::Network(format!("geocoding task aborted: {}", e)))?
    }
}

#[async_trait]
impl GeocodingGateway for NominatimGateway {
    async fn forward(&self, query: &str) -> Result<GeoPoint, GeocodeError> {
        if query.trim().is_empty() {
            return Err(GeocodeError::NotFound(query.to_string()));
        }
        let body = self.fetch(self.search_url(query)).await?;
        parse_search(query, &body)
    }

    async fn reverse(&self, point: GeoPoint) -> Result<StructuredAddress, GeocodeError> {
        let body = self.fetch(self.reverse_url(point)).await?;
        parse_reverse(point, &body)
    }
}

// ─── Response parsing ───────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct SearchResult {
    lat: String,
    lon: String,
}

#[derive(Deserialize, Debug)]
struct ReverseResult {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<ReverseAddress>,
}

#[derive(Deserialize, Debug, Default)]
struct ReverseAddress {
    road: Option<String>,
    house_number: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    quarter: Option<String>,
    city_district: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country_code: Option<String>,
}

fn parse_search(query: &str, body: &str) -> Result<GeoPoint, GeocodeError> {
    let results: Vec<SearchResult> =
        serde_json::from_str(body).map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

    let first = results
        .first()
        .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

    let lat: f64 = first
        .lat
        .parse()
        .map_err(|_| GeocodeError::InvalidResponse(format!("bad latitude '{}'", first.lat)))?;
    let lon: f64 = first
        .lon
        .parse()
        .map_err(|_| GeocodeError::InvalidResponse(format!("bad longitude '{}'", first.lon)))?;

    let point = GeoPoint::new(lat, lon);
    if !point.is_valid() {
        return Err(GeocodeError::InvalidResponse(format!(
            "coordinates out of range: {}, {}",
            lat, lon
        )));
    }
    Ok(point)
}

fn parse_reverse(point: GeoPoint, body: &str) -> Result<StructuredAddress, GeocodeError> {
    let result: ReverseResult =
        serde_json::from_str(body).map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

    // Nominatim answers 200 with {"error": "Unable to geocode"} for empty spots
    if result.error.is_some() {
        return Err(GeocodeError::NotFound(format!(
            "{}, {}",
            point.latitude, point.longitude
        )));
    }

    let a = result.address.unwrap_or_default();
    Ok(StructuredAddress {
        street: a.road,
        number: a.house_number,
        neighborhood: a.suburb.or(a.neighbourhood).or(a.quarter).or(a.city_district),
        city: a.city.or(a.town).or(a.village).or(a.municipality),
        state: a.state,
        postal_code: a.postcode,
        country_code: a.country_code.map(|cc| cc.to_uppercase()),
        display_name: result.display_name,
    })
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
