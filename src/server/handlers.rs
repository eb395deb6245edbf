use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::ZoneError;
use crate::fee::FeeQuote;
use crate::geo::GeoPoint;
use crate::geocoding::{GeocodeError, StructuredAddress};
use crate::validator::Validation;
use crate::zone::{Address, ServiceRegion};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

impl From<ZoneError> for ApiError {
    fn from(e: ZoneError) -> Self {
        let status = match &e {
            ZoneError::InvalidRegion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ZoneError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ZoneError::Gateway(GeocodeError::NotFound(_)) => StatusCode::NOT_FOUND,
            ZoneError::Gateway(GeocodeError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ZoneError::Gateway(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

// ─── POST /api/fee, POST /api/validate ───────────────────────────

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub address: Address,
    #[serde(default)]
    pub regions: Vec<ServiceRegion>,
}

pub async fn resolve_fee(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<FeeQuote>, ApiError> {
    let start = Instant::now();
    let quote = state.validator.fees().resolve(&req.address, &req.regions).await?;

    tracing::info!(
        matched = quote.matched(),
        fee = %quote.fee(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "POST /api/fee"
    );
    Ok(Json(quote))
}

pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResolveRequest>,
) -> Json<Validation> {
    let start = Instant::now();
    let verdict = state.validator.validate(&req.address, &req.regions).await;

    tracing::info!(
        valid = verdict.is_valid,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "POST /api/validate"
    );
    Json(verdict)
}

// ─── GET /api/reverse ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReverseQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub async fn reverse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseQuery>,
) -> Result<Json<StructuredAddress>, ApiError> {
    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(ApiError(StatusCode::BAD_REQUEST, "Provide 'lat' and 'lon' parameters".into()));
    };
    let point = GeoPoint::new(lat, lon);
    if !point.is_valid() {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "Invalid coordinates. Lat: -90..90, Lon: -180..180".into(),
        ));
    }

    let address = state.validator.fees().reverse(point).await?;
    Ok(Json(address))
}

pub async fn health() -> &'static str {
    "ok"
}
