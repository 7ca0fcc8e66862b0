//! `/api/crowd/zones` handlers backed by the live [`ZoneBoard`](mela_sim::ZoneBoard).

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use mela_core::epoch_secs;
use mela_sim::{Analytics, HeatPoint, SurveillanceReport, Zone, ZoneOverview, ZonePrediction};

use crate::ApiState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::response::ApiResponse;

const NOT_FOUND: &str = "Zone not found";
const DEFAULT_TIMEFRAME: &str = "24h";
const DEFAULT_EMERGENCY: &str = "overcrowding";

/// GET /api/crowd/zones
pub async fn list_zones(State(state): State<ApiState>) -> ApiResponse<ZoneOverview> {
    ApiResponse::ok(state.zones.overview().await)
        .message("Crowd data retrieved successfully")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeStatus {
    pub last_update: u64,
    pub update_interval: u64,
    pub is_live: bool,
    pub next_update_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveZones {
    #[serde(flatten)]
    pub overview: ZoneOverview,
    pub real_time_status: RealTimeStatus,
}

/// GET /api/crowd/zones/live
///
/// Advances the board one step before answering.
pub async fn live_zones(State(state): State<ApiState>) -> ApiResponse<LiveZones> {
    state.zones.tick().await;
    let interval = state.zones.interval().as_secs();
    let live = LiveZones {
        overview: state.zones.overview().await,
        real_time_status: RealTimeStatus {
            last_update: epoch_secs(),
            update_interval: interval,
            is_live: true,
            next_update_in: interval,
        },
    };
    ApiResponse::ok(live).message("Real-time crowd data retrieved successfully")
}

/// GET /api/crowd/zones/predictions
pub async fn zone_predictions(State(state): State<ApiState>) -> ApiResponse<Vec<ZonePrediction>> {
    let predictions = state.zones.predictions().await;
    let count = predictions.len();
    ApiResponse::ok(predictions)
        .count(count)
        .message("AI predictions retrieved successfully")
}

/// GET /api/crowd/zones/heatmap
pub async fn zone_heatmap(State(state): State<ApiState>) -> ApiResponse<Vec<HeatPoint>> {
    ApiResponse::ok(state.zones.heatmap().await).message("Heatmap data retrieved successfully")
}

/// GET /api/crowd/zones/surveillance
pub async fn zone_surveillance(State(state): State<ApiState>) -> ApiResponse<SurveillanceReport> {
    ApiResponse::ok(state.zones.surveillance().await)
        .message("Surveillance data retrieved successfully")
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub timeframe: Option<String>,
}

/// GET /api/crowd/zones/analytics
pub async fn zone_analytics(
    State(state): State<ApiState>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResponse<Analytics> {
    let timeframe = query.timeframe.as_deref().unwrap_or(DEFAULT_TIMEFRAME);
    ApiResponse::ok(state.zones.analytics(timeframe).await)
        .message("Analytics data retrieved successfully")
}

/// GET /api/crowd/zones/{zoneId}
pub async fn get_zone(
    State(state): State<ApiState>,
    Path(zone_id): Path<String>,
) -> Result<ApiResponse<Zone>, ApiError> {
    state
        .zones
        .get(&zone_id)
        .await
        .map(|z| ApiResponse::ok(z).message("Zone data retrieved successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityUpdate {
    pub zone_id: Option<String>,
    pub new_density: Option<f64>,
    pub people_count: Option<i64>,
}

/// POST /api/crowd/zones/density
pub async fn update_zone_density(
    State(state): State<ApiState>,
    ApiJson(update): ApiJson<DensityUpdate>,
) -> Result<ApiResponse<Zone>, ApiError> {
    let mut errors = Vec::new();
    let zone_id = update.zone_id.filter(|id| !id.trim().is_empty());
    if zone_id.is_none() {
        errors.push("zoneId is required".to_string());
    }
    let density = match update.new_density {
        None => {
            errors.push("newDensity is required".to_string());
            None
        }
        Some(d) if !(0.0..=100.0).contains(&d) => {
            errors.push("newDensity must be between 0 and 100".to_string());
            None
        }
        Some(d) => Some(d),
    };
    let people = match update.people_count.map(u32::try_from) {
        Some(Ok(n)) => Some(n),
        Some(Err(_)) => {
            errors.push("peopleCount must be a non-negative integer".to_string());
            None
        }
        None => None,
    };
    let (Some(zone_id), Some(density)) = (zone_id, density) else {
        return Err(ApiError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    state
        .zones
        .update_density(zone_id.trim(), density, people)
        .await
        .map(|z| ApiResponse::ok(z).message("Crowd density updated successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyDrill {
    pub zone_id: Option<String>,
    pub emergency_type: Option<String>,
}

/// POST /api/crowd/zones/simulate-emergency
pub async fn simulate_zone_emergency(
    State(state): State<ApiState>,
    ApiJson(drill): ApiJson<EmergencyDrill>,
) -> Result<ApiResponse<Zone>, ApiError> {
    let zone_id = drill
        .zone_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::Validation(vec!["zoneId is required".to_string()]))?;
    let kind = drill.emergency_type.as_deref().unwrap_or(DEFAULT_EMERGENCY);

    state
        .zones
        .simulate_emergency(zone_id.trim(), kind)
        .await
        .map(|z| ApiResponse::ok(z).message("Emergency scenario simulated successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}
