//! `/api/locations` handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use mela_core::epoch_secs;
use mela_insight::{BoundingBox, parse_point_radius};
use mela_state::input::{LocationInput, OccupancyInput};
use mela_state::{Location, LocationStatus};

use crate::ApiState;
use crate::error::{ApiError, Context};
use crate::extract::ApiJson;
use crate::response::ApiResponse;

const NOT_FOUND: &str = "Location not found";
const DEFAULT_NEARBY_METERS: f64 = 1000.0;

#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    /// `lat,lng[,meters]`
    pub nearby: Option<String>,
}

/// GET /api/locations
pub async fn list_locations(
    State(state): State<ApiState>,
    Query(query): Query<LocationQuery>,
) -> Result<ApiResponse<Vec<Location>>, ApiError> {
    let near = match query.nearby.as_deref() {
        Some(raw) => {
            let (center, radius) = parse_point_radius(raw)
                .ok_or_else(|| ApiError::bad_request("nearby must be lat,lng[,meters]"))?;
            Some(BoundingBox::around_meters(
                center,
                // A zero distance falls back to the default.
                radius.filter(|r| *r > 0.0).unwrap_or(DEFAULT_NEARBY_METERS),
            ))
        }
        None => None,
    };

    let mut locations = state
        .store
        .list_where(|l: &Location| {
            query.kind.as_deref().is_none_or(|k| l.kind.as_str() == k)
                && query.status.as_deref().is_none_or(|s| l.status.as_str() == s)
                && near.is_none_or(|b| b.contains(&l.coordinates))
        })
        .context("Error fetching locations")?;
    locations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let count = locations.len();
    Ok(ApiResponse::ok(locations).count(count))
}

/// POST /api/locations
pub async fn create_location(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<LocationInput>,
) -> Result<ApiResponse<Location>, ApiError> {
    let location = input.create(epoch_secs())?;
    state.store.put(&location).context("Error creating location")?;
    tracing::info!(id = %location.id, name = %location.name, "location created");
    Ok(ApiResponse::created(location).message("Location created successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStats {
    pub total_locations: usize,
    pub active_locations: usize,
    pub total_capacity: u64,
    pub total_occupancy: u64,
    /// Percentage; 0 when no capacity is recorded.
    pub occupancy_rate: u32,
    pub by_type: BTreeMap<&'static str, usize>,
}

/// Rounded `part / whole` percentage; 0 when `whole` is 0.
pub fn rate_percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        0
    } else {
        (part as f64 / whole as f64 * 100.0).round() as u32
    }
}

impl LocationStats {
    pub fn of(locations: &[Location]) -> Self {
        let total_capacity: u64 = locations.iter().map(|l| u64::from(l.capacity)).sum();
        let total_occupancy: u64 = locations.iter().map(|l| u64::from(l.current_occupancy)).sum();
        let mut by_type = BTreeMap::new();
        for l in locations {
            *by_type.entry(l.kind.as_str()).or_insert(0) += 1;
        }
        Self {
            total_locations: locations.len(),
            active_locations: locations
                .iter()
                .filter(|l| l.status == LocationStatus::Active)
                .count(),
            total_capacity,
            total_occupancy,
            occupancy_rate: rate_percent(total_occupancy, total_capacity),
            by_type,
        }
    }
}

/// GET /api/locations/stats
pub async fn location_stats(
    State(state): State<ApiState>,
) -> Result<ApiResponse<LocationStats>, ApiError> {
    let locations = state
        .store
        .list::<Location>()
        .context("Error fetching location statistics")?;
    Ok(ApiResponse::ok(LocationStats::of(&locations)))
}

/// GET /api/locations/{id}
pub async fn get_location(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Location>, ApiError> {
    state
        .store
        .get::<Location>(&id)
        .context("Error fetching location")?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PUT /api/locations/{id}
pub async fn update_location(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<LocationInput>,
) -> Result<ApiResponse<Location>, ApiError> {
    let mut location = state
        .store
        .get::<Location>(&id)
        .context("Error updating location")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    input.apply(&mut location, epoch_secs())?;
    state.store.put(&location).context("Error updating location")?;
    Ok(ApiResponse::ok(location).message("Location updated successfully"))
}

/// PATCH /api/locations/{id}/occupancy
pub async fn update_occupancy(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<OccupancyInput>,
) -> Result<ApiResponse<Location>, ApiError> {
    let occupancy = input.value()?;
    let now = epoch_secs();
    state
        .store
        .modify::<Location>(&id, |l| {
            l.current_occupancy = occupancy;
            l.updated_at = now;
        })
        .context("Error updating occupancy")?
        .map(|l| ApiResponse::ok(l).message("Occupancy updated successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// DELETE /api/locations/{id}
pub async fn delete_location(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Location>, ApiError> {
    state
        .store
        .delete::<Location>(&id)
        .context("Error deleting location")?
        .map(|l| ApiResponse::ok(l).message("Location deleted successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}
