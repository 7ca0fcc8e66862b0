//! `/api/crowd` handlers for persisted occupancy readings.
//!
//! The live demo zones under `/api/crowd/zones` live in `zones.rs`.

use std::collections::{BTreeMap, HashMap};

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use mela_core::epoch_secs;
use mela_insight::{Prediction, PredictionInput, crowd_level, draw_confidence, occupancy_percent, predict};
use mela_state::input::CrowdDataInput;
use mela_state::{Alert, AlertStatus, CrowdData, CrowdLevel, GeoPoint, Location, StateStore};

use super::locations::rate_percent;
use crate::ApiState;
use crate::error::{ApiError, Context};
use crate::extract::ApiJson;
use crate::response::{ApiResponse, BulkOutcome, Pagination};

const NOT_FOUND: &str = "Crowd data not found";
const OVERCAPACITY_PERCENT: u32 = 80;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdQuery {
    pub location_id: Option<String>,
    pub crowd_level: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/crowd
pub async fn list_crowd_data(
    State(state): State<ApiState>,
    Query(query): Query<CrowdQuery>,
) -> Result<ApiResponse<Vec<CrowdData>>, ApiError> {
    let mut readings = state
        .store
        .list_where(|c: &CrowdData| {
            query.location_id.as_deref().is_none_or(|id| c.location_id == id)
                && query
                    .crowd_level
                    .as_deref()
                    .is_none_or(|l| c.crowd_level.as_str() == l)
        })
        .context("Error fetching crowd data")?;
    readings.sort_by_key(|c| std::cmp::Reverse(c.recency()));

    let (page_items, page) =
        Pagination::from_query(query.page.as_deref(), query.limit.as_deref()).slice(readings);
    let count = page_items.len();
    Ok(ApiResponse::ok(page_items).count(count).page(page))
}

/// Resolve the referenced location and build a reading, deriving the crowd
/// level from the location's capacity when the payload has none.
fn build_reading(store: &StateStore, input: CrowdDataInput, now: u64) -> Result<CrowdData, ApiError> {
    let location = match input.location_id.as_deref() {
        Some(id) => store
            .get::<Location>(id.trim())
            .context("Error creating crowd data")?,
        None => None,
    };
    let derived = location
        .as_ref()
        .zip(input.occupancy())
        .and_then(|(l, occupancy)| crowd_level(occupancy, l.capacity));
    Ok(input.create(now, location.is_some(), derived)?)
}

/// POST /api/crowd
pub async fn create_crowd_data(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<CrowdDataInput>,
) -> Result<ApiResponse<CrowdData>, ApiError> {
    let mut reading = build_reading(&state.store, input, epoch_secs())?;
    state
        .store
        .record_crowd(&mut reading)
        .context("Error creating crowd data")?;
    if matches!(reading.crowd_level, CrowdLevel::High | CrowdLevel::Critical) {
        tracing::warn!(location_id = %reading.location_id, level = %reading.crowd_level, "congestion reported");
    }
    Ok(ApiResponse::created(reading).message("Crowd data created successfully"))
}

#[derive(Debug, Deserialize)]
pub struct BulkCrowdRequest {
    pub updates: Vec<serde_json::Value>,
}

/// POST /api/crowd/bulk
pub async fn bulk_create_crowd_data(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<BulkCrowdRequest>,
) -> Result<ApiResponse<BulkOutcome<CrowdData>>, ApiError> {
    let now = epoch_secs();
    let mut outcome = BulkOutcome::new();
    for (index, raw) in request.updates.into_iter().enumerate() {
        let input: CrowdDataInput = match serde_json::from_value(raw.clone()) {
            Ok(input) => input,
            Err(e) => {
                outcome.fail(index, raw, e);
                continue;
            }
        };
        match build_reading(&state.store, input, now) {
            Ok(mut reading) => {
                state
                    .store
                    .record_crowd(&mut reading)
                    .context("Error bulk creating crowd data")?;
                outcome.succeeded.push(reading);
            }
            Err(e @ ApiError::Internal { .. }) => return Err(e),
            Err(ApiError::Validation(errors)) => outcome.fail(index, raw, errors.join("; ")),
            Err(e) => outcome.fail(index, raw, e),
        }
    }
    let message = outcome.summary("crowd data updates");
    Ok(ApiResponse::ok(outcome).message(message))
}

/// GET /api/crowd/realtime
pub async fn realtime_crowd(
    State(state): State<ApiState>,
) -> Result<ApiResponse<Vec<CrowdData>>, ApiError> {
    let latest = state
        .store
        .latest_crowd_per_location()
        .context("Error fetching real-time crowd data")?;
    let count = latest.len();
    Ok(ApiResponse::ok(latest).count(count))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCrowdStats {
    pub location_id: String,
    pub location: String,
    pub readings: usize,
    pub avg_occupancy: u32,
    pub peak_occupancy: u32,
    pub current_count: u32,
    pub capacity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdOverview {
    pub total_entries: usize,
    pub avg_occupancy: u32,
    pub current_alerts: usize,
    pub total_capacity: u64,
    pub current_occupancy: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdStats {
    pub overview: CrowdOverview,
    pub by_level: BTreeMap<&'static str, usize>,
    pub by_location: Vec<LocationCrowdStats>,
}

fn mean(values: impl Iterator<Item = u32>) -> u32 {
    let (sum, n) = values.fold((0u64, 0u64), |(s, n), v| (s + u64::from(v), n + 1));
    if n == 0 { 0 } else { (sum as f64 / n as f64).round() as u32 }
}

fn is_congested(level: CrowdLevel) -> bool {
    matches!(level, CrowdLevel::High | CrowdLevel::Critical)
}

/// GET /api/crowd/stats
pub async fn crowd_stats(State(state): State<ApiState>) -> Result<ApiResponse<CrowdStats>, ApiError> {
    let readings = state
        .store
        .list::<CrowdData>()
        .context("Error fetching crowd stats")?;
    let locations = state
        .store
        .list::<Location>()
        .context("Error fetching crowd stats")?;
    let latest = state
        .store
        .latest_crowd_per_location()
        .context("Error fetching crowd stats")?;

    let mut by_level = BTreeMap::new();
    for level in CrowdLevel::ALL {
        by_level.insert(level.as_str(), 0);
    }
    let mut per_location: HashMap<&str, Vec<u32>> = HashMap::new();
    for r in &readings {
        *by_level.entry(r.crowd_level.as_str()).or_insert(0) += 1;
        per_location
            .entry(r.location_id.as_str())
            .or_default()
            .push(r.current_occupancy);
    }

    let mut by_location: Vec<LocationCrowdStats> = locations
        .iter()
        .filter_map(|l| {
            let samples = per_location.get(l.id.as_str())?;
            Some(LocationCrowdStats {
                location_id: l.id.clone(),
                location: l.name.clone(),
                readings: samples.len(),
                avg_occupancy: mean(samples.iter().copied()),
                peak_occupancy: samples.iter().copied().max().unwrap_or(0),
                current_count: l.current_occupancy,
                capacity: l.capacity,
            })
        })
        .collect();
    by_location.sort_by(|a, b| a.location.cmp(&b.location));

    let overview = CrowdOverview {
        total_entries: readings.len(),
        avg_occupancy: mean(readings.iter().map(|r| r.current_occupancy)),
        current_alerts: latest.iter().filter(|r| is_congested(r.crowd_level)).count(),
        total_capacity: locations.iter().map(|l| u64::from(l.capacity)).sum(),
        current_occupancy: locations.iter().map(|l| u64::from(l.current_occupancy)).sum(),
    };

    Ok(ApiResponse::ok(CrowdStats {
        overview,
        by_level,
        by_location,
    })
    .message("Crowd statistics retrieved successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_locations: usize,
    pub total_capacity: u64,
    pub total_occupancy: u64,
    pub average_occupancy_rate: u32,
    pub critical_locations: usize,
    pub high_risk_locations: usize,
    pub active_alerts: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLocation {
    pub id: String,
    pub name: String,
    pub current_count: u32,
    pub capacity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_percentage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crowd_level: Option<CrowdLevel>,
    /// `alert` for high or critical levels, otherwise `normal`.
    pub status: &'static str,
    pub coordinates: GeoPoint,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub summary: DashboardSummary,
    pub locations: Vec<DashboardLocation>,
    pub recent_readings: Vec<CrowdData>,
}

/// GET /api/crowd/dashboard
pub async fn crowd_dashboard(State(state): State<ApiState>) -> Result<ApiResponse<Dashboard>, ApiError> {
    let mut locations = state
        .store
        .list::<Location>()
        .context("Error fetching dashboard data")?;
    locations.sort_by(|a, b| a.name.cmp(&b.name));
    let active_alerts = state
        .store
        .list_where(|a: &Alert| a.status == AlertStatus::Active)
        .context("Error fetching dashboard data")?
        .len();
    let mut recent = state
        .store
        .latest_crowd_per_location()
        .context("Error fetching dashboard data")?;
    recent.truncate(10);

    let rows: Vec<DashboardLocation> = locations
        .iter()
        .map(|l| {
            let level = crowd_level(l.current_occupancy, l.capacity);
            DashboardLocation {
                id: l.id.clone(),
                name: l.name.clone(),
                current_count: l.current_occupancy,
                capacity: l.capacity,
                occupancy_percentage: occupancy_percent(l.current_occupancy, l.capacity),
                crowd_level: level,
                status: if level.is_some_and(is_congested) { "alert" } else { "normal" },
                coordinates: l.coordinates,
            }
        })
        .collect();

    let total_capacity: u64 = locations.iter().map(|l| u64::from(l.capacity)).sum();
    let total_occupancy: u64 = locations.iter().map(|l| u64::from(l.current_occupancy)).sum();
    let summary = DashboardSummary {
        total_locations: locations.len(),
        total_capacity,
        total_occupancy,
        average_occupancy_rate: rate_percent(total_occupancy, total_capacity),
        critical_locations: rows
            .iter()
            .filter(|r| r.crowd_level == Some(CrowdLevel::Critical))
            .count(),
        high_risk_locations: rows
            .iter()
            .filter(|r| r.crowd_level == Some(CrowdLevel::High))
            .count(),
        active_alerts,
    };

    Ok(ApiResponse::ok(Dashboard {
        summary,
        locations: rows,
        recent_readings: recent,
    })
    .message("Dashboard data retrieved successfully"))
}

/// GET /api/crowd/alerts
pub async fn congestion_alerts(
    State(state): State<ApiState>,
) -> Result<ApiResponse<Vec<CrowdData>>, ApiError> {
    let mut readings = state
        .store
        .list_where(|c: &CrowdData| is_congested(c.crowd_level))
        .context("Error fetching crowd alerts")?;
    readings.sort_by_key(|c| std::cmp::Reverse(c.recency()));
    let count = readings.len();
    Ok(ApiResponse::ok(readings).count(count))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OvercapacityAlert {
    pub location_id: String,
    pub location: String,
    pub current_count: u32,
    pub capacity: u32,
    pub occupancy_percentage: u32,
    /// `critical` at or above capacity, otherwise `warning`.
    pub alert_level: &'static str,
    pub message: &'static str,
}

/// GET /api/crowd/alerts/overcapacity
pub async fn overcapacity_alerts(
    State(state): State<ApiState>,
) -> Result<ApiResponse<Vec<OvercapacityAlert>>, ApiError> {
    let locations = state
        .store
        .list::<Location>()
        .context("Error fetching overcapacity alerts")?;
    let mut alerts: Vec<OvercapacityAlert> = locations
        .into_iter()
        .filter_map(|l| {
            let percent = occupancy_percent(l.current_occupancy, l.capacity)?;
            (percent >= OVERCAPACITY_PERCENT).then(|| {
                let full = percent >= 100;
                OvercapacityAlert {
                    location_id: l.id,
                    location: l.name,
                    current_count: l.current_occupancy,
                    capacity: l.capacity,
                    occupancy_percentage: percent,
                    alert_level: if full { "critical" } else { "warning" },
                    message: if full {
                        "Location is at or over maximum capacity"
                    } else {
                        "Location approaching maximum capacity"
                    },
                }
            })
        })
        .collect();
    alerts.sort_by(|a, b| b.occupancy_percentage.cmp(&a.occupancy_percentage));
    let count = alerts.len();
    Ok(ApiResponse::ok(alerts).count(count))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
}

/// GET /api/crowd/location/{locationId}
pub async fn location_history(
    State(state): State<ApiState>,
    Path(location_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<ApiResponse<Vec<CrowdData>>, ApiError> {
    state
        .store
        .get::<Location>(&location_id)
        .context("Error fetching location crowd data")?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;
    let mut history = state
        .store
        .crowd_history(&location_id)
        .context("Error fetching location crowd data")?;
    if let Some(limit) = query.limit.as_deref().and_then(|l| l.parse::<usize>().ok()) {
        history.truncate(limit);
    }
    let count = history.len();
    Ok(ApiResponse::ok(history).count(count))
}

/// POST /api/crowd/predict
pub async fn predict_crowd(
    ApiJson(input): ApiJson<PredictionInput>,
) -> Result<ApiResponse<Prediction>, ApiError> {
    let mut errors = Vec::new();
    if !(0.0..=100.0).contains(&input.current_density) {
        errors.push("currentDensity must be between 0 and 100".to_string());
    }
    if input.entry_rate < 0.0 {
        errors.push("entryRate must be non-negative".to_string());
    }
    if input.exit_rate < 0.0 {
        errors.push("exitRate must be non-negative".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let confidence = draw_confidence(&mut rand::thread_rng());
    Ok(ApiResponse::ok(predict(&input, confidence)).message("Prediction generated successfully"))
}

/// GET /api/crowd/{id}
pub async fn get_crowd_data(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<CrowdData>, ApiError> {
    state
        .store
        .get::<CrowdData>(&id)
        .context("Error fetching crowd data")?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PUT /api/crowd/{id}
pub async fn update_crowd_data(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CrowdDataInput>,
) -> Result<ApiResponse<CrowdData>, ApiError> {
    let mut reading = state
        .store
        .get::<CrowdData>(&id)
        .context("Error updating crowd data")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    let location = state
        .store
        .get::<Location>(&reading.location_id)
        .context("Error updating crowd data")?;
    let derived = location
        .zip(input.occupancy())
        .and_then(|(l, occupancy)| crowd_level(occupancy, l.capacity));
    input.apply(&mut reading, epoch_secs(), derived)?;
    state.store.put(&reading).context("Error updating crowd data")?;
    Ok(ApiResponse::ok(reading).message("Crowd data updated successfully"))
}

/// DELETE /api/crowd/{id}
pub async fn delete_crowd_data(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<CrowdData>, ApiError> {
    state
        .store
        .delete::<CrowdData>(&id)
        .context("Error deleting crowd data")?
        .map(|c| ApiResponse::ok(c).message("Deleted successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}
