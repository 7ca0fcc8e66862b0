//! `/api/alerts` handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use mela_core::epoch_secs;
use mela_insight::{BoundingBox, parse_point_radius};
use mela_state::input::AlertInput;
use mela_state::{Alert, AlertStatus, Severity};

use crate::ApiState;
use crate::error::{ApiError, Context};
use crate::extract::ApiJson;
use crate::response::{ApiResponse, Pagination};

const NOT_FOUND: &str = "Alert not found";
const DEFAULT_RADIUS_KM: f64 = 1.0;
const DAY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
    /// `lat,lng[,km]`
    pub location: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/alerts
pub async fn list_alerts(
    State(state): State<ApiState>,
    Query(query): Query<AlertQuery>,
) -> Result<ApiResponse<Vec<Alert>>, ApiError> {
    let area = match query.location.as_deref() {
        Some(raw) => {
            let (center, radius) = parse_point_radius(raw)
                .ok_or_else(|| ApiError::bad_request("location must be lat,lng[,km]"))?;
            let radius = radius.filter(|r| *r > 0.0).unwrap_or(DEFAULT_RADIUS_KM);
            Some(BoundingBox::around_km(center, radius))
        }
        None => None,
    };

    let mut alerts = state
        .store
        .list_where(|a: &Alert| {
            query.kind.as_deref().is_none_or(|k| a.kind == k)
                && query.status.as_deref().is_none_or(|s| a.status.as_str() == s)
                && query.severity.as_deref().is_none_or(|s| a.severity.as_str() == s)
                && area.is_none_or(|b| b.contains(&a.coordinates))
        })
        .context("Error fetching alerts")?;
    alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let (page_items, page) =
        Pagination::from_query(query.page.as_deref(), query.limit.as_deref()).slice(alerts);
    let count = page_items.len();
    Ok(ApiResponse::ok(page_items).count(count).page(page))
}

/// POST /api/alerts
pub async fn create_alert(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<AlertInput>,
) -> Result<ApiResponse<Alert>, ApiError> {
    let alert = input.create(epoch_secs())?;
    state.store.put(&alert).context("Error creating alert")?;
    tracing::info!(id = %alert.id, severity = %alert.severity, "alert raised");
    Ok(ApiResponse::created(alert).message("Alert created successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    pub critical: usize,
    pub last_24_hours: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<&'static str, usize>,
}

impl AlertStats {
    pub fn of(alerts: &[Alert], now: u64) -> Self {
        let since = now.saturating_sub(DAY_SECS);
        let mut by_type = BTreeMap::new();
        let mut by_severity = BTreeMap::new();
        for a in alerts {
            *by_type.entry(a.kind.clone()).or_insert(0) += 1;
            *by_severity.entry(a.severity.as_str()).or_insert(0) += 1;
        }
        Self {
            total: alerts.len(),
            active: alerts.iter().filter(|a| a.status == AlertStatus::Active).count(),
            resolved: alerts.iter().filter(|a| a.status == AlertStatus::Resolved).count(),
            critical: alerts.iter().filter(|a| a.severity == Severity::Critical).count(),
            last_24_hours: alerts.iter().filter(|a| a.timestamp >= since).count(),
            by_type,
            by_severity,
        }
    }
}

/// GET /api/alerts/stats/summary
pub async fn alert_stats(State(state): State<ApiState>) -> Result<ApiResponse<AlertStats>, ApiError> {
    let alerts = state
        .store
        .list::<Alert>()
        .context("Error fetching alert statistics")?;
    Ok(ApiResponse::ok(AlertStats::of(&alerts, epoch_secs())))
}

/// GET /api/alerts/{id}
pub async fn get_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Alert>, ApiError> {
    state
        .store
        .get::<Alert>(&id)
        .context("Error fetching alert")?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PUT /api/alerts/{id}
pub async fn update_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<AlertInput>,
) -> Result<ApiResponse<Alert>, ApiError> {
    let mut alert = state
        .store
        .get::<Alert>(&id)
        .context("Error updating alert")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    input.apply(&mut alert, epoch_secs())?;
    state.store.put(&alert).context("Error updating alert")?;
    Ok(ApiResponse::ok(alert).message("Alert updated successfully"))
}

/// DELETE /api/alerts/{id}
pub async fn delete_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Alert>, ApiError> {
    state
        .store
        .delete::<Alert>(&id)
        .context("Error deleting alert")?
        .map(|a| ApiResponse::ok(a).message("Alert deleted successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

fn transition(
    state: &ApiState,
    id: &str,
    failure: &'static str,
    done: &'static str,
    change: impl FnOnce(&mut Alert),
) -> Result<ApiResponse<Alert>, ApiError> {
    let now = epoch_secs();
    state
        .store
        .modify::<Alert>(id, |a| {
            change(a);
            a.updated_at = now;
        })
        .context(failure)?
        .map(|a| {
            tracing::info!(id = %a.id, status = %a.status, severity = %a.severity, "{done}");
            ApiResponse::ok(a).message(done)
        })
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PATCH /api/alerts/{id}/acknowledge
pub async fn acknowledge_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Alert>, ApiError> {
    transition(&state, &id, "Error acknowledging alert", "Alert acknowledged", |a| {
        a.status = AlertStatus::Acknowledged;
    })
}

/// PATCH /api/alerts/{id}/resolve
pub async fn resolve_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Alert>, ApiError> {
    transition(&state, &id, "Error resolving alert", "Alert resolved", |a| {
        a.status = AlertStatus::Resolved;
    })
}

/// PATCH /api/alerts/{id}/escalate
pub async fn escalate_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Alert>, ApiError> {
    transition(&state, &id, "Error escalating alert", "Alert escalated", |a| {
        a.severity = Severity::Critical;
    })
}
