//! `/api/timing` handlers: devotee entry/exit tracking and overstay alerts.

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use mela_core::epoch_secs;
use mela_state::DevoteeTiming;
use mela_state::input::TimingInput;

use crate::ApiState;
use crate::error::{ApiError, Context};
use crate::extract::ApiJson;
use crate::response::ApiResponse;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingQuery {
    pub zone: Option<String>,
    pub devotee_id: Option<String>,
}

fn newest_first(timings: &mut [DevoteeTiming]) {
    timings.sort_by(|a, b| b.entry_time.cmp(&a.entry_time));
}

/// GET /api/timing
pub async fn list_timings(
    State(state): State<ApiState>,
    Query(query): Query<TimingQuery>,
) -> Result<ApiResponse<Vec<DevoteeTiming>>, ApiError> {
    let mut timings = state
        .store
        .list_where(|t: &DevoteeTiming| {
            query.zone.as_deref().is_none_or(|z| t.zone == z)
                && query.devotee_id.as_deref().is_none_or(|d| t.devotee_id == d)
        })
        .context("Error fetching timing data")?;
    newest_first(&mut timings);
    let count = timings.len();
    Ok(ApiResponse::ok(timings).count(count))
}

/// POST /api/timing/entry
pub async fn log_entry(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<TimingInput>,
) -> Result<ApiResponse<DevoteeTiming>, ApiError> {
    let (devotee_id, zone) = input.validate()?;
    let timing = DevoteeTiming::enter(&devotee_id, &zone, epoch_secs());
    state.store.put(&timing).context("Error logging entry")?;
    tracing::debug!(%devotee_id, %zone, "devotee entered zone");
    Ok(ApiResponse::created(timing).message("Entry logged successfully"))
}

/// POST /api/timing/exit
///
/// Closes the most recent open entry for the devotee in the zone.
pub async fn log_exit(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<TimingInput>,
) -> Result<ApiResponse<DevoteeTiming>, ApiError> {
    let (devotee_id, zone) = input.validate()?;
    let mut timing = state
        .store
        .open_timing(&devotee_id, &zone)
        .context("Error logging exit")?
        .ok_or_else(|| ApiError::not_found("No active entry found for devotee in this zone"))?;
    timing.close(epoch_secs(), state.overstay_minutes);
    state.store.put(&timing).context("Error logging exit")?;

    if timing.overstay {
        tracing::warn!(
            %devotee_id,
            %zone,
            minutes = timing.duration_minutes.unwrap_or_default(),
            "overstay recorded"
        );
    }
    Ok(ApiResponse::ok(timing).message("Exit logged successfully"))
}

/// GET /api/timing/alerts
pub async fn overstay_alerts(
    State(state): State<ApiState>,
) -> Result<ApiResponse<Vec<DevoteeTiming>>, ApiError> {
    let mut pending = state
        .store
        .list_where(|t: &DevoteeTiming| t.overstay && !t.alert_sent)
        .context("Error fetching overstay alerts")?;
    newest_first(&mut pending);
    let count = pending.len();
    Ok(ApiResponse::ok(pending).count(count))
}

/// PATCH /api/timing/alerts/{id}/sent
pub async fn mark_alert_sent(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<DevoteeTiming>, ApiError> {
    let now = epoch_secs();
    state
        .store
        .modify::<DevoteeTiming>(&id, |t| {
            t.alert_sent = true;
            t.updated_at = now;
        })
        .context("Error updating overstay alert")?
        .map(|t| ApiResponse::ok(t).message("Overstay alert marked as sent"))
        .ok_or_else(|| ApiError::not_found("Timing record not found"))
}

/// GET /api/timing/history/{devoteeId}
pub async fn devotee_history(
    State(state): State<ApiState>,
    Path(devotee_id): Path<String>,
) -> Result<ApiResponse<Vec<DevoteeTiming>>, ApiError> {
    let mut history = state
        .store
        .list_where(|t: &DevoteeTiming| t.devotee_id == devotee_id)
        .context("Error fetching devotee history")?;
    newest_first(&mut history);
    let count = history.len();
    Ok(ApiResponse::ok(history).count(count))
}
