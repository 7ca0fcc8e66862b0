//! `/api/routes` handlers for live route status.

use axum::extract::{Path, State};

use mela_core::epoch_secs;
use mela_state::RouteStatus;
use mela_state::input::RouteInput;

use crate::ApiState;
use crate::error::{ApiError, Context};
use crate::extract::ApiJson;
use crate::response::ApiResponse;

const NOT_FOUND: &str = "Route not found";

/// GET /api/routes
pub async fn list_routes(
    State(state): State<ApiState>,
) -> Result<ApiResponse<Vec<RouteStatus>>, ApiError> {
    let mut routes = state
        .store
        .list::<RouteStatus>()
        .context("Error fetching routes")?;
    routes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    let count = routes.len();
    Ok(ApiResponse::ok(routes).count(count))
}

/// POST /api/routes
///
/// A route with the same name, origin and destination is updated in place.
pub async fn upsert_route(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<RouteInput>,
) -> Result<ApiResponse<RouteStatus>, ApiError> {
    let now = epoch_secs();
    let existing = match input.identity() {
        Some((name, from, to)) => state
            .store
            .find_route(&name, &from, &to)
            .context("Error saving route")?,
        None => None,
    };

    match existing {
        Some(mut route) => {
            input.apply(&mut route, now)?;
            state.store.put(&route).context("Error saving route")?;
            tracing::debug!(id = %route.id, status = %route.status, "route status updated");
            Ok(ApiResponse::ok(route).message("Route updated successfully"))
        }
        None => {
            let route = input.create(now)?;
            state.store.put(&route).context("Error saving route")?;
            tracing::info!(id = %route.id, name = %route.name, "route created");
            Ok(ApiResponse::created(route).message("Route created successfully"))
        }
    }
}

/// GET /api/routes/{id}
pub async fn get_route(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RouteStatus>, ApiError> {
    state
        .store
        .get::<RouteStatus>(&id)
        .context("Error fetching route")?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

/// PUT /api/routes/{id}
pub async fn update_route(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<RouteInput>,
) -> Result<ApiResponse<RouteStatus>, ApiError> {
    let mut route = state
        .store
        .get::<RouteStatus>(&id)
        .context("Error updating route")?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    input.apply(&mut route, epoch_secs())?;
    state.store.put(&route).context("Error updating route")?;
    Ok(ApiResponse::ok(route).message("Route updated successfully"))
}

/// DELETE /api/routes/{id}
pub async fn delete_route(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RouteStatus>, ApiError> {
    state
        .store
        .delete::<RouteStatus>(&id)
        .context("Error deleting route")?
        .map(|r| ApiResponse::ok(r).message("Route deleted successfully"))
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}
