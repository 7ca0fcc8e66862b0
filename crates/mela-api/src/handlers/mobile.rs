//! `/api/mobile` handlers: the public, read-mostly surface for pilgrims' phones.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use mela_core::epoch_secs;
use mela_insight::{BoundingBox, crowd_level, occupancy_percent};
use mela_state::input::{AlertInput, FeedbackInput, LostFoundInput, PointInput};
use mela_state::{
    Alert, AlertStatus, Feedback, GeoPoint, Location, LocationKind, LocationStatus, LostFound,
    OperatingHours, RouteState, RouteStatus, Severity,
};

use crate::ApiState;
use crate::error::{ApiError, Context};
use crate::extract::ApiJson;
use crate::response::ApiResponse;

const DEFAULT_AMENITY_RADIUS_METERS: f64 = 500.0;
const SOS_KIND: &str = "SOS";
const MAX_UPDATES: usize = 10;

/// Public projection of a location.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicLocation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub coordinates: GeoPoint,
    pub description: String,
    pub amenities: Vec<String>,
    pub operating_hours: OperatingHours,
}

impl From<Location> for PublicLocation {
    fn from(l: Location) -> Self {
        Self {
            id: l.id,
            name: l.name,
            kind: l.kind,
            coordinates: l.coordinates,
            description: l.description,
            amenities: l.amenities,
            operating_hours: l.operating_hours,
        }
    }
}

fn active_locations(state: &ApiState, message: &'static str) -> Result<Vec<Location>, ApiError> {
    let mut locations = state
        .store
        .list_where(|l: &Location| l.status == LocationStatus::Active)
        .context(message)?;
    locations.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(locations)
}

/// GET /api/mobile/locations
pub async fn public_locations(
    State(state): State<ApiState>,
) -> Result<ApiResponse<Vec<PublicLocation>>, ApiError> {
    let locations: Vec<PublicLocation> = active_locations(&state, "Error fetching locations")?
        .into_iter()
        .map(PublicLocation::from)
        .collect();
    let count = locations.len();
    Ok(ApiResponse::ok(locations).count(count))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCrowdLevel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub coordinates: GeoPoint,
    pub capacity: u32,
    pub current_occupancy: u32,
    pub occupancy_percentage: u32,
    /// A crowd level, or `unknown` when the location has no capacity.
    pub crowd_level: &'static str,
}

impl From<Location> for PublicCrowdLevel {
    fn from(l: Location) -> Self {
        Self {
            occupancy_percentage: occupancy_percent(l.current_occupancy, l.capacity).unwrap_or(0),
            crowd_level: crowd_level(l.current_occupancy, l.capacity)
                .map_or("unknown", |level| level.as_str()),
            id: l.id,
            name: l.name,
            kind: l.kind,
            coordinates: l.coordinates,
            capacity: l.capacity,
            current_occupancy: l.current_occupancy,
        }
    }
}

/// GET /api/mobile/crowd-levels
pub async fn crowd_levels(
    State(state): State<ApiState>,
) -> Result<ApiResponse<Vec<PublicCrowdLevel>>, ApiError> {
    let levels: Vec<PublicCrowdLevel> = active_locations(&state, "Error fetching crowd levels")?
        .into_iter()
        .map(PublicCrowdLevel::from)
        .collect();
    let count = levels.len();
    Ok(ApiResponse::ok(levels).count(count))
}

/// GET /api/mobile/alerts
pub async fn public_alerts(State(state): State<ApiState>) -> Result<ApiResponse<Vec<Alert>>, ApiError> {
    let mut alerts = state
        .store
        .list_where(|a: &Alert| a.status == AlertStatus::Active)
        .context("Error fetching alerts")?;
    alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let count = alerts.len();
    Ok(ApiResponse::ok(alerts).count(count))
}

#[derive(Debug, Default, Deserialize)]
pub struct AmenityQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    /// Meters.
    pub radius: Option<String>,
}

/// GET /api/mobile/amenities
pub async fn nearby_amenities(
    State(state): State<ApiState>,
    Query(query): Query<AmenityQuery>,
) -> Result<ApiResponse<Vec<PublicLocation>>, ApiError> {
    let parse = |raw: Option<&str>| {
        raw.and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    let (Some(lat), Some(lng)) = (parse(query.latitude.as_deref()), parse(query.longitude.as_deref()))
    else {
        return Err(ApiError::bad_request("Latitude and longitude are required"));
    };
    let radius = match query.radius.as_deref() {
        Some(raw) => parse(Some(raw))
            .filter(|r| *r >= 0.0)
            .ok_or_else(|| ApiError::bad_request("radius must be a non-negative number of meters"))?,
        None => DEFAULT_AMENITY_RADIUS_METERS,
    };

    let area = BoundingBox::around_meters(GeoPoint::new(lat, lng), radius);
    let nearby: Vec<PublicLocation> = active_locations(&state, "Error fetching nearby amenities")?
        .into_iter()
        .filter(|l| area.contains(&l.coordinates))
        .map(PublicLocation::from)
        .collect();
    let count = nearby.len();
    Ok(ApiResponse::ok(nearby).count(count))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// GET /api/mobile/events
pub async fn event_schedule(State(state): State<ApiState>) -> ApiResponse<Vec<MobileEvent>> {
    let events: Vec<MobileEvent> = state
        .events
        .iter()
        .enumerate()
        .map(|(i, e)| MobileEvent {
            id: (i + 1).to_string(),
            title: e.title.clone(),
            description: e.description.clone(),
            start_time: e.start_time.clone(),
            end_time: e.end_time.clone(),
            location: e.location.clone(),
            kind: e.kind.clone(),
        })
        .collect();
    let count = events.len();
    ApiResponse::ok(events).count(count)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: String,
    /// `alert` or `route`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub timestamp: u64,
    /// `high` for critical alerts and closed routes, otherwise `normal`.
    pub priority: &'static str,
}

/// Feed of active alerts and routes that are not plainly open, newest first.
pub fn build_updates(alerts: Vec<Alert>, routes: Vec<RouteStatus>) -> Vec<Update> {
    let alert_updates = alerts.into_iter().map(|a| Update {
        priority: if matches!(a.severity, Severity::High | Severity::Critical) {
            "high"
        } else {
            "normal"
        },
        id: a.id,
        kind: "alert",
        title: format!("{} alert at {}", a.kind, a.location),
        message: a.message,
        timestamp: a.timestamp,
    });
    let route_updates = routes
        .into_iter()
        .filter(|r| r.status != RouteState::Open)
        .map(|r| Update {
            priority: if r.status == RouteState::Closed { "high" } else { "normal" },
            title: format!("{} is {}", r.name, r.status),
            message: r
                .live_message
                .unwrap_or_else(|| format!("{} to {}", r.from, r.to)),
            id: r.id,
            kind: "route",
            timestamp: r.updated_at,
        });

    let mut updates: Vec<Update> = alert_updates.chain(route_updates).collect();
    updates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    updates.truncate(MAX_UPDATES);
    updates
}

/// GET /api/mobile/updates
pub async fn realtime_updates(State(state): State<ApiState>) -> Result<ApiResponse<Vec<Update>>, ApiError> {
    let alerts = state
        .store
        .list_where(|a: &Alert| a.status == AlertStatus::Active)
        .context("Error fetching real-time updates")?;
    let routes = state
        .store
        .list::<RouteStatus>()
        .context("Error fetching real-time updates")?;
    let updates = build_updates(alerts, routes);
    let count = updates.len();
    Ok(ApiResponse::ok(updates).count(count))
}

/// POST /api/mobile/lost-found
pub async fn submit_lost_found(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<LostFoundInput>,
) -> Result<ApiResponse<LostFound>, ApiError> {
    let entry = input.create(epoch_secs())?;
    state
        .store
        .put(&entry)
        .context("Error submitting lost & found item")?;
    Ok(ApiResponse::created(entry).message("Lost & Found item submitted successfully"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    pub location: Option<String>,
    pub message: Option<String>,
    pub contact_number: Option<String>,
    pub coordinates: Option<PointInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosReceipt {
    pub alert_id: String,
    pub status: &'static str,
    pub estimated_response: &'static str,
}

/// POST /api/mobile/emergency
///
/// Raises a Critical SOS alert. Without explicit coordinates the location
/// name must match a known place.
pub async fn emergency_sos(
    State(state): State<ApiState>,
    ApiJson(sos): ApiJson<SosRequest>,
) -> Result<ApiResponse<SosReceipt>, ApiError> {
    let coordinates = match (sos.coordinates, sos.location.as_deref()) {
        (Some(point), _) => Some(point),
        (None, Some(name)) => state
            .store
            .find_location_by_name(name.trim())
            .context("Error processing emergency request")?
            .map(|l| PointInput::from(l.coordinates)),
        (None, None) => None,
    };
    let mut message = sos
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Emergency SOS".to_string());
    if let Some(contact) = sos.contact_number.as_deref().filter(|c| !c.trim().is_empty()) {
        message = format!("{message} (contact: {})", contact.trim());
    }

    let alert = AlertInput {
        kind: Some(SOS_KIND.to_string()),
        severity: Some(Severity::Critical),
        message: Some(message),
        location: sos.location,
        coordinates,
        ..AlertInput::default()
    }
    .create(epoch_secs())?;
    state
        .store
        .put(&alert)
        .context("Error processing emergency request")?;
    tracing::warn!(id = %alert.id, location = %alert.location, "emergency SOS received");

    Ok(ApiResponse::created(SosReceipt {
        alert_id: alert.id,
        status: "sent",
        estimated_response: "5-10 minutes",
    })
    .message("Emergency alert sent successfully. Help is on the way."))
}

/// POST /api/mobile/feedback
pub async fn submit_feedback(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<FeedbackInput>,
) -> Result<ApiResponse<Feedback>, ApiError> {
    let feedback = input.create(epoch_secs())?;
    state.store.put(&feedback).context("Error submitting feedback")?;
    tracing::info!(id = %feedback.id, rating = feedback.rating, category = %feedback.category, "feedback received");
    Ok(ApiResponse::created(feedback)
        .message("Feedback submitted successfully. Thank you for your input!"))
}
