//! mela-api: REST API for the mela operations dashboard and mobile app.
//!
//! Every response uses the envelope in [`response`]; every failure is an
//! [`error::ApiError`].
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/test` | Liveness probe |
//! | GET, POST | `/api/locations` | List (type, status, nearby) / create |
//! | GET | `/api/locations/stats` | Capacity and occupancy totals |
//! | GET, PUT, DELETE | `/api/locations/{id}` | Single location |
//! | PATCH | `/api/locations/{id}/occupancy` | Set current occupancy |
//! | GET, POST | `/api/alerts` | List (paginated) / create |
//! | GET | `/api/alerts/stats/summary` | Alert counts |
//! | GET, PUT, DELETE | `/api/alerts/{id}` | Single alert |
//! | PATCH | `/api/alerts/{id}/{acknowledge,resolve,escalate}` | Status transitions |
//! | GET, POST | `/api/crowd` | Crowd readings |
//! | POST | `/api/crowd/bulk` | Many readings, per-item errors |
//! | GET | `/api/crowd/{realtime,stats,dashboard,alerts,alerts/overcapacity}` | Derived views |
//! | GET | `/api/crowd/location/{locationId}` | Reading history of one location |
//! | POST | `/api/crowd/predict` | Run the crowd predictor |
//! | GET, PUT, DELETE | `/api/crowd/{id}` | Single reading |
//! | GET | `/api/crowd/zones[/live,/predictions,/heatmap,/surveillance,/analytics]` | Live zone board |
//! | GET | `/api/crowd/zones/{zoneId}` | Single zone |
//! | POST | `/api/crowd/zones/{density,simulate-emergency}` | Zone board writes |
//! | GET, POST | `/api/lost-found` | List / report (also `POST /report`) |
//! | GET | `/api/lost-found/{stats,matches,history}` | Derived views |
//! | GET, PUT, DELETE | `/api/lost-found/{id}` | Single item |
//! | PATCH | `/api/lost-found/{id}/{claim,resolve}` | Status transitions |
//! | GET | `/api/timing` | Entry/exit records |
//! | POST | `/api/timing/{entry,exit}` | Log a devotee entering or leaving a zone |
//! | GET | `/api/timing/alerts` | Unsent overstay alerts |
//! | PATCH | `/api/timing/alerts/{id}/sent` | Mark an overstay alert as sent |
//! | GET | `/api/timing/history/{devoteeId}` | One devotee's records |
//! | GET, POST | `/api/settings` | List (optionally grouped) / create |
//! | PUT | `/api/settings/bulk` | Upsert many settings |
//! | GET, PUT, DELETE | `/api/settings/{key}` | Single setting |
//! | GET, POST | `/api/routes` | List / upsert by name, origin and destination |
//! | GET, PUT, DELETE | `/api/routes/{id}` | Single route |
//! | GET | `/api/mobile/{locations,crowd-levels,alerts,amenities,events,updates}` | Public views |
//! | POST | `/api/mobile/{lost-found,emergency,feedback}` | Public submissions |

pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;

use std::sync::Arc;

use axum::http::Uri;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use mela_core::config::EventConfig;
use mela_sim::ZoneBoard;
use mela_state::StateStore;

use crate::error::ApiError;
use crate::handlers::{alerts, crowd, locations, lost_found, mobile, routes, settings, timing, zones};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub zones: ZoneBoard,
    /// Stays longer than this are flagged as overstays on exit.
    pub overstay_minutes: u64,
    pub events: Arc<Vec<EventConfig>>,
}

impl ApiState {
    pub fn new(store: StateStore, zones: ZoneBoard, overstay_minutes: u64, events: Vec<EventConfig>) -> Self {
        Self {
            store,
            zones,
            overstay_minutes,
            events: Arc::new(events),
        }
    }
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let location_routes = Router::new()
        .route("/", get(locations::list_locations).post(locations::create_location))
        .route("/stats", get(locations::location_stats))
        .route(
            "/{id}",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route("/{id}/occupancy", patch(locations::update_occupancy));

    let alert_routes = Router::new()
        .route("/", get(alerts::list_alerts).post(alerts::create_alert))
        .route("/stats/summary", get(alerts::alert_stats))
        .route(
            "/{id}",
            get(alerts::get_alert)
                .put(alerts::update_alert)
                .delete(alerts::delete_alert),
        )
        .route("/{id}/acknowledge", patch(alerts::acknowledge_alert))
        .route("/{id}/resolve", patch(alerts::resolve_alert))
        .route("/{id}/escalate", patch(alerts::escalate_alert));

    let zone_routes = Router::new()
        .route("/", get(zones::list_zones))
        .route("/live", get(zones::live_zones))
        .route("/predictions", get(zones::zone_predictions))
        .route("/heatmap", get(zones::zone_heatmap))
        .route("/surveillance", get(zones::zone_surveillance))
        .route("/analytics", get(zones::zone_analytics))
        .route("/density", post(zones::update_zone_density))
        .route("/simulate-emergency", post(zones::simulate_zone_emergency))
        .route("/{zone_id}", get(zones::get_zone));

    let crowd_routes = Router::new()
        .route("/", get(crowd::list_crowd_data).post(crowd::create_crowd_data))
        .route("/bulk", post(crowd::bulk_create_crowd_data))
        .route("/realtime", get(crowd::realtime_crowd))
        .route("/stats", get(crowd::crowd_stats))
        .route("/dashboard", get(crowd::crowd_dashboard))
        .route("/alerts", get(crowd::congestion_alerts))
        .route("/alerts/overcapacity", get(crowd::overcapacity_alerts))
        .route("/location/{location_id}", get(crowd::location_history))
        .route("/predict", post(crowd::predict_crowd))
        .nest("/zones", zone_routes)
        .route(
            "/{id}",
            get(crowd::get_crowd_data)
                .put(crowd::update_crowd_data)
                .delete(crowd::delete_crowd_data),
        );

    let lost_found_routes = Router::new()
        .route("/", get(lost_found::list_items).post(lost_found::report_item))
        .route("/report", post(lost_found::report_item))
        .route("/stats", get(lost_found::item_stats))
        .route("/matches", get(lost_found::item_matches))
        .route("/history", get(lost_found::reporter_history))
        .route(
            "/{id}",
            get(lost_found::get_item)
                .put(lost_found::update_item)
                .delete(lost_found::delete_item),
        )
        .route("/{id}/claim", patch(lost_found::claim_item))
        .route("/{id}/resolve", patch(lost_found::resolve_item));

    let timing_routes = Router::new()
        .route("/", get(timing::list_timings))
        .route("/entry", post(timing::log_entry))
        .route("/exit", post(timing::log_exit))
        .route("/alerts", get(timing::overstay_alerts))
        .route("/alerts/{id}/sent", patch(timing::mark_alert_sent))
        .route("/history/{devotee_id}", get(timing::devotee_history));

    let settings_routes = Router::new()
        .route("/", get(settings::list_settings).post(settings::create_setting))
        .route("/bulk", put(settings::bulk_upsert_settings))
        .route(
            "/{key}",
            get(settings::get_setting)
                .put(settings::update_setting)
                .delete(settings::delete_setting),
        );

    let route_status_routes = Router::new()
        .route("/", get(routes::list_routes).post(routes::upsert_route))
        .route(
            "/{id}",
            get(routes::get_route)
                .put(routes::update_route)
                .delete(routes::delete_route),
        );

    let mobile_routes = Router::new()
        .route("/locations", get(mobile::public_locations))
        .route("/crowd-levels", get(mobile::crowd_levels))
        .route("/alerts", get(mobile::public_alerts))
        .route("/amenities", get(mobile::nearby_amenities))
        .route("/events", get(mobile::event_schedule))
        .route("/updates", get(mobile::realtime_updates))
        .route("/lost-found", post(mobile::submit_lost_found))
        .route("/emergency", post(mobile::emergency_sos))
        .route("/feedback", post(mobile::submit_feedback));

    Router::new()
        .route("/api/test", get(server_test))
        .nest("/api/locations", location_routes)
        .nest("/api/alerts", alert_routes)
        .nest("/api/crowd", crowd_routes)
        .nest("/api/lost-found", lost_found_routes)
        .nest("/api/timing", timing_routes)
        .nest("/api/settings", settings_routes)
        .nest("/api/routes", route_status_routes)
        .nest("/api/mobile", mobile_routes)
        .fallback(route_not_found)
        .with_state(state)
}

async fn server_test() -> Json<Value> {
    Json(json!({ "success": true, "message": "Server is running successfully!" }))
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {uri} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use mela_state::input::{AlertInput, CrowdDataInput, LocationInput, SettingInput, TimingInput};
    use mela_state::{AlertStatus, CrowdLevel, DevoteeTiming, Severity};

    use crate::extract::ApiJson;

    fn test_state() -> ApiState {
        let store = StateStore::open_in_memory().unwrap();
        let zones = ZoneBoard::with_demo_zones(Duration::from_secs(30));
        ApiState::new(store, zones, 60, mela_core::MelaConfig::default().events)
    }

    fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    fn ghat_input(capacity: i64) -> LocationInput {
        from_json(json!({
            "name": "Ram Ghat",
            "type": "temple",
            "coordinates": {"latitude": 23.18, "longitude": 75.77},
            "capacity": capacity
        }))
    }

    #[tokio::test]
    async fn create_and_get_location() {
        let state = test_state();
        let created = locations::create_location(State(state.clone()), ApiJson(ghat_input(1000)))
            .await
            .unwrap();
        let created = created.into_response();
        assert_eq!(created.status(), StatusCode::CREATED);

        let all = state.store.list::<mela_state::Location>().unwrap();
        assert_eq!(all.len(), 1);
        let resp = locations::get_location(State(state), Path(all[0].id.clone())).await;
        assert!(resp.is_ok());
    }

    #[tokio::test]
    async fn missing_location_is_not_found() {
        let state = test_state();
        let err = locations::get_location(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_location_is_validation_error() {
        let state = test_state();
        let input: LocationInput = from_json(json!({"name": "  "}));
        let err = locations::create_location(State(state), ApiJson(input))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn crowd_level_derived_from_capacity() {
        let state = test_state();
        let location = ghat_input(100).create(1).unwrap();
        state.store.put(&location).unwrap();

        let input: CrowdDataInput =
            from_json(json!({"locationId": location.id, "currentOccupancy": 85}));
        crowd::create_crowd_data(State(state.clone()), ApiJson(input))
            .await
            .unwrap();
        let readings = state.store.crowd_history(&location.id).unwrap();
        assert_eq!(readings[0].crowd_level, CrowdLevel::High);
    }

    #[tokio::test]
    async fn crowd_reading_requires_known_location() {
        let state = test_state();
        let input: CrowdDataInput =
            from_json(json!({"locationId": "ghost", "currentOccupancy": 5, "crowdLevel": "low"}));
        let err = crowd::create_crowd_data(State(state), ApiJson(input))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn crowd_bulk_collects_failures() {
        let state = test_state();
        let location = ghat_input(100).create(1).unwrap();
        state.store.put(&location).unwrap();

        let request: crowd::BulkCrowdRequest = from_json(json!({"updates": [
            {"locationId": location.id, "currentOccupancy": 20},
            {"locationId": "ghost", "currentOccupancy": 5},
            {"locationId": location.id, "currentOccupancy": "many"}
        ]}));
        let resp = crowd::bulk_create_crowd_data(State(state.clone()), ApiJson(request))
            .await
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.store.crowd_history(&location.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bulk_readings_in_one_second_keep_post_order() {
        let state = test_state();
        let location = ghat_input(100).create(1).unwrap();
        state.store.put(&location).unwrap();

        let request: crowd::BulkCrowdRequest = from_json(json!({"updates": [
            {"locationId": location.id, "currentOccupancy": 20},
            {"locationId": location.id, "currentOccupancy": 95}
        ]}));
        crowd::bulk_create_crowd_data(State(state.clone()), ApiJson(request))
            .await
            .unwrap();

        let body = serde_json::to_value(crowd::realtime_crowd(State(state.clone())).await.unwrap()).unwrap();
        assert_eq!(body["data"][0]["currentOccupancy"], 95);
        let history = state.store.crowd_history(&location.id).unwrap();
        assert_eq!(history[0].current_occupancy, 95);
        assert_eq!(history[1].current_occupancy, 20);
    }

    #[tokio::test]
    async fn crowd_update_rederives_level() {
        let state = test_state();
        let location = ghat_input(100).create(1).unwrap();
        state.store.put(&location).unwrap();

        let input: CrowdDataInput =
            from_json(json!({"locationId": location.id, "currentOccupancy": 10}));
        crowd::create_crowd_data(State(state.clone()), ApiJson(input))
            .await
            .unwrap();
        let id = state.store.crowd_history(&location.id).unwrap()[0].id.clone();

        let patch: CrowdDataInput = from_json(json!({"currentOccupancy": 85}));
        crowd::update_crowd_data(State(state.clone()), Path(id.clone()), ApiJson(patch))
            .await
            .unwrap();
        let stored = state.store.get::<mela_state::CrowdData>(&id).unwrap().unwrap();
        assert_eq!(stored.current_occupancy, 85);
        assert_eq!(stored.crowd_level, CrowdLevel::High);
    }

    #[tokio::test]
    async fn nearby_zero_distance_uses_default() {
        let state = test_state();
        // Ram Ghat sits at 23.18,75.77; the query point is about 550 m north.
        state.store.put(&ghat_input(100).create(1).unwrap()).unwrap();

        let query = locations::LocationQuery {
            nearby: Some("23.185,75.77,0".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(
            locations::list_locations(State(state), Query(query)).await.unwrap(),
        )
        .unwrap();
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn alert_escalation_sets_critical() {
        let state = test_state();
        let input: AlertInput = from_json(json!({
            "type": "Crowd",
            "severity": "Medium",
            "message": "Queue building up",
            "location": "Gate 3",
            "coordinates": {"lat": 25.43, "lng": 81.88}
        }));
        let alert = input.create(10).unwrap();
        state.store.put(&alert).unwrap();

        alerts::escalate_alert(State(state.clone()), Path(alert.id.clone()))
            .await
            .unwrap();
        let stored = state.store.get::<mela_state::Alert>(&alert.id).unwrap().unwrap();
        assert_eq!(stored.severity, Severity::Critical);
        assert_eq!(stored.status, AlertStatus::Active);
    }

    #[tokio::test]
    async fn exit_without_entry_is_not_found() {
        let state = test_state();
        let input: TimingInput = from_json(json!({"devoteeId": "D-1", "zone": "Sangam"}));
        let err = timing::log_exit(State(state), ApiJson(input)).await.unwrap_err();
        assert_eq!(err.to_string(), "No active entry found for devotee in this zone");
    }

    #[tokio::test]
    async fn long_stay_is_flagged_on_exit() {
        let state = test_state();
        let mut entered = DevoteeTiming::enter("D-7", "Sangam", 0);
        entered.entry_time = mela_core::epoch_secs() - 90 * 60;
        state.store.put(&entered).unwrap();

        let input: TimingInput = from_json(json!({"devoteeId": "D-7", "zone": "Sangam"}));
        timing::log_exit(State(state.clone()), ApiJson(input)).await.unwrap();

        let pending = state
            .store
            .list_where(|t: &DevoteeTiming| t.overstay && !t.alert_sent)
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].duration_minutes, Some(90));

        timing::mark_alert_sent(State(state.clone()), Path(entered.id.clone()))
            .await
            .unwrap();
        let stored = state.store.get::<DevoteeTiming>(&entered.id).unwrap().unwrap();
        assert!(stored.alert_sent);
    }

    #[tokio::test]
    async fn duplicate_setting_key_conflicts() {
        let state = test_state();
        let body = json!({"key": "maxCrowd", "value": 5000});
        settings::create_setting(State(state.clone()), ApiJson(from_json::<SettingInput>(body.clone())))
            .await
            .unwrap();
        let err = settings::create_setting(State(state), ApiJson(from_json::<SettingInput>(body)))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_zone_is_not_found() {
        let state = test_state();
        let err = zones::get_zone(State(state), Path("zone-x".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Zone not found");
    }

    #[tokio::test]
    async fn amenities_require_coordinates() {
        let state = test_state();
        let err = mobile::nearby_amenities(State(state), Query(mobile::AmenityQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn amenities_reject_infinite_radius() {
        let state = test_state();
        state.store.put(&ghat_input(100).create(1).unwrap()).unwrap();
        let query = mobile::AmenityQuery {
            latitude: Some("23.18".to_string()),
            longitude: Some("75.77".to_string()),
            radius: Some("inf".to_string()),
        };
        let err = mobile::nearby_amenities(State(state), Query(query))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sos_uses_known_location_coordinates() {
        let state = test_state();
        let location = ghat_input(100).create(1).unwrap();
        state.store.put(&location).unwrap();

        let sos: mobile::SosRequest = from_json(json!({"location": "Ram Ghat", "message": "Child missing"}));
        mobile::emergency_sos(State(state.clone()), ApiJson(sos)).await.unwrap();

        let raised = state.store.list::<mela_state::Alert>().unwrap();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, Severity::Critical);
        assert_eq!(raised[0].kind, "SOS");
        assert_eq!(raised[0].coordinates, location.coordinates);
    }
}
