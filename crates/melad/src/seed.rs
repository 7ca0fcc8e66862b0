//! Sample site data for demos and local development.
//!
//! Seeding is idempotent: locations are matched by name and routes by
//! name, origin and destination, so running it twice adds nothing.

use anyhow::Context;
use serde_json::{Value, json};
use tracing::{debug, info};

use mela_insight::crowd_level;
use mela_state::input::{CrowdDataInput, LocationInput, RouteInput};
use mela_state::{CrowdLevel, StateStore};

/// What one seeding run added.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub locations: usize,
    pub routes: usize,
    pub readings: usize,
}

fn sample_locations() -> Value {
    json!([
        {
            "name": "Main Temple",
            "type": "temple",
            "coordinates": {"latitude": 28.6139, "longitude": 77.209},
            "description": "Main worship area with beautiful architecture",
            "capacity": 500,
            "currentOccupancy": 250,
            "amenities": ["Prasadam", "Water", "Seating", "Audio System"],
            "operatingHours": {"open": "05:00", "close": "22:00"},
            "isEmergencyPoint": true
        },
        {
            "name": "Parking Area A",
            "type": "parking",
            "coordinates": {"latitude": 28.614, "longitude": 77.2095},
            "description": "Main parking facility for devotees",
            "capacity": 100,
            "currentOccupancy": 75,
            "amenities": ["Security", "CCTV", "Lighting"],
            "operatingHours": {"open": "04:00", "close": "23:00"}
        },
        {
            "name": "Food Court",
            "type": "food",
            "coordinates": {"latitude": 28.6135, "longitude": 77.2085},
            "description": "Dining and refreshment area",
            "capacity": 200,
            "currentOccupancy": 50,
            "amenities": ["Vegetarian Food", "Water", "Seating", "Washroom"],
            "operatingHours": {"open": "06:00", "close": "21:00"}
        },
        {
            "name": "Security Office",
            "type": "security",
            "coordinates": {"latitude": 28.6142, "longitude": 77.2088},
            "description": "Main security and control room",
            "capacity": 20,
            "currentOccupancy": 5,
            "amenities": ["CCTV Monitoring", "Communication", "First Aid"],
            "operatingHours": {"open": "00:00", "close": "23:59"},
            "isEmergencyPoint": true
        },
        {
            "name": "Rest Area",
            "type": "facility",
            "coordinates": {"latitude": 28.6138, "longitude": 77.2092},
            "description": "Comfortable seating area for elderly and families",
            "capacity": 150,
            "currentOccupancy": 30,
            "amenities": ["Seating", "Shade", "Water", "Clean Restrooms"],
            "operatingHours": {"open": "05:00", "close": "22:00"}
        }
    ])
}

fn sample_routes() -> Value {
    json!([
        {
            "name": "Main Temple to Parking A",
            "from": "Main Temple",
            "to": "Parking Area A",
            "status": "open",
            "liveMessage": "Clear route, normal traffic flow",
            "coordinates": [{"lat": 28.6139, "lng": 77.209}, {"lat": 28.614, "lng": 77.2095}]
        },
        {
            "name": "Parking A to Food Court",
            "from": "Parking Area A",
            "to": "Food Court",
            "status": "congested",
            "liveMessage": "Heavy traffic, expect 5-10 min delay",
            "coordinates": [{"lat": 28.614, "lng": 77.2095}, {"lat": 28.6135, "lng": 77.2085}]
        },
        {
            "name": "Food Court to Security Office",
            "from": "Food Court",
            "to": "Security Office",
            "status": "open",
            "liveMessage": "Normal flow",
            "coordinates": [{"lat": 28.6135, "lng": 77.2085}, {"lat": 28.6145, "lng": 77.208}]
        }
    ])
}

fn entries(sample: Value) -> Vec<Value> {
    match sample {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Load the sample locations, routes and one crowd reading per new location.
pub fn seed(store: &StateStore, now: u64) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    for raw in entries(sample_locations()) {
        let input: LocationInput = serde_json::from_value(raw).context("invalid sample location")?;
        let location = input.create(now)?;
        if store.find_location_by_name(&location.name)?.is_some() {
            debug!(name = %location.name, "location already present");
            continue;
        }
        store.put(&location)?;
        report.locations += 1;

        let level = crowd_level(location.current_occupancy, location.capacity).unwrap_or(CrowdLevel::Low);
        let mut reading = CrowdDataInput {
            location_id: Some(location.id.clone()),
            current_occupancy: Some(i64::from(location.current_occupancy)),
            crowd_level: Some(level),
            ..CrowdDataInput::default()
        }
        .create(now, true, None)?;
        store.record_crowd(&mut reading)?;
        report.readings += 1;
    }

    for raw in entries(sample_routes()) {
        let input: RouteInput = serde_json::from_value(raw).context("invalid sample route")?;
        if let Some((name, from, to)) = input.identity() {
            if store.find_route(&name, &from, &to)?.is_some() {
                debug!(%name, "route already present");
                continue;
            }
        }
        store.put(&input.create(now)?)?;
        report.routes += 1;
    }

    info!(
        locations = report.locations,
        routes = report.routes,
        readings = report.readings,
        "sample data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_state::{CrowdData, Location, RouteState, RouteStatus};

    #[test]
    fn seeds_sample_site() {
        let store = StateStore::open_in_memory().unwrap();
        let report = seed(&store, 100).unwrap();
        assert_eq!(
            report,
            SeedReport {
                locations: 5,
                routes: 3,
                readings: 5
            }
        );

        let parking = store.find_location_by_name("Parking Area A").unwrap().unwrap();
        let history = store.crowd_history(&parking.id).unwrap();
        assert_eq!(history[0].crowd_level, CrowdLevel::Medium);

        let congested = store
            .list_where(|r: &RouteStatus| r.status == RouteState::Congested)
            .unwrap();
        assert_eq!(congested.len(), 1);
    }

    #[test]
    fn seeding_twice_adds_nothing() {
        let store = StateStore::open_in_memory().unwrap();
        seed(&store, 100).unwrap();
        let second = seed(&store, 200).unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(store.list::<Location>().unwrap().len(), 5);
        assert_eq!(store.list::<CrowdData>().unwrap().len(), 5);
    }
}
