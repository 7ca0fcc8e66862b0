//! Create and update payloads for stored documents.
//!
//! Every field is optional at the serde level so that missing required
//! fields surface as field messages in a [`ValidationError`] rather than as
//! an opaque decode failure. `create` builds a new document; `apply` merges
//! a partial update into an existing one.

use serde::Deserialize;

use crate::error::ValidationError;
use crate::types::*;

#[derive(Default)]
struct Checks {
    errors: Vec<String>,
}

impl Checks {
    fn fail(&mut self, message: String) {
        self.errors.push(message);
    }

    fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.fail(format!("{field} is required"));
        }
        value
    }

    /// Trimmed text; a present but blank value is an error.
    fn text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let text = value?.trim().to_string();
        if text.is_empty() {
            self.fail(format!("{field} cannot be empty"));
            return None;
        }
        Some(text)
    }

    fn required_text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match value {
            Some(v) => self.text(field, Some(v)),
            None => self.required::<String>(field, None),
        }
    }

    fn count(&mut self, field: &str, value: Option<i64>) -> Option<u32> {
        let raw = value?;
        match u32::try_from(raw) {
            Ok(n) => Some(n),
            Err(_) => {
                self.fail(format!("{field} must be a non-negative whole number"));
                None
            }
        }
    }

    fn point(&mut self, field: &str, value: Option<PointInput>) -> Option<GeoPoint> {
        let input = value?;
        let (Some(lat), Some(lng)) = (input.lat, input.lng) else {
            self.fail(format!("{field} must include lat and lng"));
            return None;
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            self.fail(format!("{field} is out of range"));
            return None;
        }
        Some(GeoPoint::new(lat, lng))
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }

    fn into_error(self) -> ValidationError {
        ValidationError {
            errors: self.errors,
        }
    }
}

/// Incoming coordinates; both halves are checked during validation.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PointInput {
    #[serde(alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(alias = "longitude")]
    pub lng: Option<f64>,
}

impl From<GeoPoint> for PointInput {
    fn from(p: GeoPoint) -> Self {
        Self {
            lat: Some(p.lat),
            lng: Some(p.lng),
        }
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ── Location ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<LocationKind>,
    pub coordinates: Option<PointInput>,
    pub description: Option<String>,
    pub capacity: Option<i64>,
    pub current_occupancy: Option<i64>,
    pub status: Option<LocationStatus>,
    pub amenities: Option<Vec<String>>,
    pub operating_hours: Option<OperatingHours>,
    pub is_emergency_point: Option<bool>,
}

impl LocationInput {
    pub fn create(self, now: u64) -> Result<Location, ValidationError> {
        let mut checks = Checks::default();
        let name = checks.required_text("name", self.name);
        let kind = checks.required("type", self.kind);
        let coordinates = checks.required("coordinates", self.coordinates);
        let coordinates = checks.point("coordinates", coordinates);
        let capacity = checks.count("capacity", self.capacity);
        let occupancy = checks.count("currentOccupancy", self.current_occupancy);

        let (Some(name), Some(kind), Some(coordinates)) = (name, kind, coordinates) else {
            return Err(checks.into_error());
        };
        checks.finish()?;

        Ok(Location {
            id: new_id(),
            name,
            kind,
            coordinates,
            description: self.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            capacity: capacity.unwrap_or(0),
            current_occupancy: occupancy.unwrap_or(0),
            status: self.status.unwrap_or_default(),
            amenities: self.amenities.map(clean_list).unwrap_or_default(),
            operating_hours: self.operating_hours.unwrap_or_default(),
            is_emergency_point: self.is_emergency_point.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(self, location: &mut Location, now: u64) -> Result<(), ValidationError> {
        let mut checks = Checks::default();
        let name = checks.text("name", self.name);
        let coordinates = checks.point("coordinates", self.coordinates);
        let capacity = checks.count("capacity", self.capacity);
        let occupancy = checks.count("currentOccupancy", self.current_occupancy);
        checks.finish()?;

        if let Some(name) = name {
            location.name = name;
        }
        if let Some(kind) = self.kind {
            location.kind = kind;
        }
        if let Some(coordinates) = coordinates {
            location.coordinates = coordinates;
        }
        if let Some(description) = self.description {
            location.description = description.trim().to_string();
        }
        if let Some(capacity) = capacity {
            location.capacity = capacity;
        }
        if let Some(occupancy) = occupancy {
            location.current_occupancy = occupancy;
        }
        if let Some(status) = self.status {
            location.status = status;
        }
        if let Some(amenities) = self.amenities {
            location.amenities = clean_list(amenities);
        }
        if let Some(hours) = self.operating_hours {
            location.operating_hours = hours;
        }
        if let Some(flag) = self.is_emergency_point {
            location.is_emergency_point = flag;
        }
        location.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyInput {
    pub current_occupancy: Option<i64>,
}

impl OccupancyInput {
    pub fn value(self) -> Result<u32, ValidationError> {
        let mut checks = Checks::default();
        let raw = checks.required("currentOccupancy", self.current_occupancy);
        let value = checks.count("currentOccupancy", raw);
        match value {
            Some(v) => Ok(v),
            None => Err(checks.into_error()),
        }
    }
}

// ── Alert ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInput {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub severity: Option<Severity>,
    pub message: Option<String>,
    pub location: Option<String>,
    pub coordinates: Option<PointInput>,
    pub timestamp: Option<u64>,
    pub status: Option<AlertStatus>,
}

impl AlertInput {
    pub fn create(self, now: u64) -> Result<Alert, ValidationError> {
        let mut checks = Checks::default();
        let kind = checks.required_text("type", self.kind);
        let severity = checks.required("severity", self.severity);
        let message = checks.required_text("message", self.message);
        let location = checks.required_text("location", self.location);
        let coordinates = checks.required("coordinates", self.coordinates);
        let coordinates = checks.point("coordinates", coordinates);

        let (Some(kind), Some(severity), Some(message), Some(location), Some(coordinates)) =
            (kind, severity, message, location, coordinates)
        else {
            return Err(checks.into_error());
        };
        checks.finish()?;

        Ok(Alert {
            id: new_id(),
            kind,
            severity,
            message,
            location,
            coordinates,
            timestamp: self.timestamp.unwrap_or(now),
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(self, alert: &mut Alert, now: u64) -> Result<(), ValidationError> {
        let mut checks = Checks::default();
        let kind = checks.text("type", self.kind);
        let message = checks.text("message", self.message);
        let location = checks.text("location", self.location);
        let coordinates = checks.point("coordinates", self.coordinates);
        checks.finish()?;

        if let Some(kind) = kind {
            alert.kind = kind;
        }
        if let Some(severity) = self.severity {
            alert.severity = severity;
        }
        if let Some(message) = message {
            alert.message = message;
        }
        if let Some(location) = location {
            alert.location = location;
        }
        if let Some(coordinates) = coordinates {
            alert.coordinates = coordinates;
        }
        if let Some(timestamp) = self.timestamp {
            alert.timestamp = timestamp;
        }
        if let Some(status) = self.status {
            alert.status = status;
        }
        alert.updated_at = now;
        Ok(())
    }
}

// ── Crowd data ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdDataInput {
    pub location_id: Option<String>,
    pub current_occupancy: Option<i64>,
    pub crowd_level: Option<CrowdLevel>,
    pub heatmap: Option<Vec<Vec<f64>>>,
    pub timestamp: Option<u64>,
}

impl CrowdDataInput {
    /// Occupancy as submitted, if it is a valid count.
    pub fn occupancy(&self) -> Option<u32> {
        self.current_occupancy.and_then(|n| u32::try_from(n).ok())
    }

    /// Build a reading. `location_known` says whether `locationId` resolved
    /// to a stored location; `derived_level` is used when the payload has no
    /// `crowdLevel` of its own.
    pub fn create(
        self,
        now: u64,
        location_known: bool,
        derived_level: Option<CrowdLevel>,
    ) -> Result<CrowdData, ValidationError> {
        let mut checks = Checks::default();
        let location_id = checks.required_text("locationId", self.location_id);
        if location_id.is_some() && !location_known {
            checks.fail("locationId does not reference an existing location".to_string());
        }
        let occupancy = checks.required("currentOccupancy", self.current_occupancy);
        let occupancy = checks.count("currentOccupancy", occupancy);
        let crowd_level = self.crowd_level.or(derived_level);
        if crowd_level.is_none() && location_known {
            checks.fail("crowdLevel is required when the location has no capacity".to_string());
        }

        let (Some(location_id), Some(current_occupancy), Some(crowd_level)) =
            (location_id, occupancy, crowd_level)
        else {
            return Err(checks.into_error());
        };
        checks.finish()?;

        let timestamp = self.timestamp.unwrap_or(now);
        Ok(CrowdData {
            id: new_id(),
            location_id,
            current_occupancy,
            crowd_level,
            heatmap: self.heatmap,
            timestamp,
            seq: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update. `derived_level` is the level implied by the
    /// new occupancy; it replaces the stored level when the payload changes
    /// occupancy without naming a `crowdLevel`.
    pub fn apply(
        self,
        reading: &mut CrowdData,
        now: u64,
        derived_level: Option<CrowdLevel>,
    ) -> Result<(), ValidationError> {
        let mut checks = Checks::default();
        let occupancy = checks.count("currentOccupancy", self.current_occupancy);
        if self.location_id.is_some() {
            checks.fail("locationId cannot be changed".to_string());
        }
        checks.finish()?;

        if let Some(occupancy) = occupancy {
            reading.current_occupancy = occupancy;
        }
        let level = match occupancy {
            Some(_) => self.crowd_level.or(derived_level),
            None => self.crowd_level,
        };
        if let Some(level) = level {
            reading.crowd_level = level;
        }
        if let Some(heatmap) = self.heatmap {
            reading.heatmap = Some(heatmap);
        }
        if let Some(timestamp) = self.timestamp {
            reading.timestamp = timestamp;
        }
        reading.updated_at = now;
        Ok(())
    }
}

// ── Lost & found ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LostFoundInput {
    #[serde(rename = "type")]
    pub kind: Option<ItemKind>,
    pub item: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub coordinates: Option<PointInput>,
    pub reporter: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<ItemStatus>,
    pub reported_at: Option<u64>,
}

impl LostFoundInput {
    pub fn create(self, now: u64) -> Result<LostFound, ValidationError> {
        let mut checks = Checks::default();
        let kind = checks.required("type", self.kind);
        let item = checks.required_text("item", self.item);
        let location = checks.required_text("location", self.location);
        let coordinates = checks.required("coordinates", self.coordinates);
        let coordinates = checks.point("coordinates", coordinates);

        let (Some(kind), Some(item), Some(location), Some(coordinates)) =
            (kind, item, location, coordinates)
        else {
            return Err(checks.into_error());
        };
        checks.finish()?;

        Ok(LostFound {
            id: new_id(),
            kind,
            item,
            description: non_blank(self.description),
            category: non_blank(self.category),
            status: self.status.unwrap_or_default(),
            reported_at: self.reported_at.unwrap_or(now),
            location,
            coordinates,
            reporter: non_blank(self.reporter),
            image_url: non_blank(self.image_url),
            claimed_by: None,
            claimed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(self, entry: &mut LostFound, now: u64) -> Result<(), ValidationError> {
        let mut checks = Checks::default();
        let item = checks.text("item", self.item);
        let location = checks.text("location", self.location);
        let coordinates = checks.point("coordinates", self.coordinates);
        checks.finish()?;

        if let Some(kind) = self.kind {
            entry.kind = kind;
        }
        if let Some(item) = item {
            entry.item = item;
        }
        if self.description.is_some() {
            entry.description = non_blank(self.description);
        }
        if self.category.is_some() {
            entry.category = non_blank(self.category);
        }
        if let Some(location) = location {
            entry.location = location;
        }
        if let Some(coordinates) = coordinates {
            entry.coordinates = coordinates;
        }
        if self.reporter.is_some() {
            entry.reporter = non_blank(self.reporter);
        }
        if self.image_url.is_some() {
            entry.image_url = non_blank(self.image_url);
        }
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(reported_at) = self.reported_at {
            entry.reported_at = reported_at;
        }
        entry.updated_at = now;
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimInput {
    pub claimed_by: Option<String>,
}

impl LostFound {
    pub fn claim(&mut self, claimed_by: Option<String>, now: u64) {
        self.status = ItemStatus::Claimed;
        self.claimed_by = non_blank(claimed_by);
        self.claimed_at = Some(now);
        self.updated_at = now;
    }

    pub fn resolve(&mut self, now: u64) {
        self.status = ItemStatus::Resolved;
        self.updated_at = now;
    }
}

// ── Devotee timing ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingInput {
    pub devotee_id: Option<String>,
    pub zone: Option<String>,
}

impl TimingInput {
    /// Returns `(devotee_id, zone)`.
    pub fn validate(self) -> Result<(String, String), ValidationError> {
        let devotee = non_blank(self.devotee_id);
        let zone = non_blank(self.zone);
        match (devotee, zone) {
            (Some(devotee), Some(zone)) => Ok((devotee, zone)),
            _ => Err(ValidationError::single("devoteeId and zone required")),
        }
    }
}

// ── Settings ──────────────────────────────────────────────────────

pub const DEFAULT_SETTING_CATEGORY: &str = "general";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingInput {
    pub key: Option<String>,
    pub value: Option<SettingValue>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl SettingInput {
    pub fn create(self, now: u64) -> Result<Setting, ValidationError> {
        let mut checks = Checks::default();
        let key = checks.required_text("key", self.key);
        let value = checks.required("value", self.value);
        let category = checks.text("category", self.category);

        let (Some(key), Some(value)) = (key, value) else {
            return Err(checks.into_error());
        };
        checks.finish()?;

        Ok(Setting {
            key,
            value,
            category: category.unwrap_or_else(|| DEFAULT_SETTING_CATEGORY.to_string()),
            description: non_blank(self.description),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge into an existing setting. The key itself never changes.
    pub fn apply(self, setting: &mut Setting, now: u64) -> Result<(), ValidationError> {
        let mut checks = Checks::default();
        let category = checks.text("category", self.category);
        if self.key.as_deref().is_some_and(|k| k.trim() != setting.key) {
            checks.fail("key cannot be changed".to_string());
        }
        checks.finish()?;

        if let Some(value) = self.value {
            setting.value = value;
        }
        if let Some(category) = category {
            setting.category = category;
        }
        if self.description.is_some() {
            setting.description = non_blank(self.description);
        }
        setting.updated_at = now;
        Ok(())
    }
}

// ── Routes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInput {
    pub name: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub status: Option<RouteState>,
    pub live_message: Option<String>,
    pub coordinates: Option<Vec<PointInput>>,
}

impl RouteInput {
    fn points(checks: &mut Checks, points: Option<Vec<PointInput>>) -> Option<Vec<GeoPoint>> {
        let points = points?;
        let before = checks.errors.len();
        let parsed: Vec<GeoPoint> = points
            .into_iter()
            .enumerate()
            .filter_map(|(i, p)| checks.point(&format!("coordinates[{i}]"), Some(p)))
            .collect();
        (checks.errors.len() == before).then_some(parsed)
    }

    /// Returns `(name, from, to)` when all three are present.
    pub fn identity(&self) -> Option<(String, String, String)> {
        Some((
            non_blank(self.name.clone())?,
            non_blank(self.from.clone())?,
            non_blank(self.to.clone())?,
        ))
    }

    pub fn create(self, now: u64) -> Result<RouteStatus, ValidationError> {
        let mut checks = Checks::default();
        let name = checks.required_text("name", self.name);
        let from = checks.required_text("from", self.from);
        let to = checks.required_text("to", self.to);
        let coordinates = Self::points(&mut checks, self.coordinates);

        let (Some(name), Some(from), Some(to)) = (name, from, to) else {
            return Err(checks.into_error());
        };
        checks.finish()?;

        Ok(RouteStatus {
            id: new_id(),
            name,
            from,
            to,
            status: self.status.unwrap_or_default(),
            live_message: non_blank(self.live_message),
            coordinates: coordinates.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(self, route: &mut RouteStatus, now: u64) -> Result<(), ValidationError> {
        let mut checks = Checks::default();
        let name = checks.text("name", self.name);
        let from = checks.text("from", self.from);
        let to = checks.text("to", self.to);
        let coordinates = Self::points(&mut checks, self.coordinates);
        checks.finish()?;

        if let Some(name) = name {
            route.name = name;
        }
        if let Some(from) = from {
            route.from = from;
        }
        if let Some(to) = to {
            route.to = to;
        }
        if let Some(status) = self.status {
            route.status = status;
        }
        if self.live_message.is_some() {
            route.live_message = non_blank(self.live_message);
        }
        if let Some(coordinates) = coordinates {
            route.coordinates = coordinates;
        }
        route.updated_at = now;
        Ok(())
    }
}

// ── Feedback ──────────────────────────────────────────────────────

/// Category given to feedback that names none.
pub const DEFAULT_FEEDBACK_CATEGORY: &str = "general";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInput {
    pub rating: Option<i64>,
    pub comments: Option<String>,
    pub category: Option<String>,
    pub contact_info: Option<String>,
}

impl FeedbackInput {
    pub fn create(self, now: u64) -> Result<Feedback, ValidationError> {
        let mut checks = Checks::default();
        let rating = checks.required("rating", self.rating);
        let rating = match rating {
            Some(r @ 1..=5) => Some(r as u8),
            Some(_) => {
                checks.fail("rating must be between 1 and 5".to_string());
                None
            }
            None => None,
        };

        let Some(rating) = rating else {
            return Err(checks.into_error());
        };

        Ok(Feedback {
            id: new_id(),
            rating,
            comments: self.comments.map(|c| c.trim().to_string()).unwrap_or_default(),
            category: non_blank(self.category).unwrap_or_else(|| DEFAULT_FEEDBACK_CATEGORY.to_string()),
            contact_info: non_blank(self.contact_info),
            submitted_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse<T: serde::de::DeserializeOwned>(v: serde_json::Value) -> T {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn location_requires_name_type_and_coordinates() {
        let err = LocationInput::default().create(1).unwrap_err();
        assert_eq!(
            err.errors,
            vec!["name is required", "type is required", "coordinates is required"]
        );
    }

    #[test]
    fn location_create_applies_defaults() {
        let input: LocationInput = parse(json!({
            "name": "  Sangam Ghat ",
            "type": "temple",
            "coordinates": {"latitude": 25.43, "longitude": 81.88},
            "amenities": [" water ", ""]
        }));
        let loc = input.create(42).unwrap();
        assert_eq!(loc.name, "Sangam Ghat");
        assert_eq!(loc.kind, LocationKind::Temple);
        assert_eq!(loc.coordinates, GeoPoint::new(25.43, 81.88));
        assert_eq!(loc.status, LocationStatus::Active);
        assert_eq!(loc.amenities, vec!["water"]);
        assert_eq!(loc.operating_hours.open, "06:00");
        assert_eq!(loc.created_at, 42);
        assert!(!loc.is_emergency_point);
    }

    #[test]
    fn location_rejects_negative_capacity() {
        let input: LocationInput = parse(json!({
            "name": "Gate",
            "type": "security",
            "coordinates": {"lat": 1.0, "lng": 2.0},
            "capacity": -5
        }));
        let err = input.create(1).unwrap_err();
        assert_eq!(err.errors, vec!["capacity must be a non-negative whole number"]);
    }

    fn reading_at(occupancy: i64, level: &str) -> CrowdData {
        parse::<CrowdDataInput>(json!({
            "locationId": "loc-a",
            "currentOccupancy": occupancy,
            "crowdLevel": level
        }))
        .create(1, true, None)
        .unwrap()
    }

    #[test]
    fn crowd_apply_rederives_level_for_new_occupancy() {
        let mut reading = reading_at(10, "low");
        let patch: CrowdDataInput = parse(json!({"currentOccupancy": 95}));
        patch.apply(&mut reading, 5, Some(CrowdLevel::High)).unwrap();
        assert_eq!(reading.current_occupancy, 95);
        assert_eq!(reading.crowd_level, CrowdLevel::High);

        let explicit: CrowdDataInput = parse(json!({"currentOccupancy": 96, "crowdLevel": "medium"}));
        explicit.apply(&mut reading, 6, Some(CrowdLevel::High)).unwrap();
        assert_eq!(reading.crowd_level, CrowdLevel::Medium);

        // No occupancy change keeps the stored level.
        let heatmap_only: CrowdDataInput = parse(json!({"heatmap": [[0.5]]}));
        heatmap_only.apply(&mut reading, 7, Some(CrowdLevel::Low)).unwrap();
        assert_eq!(reading.crowd_level, CrowdLevel::Medium);
    }

    #[test]
    fn feedback_category_defaults() {
        let feedback = parse::<FeedbackInput>(json!({"rating": 4})).create(1).unwrap();
        assert_eq!(feedback.category, DEFAULT_FEEDBACK_CATEGORY);
    }

    #[test]
    fn location_apply_is_partial() {
        let mut loc: Location = parse::<LocationInput>(json!({
            "name": "Gate",
            "type": "security",
            "coordinates": {"lat": 1.0, "lng": 2.0}
        }))
        .create(1)
        .unwrap();

        let patch: LocationInput = parse(json!({"capacity": 300, "status": "closed"}));
        patch.apply(&mut loc, 9).unwrap();
        assert_eq!(loc.capacity, 300);
        assert_eq!(loc.status, LocationStatus::Closed);
        assert_eq!(loc.name, "Gate");
        assert_eq!(loc.updated_at, 9);

        let blank: LocationInput = parse(json!({"name": "  "}));
        assert!(blank.apply(&mut loc, 10).is_err());
        assert_eq!(loc.name, "Gate");
    }

    #[test]
    fn alert_status_and_timestamp_defaults() {
        let input: AlertInput = parse(json!({
            "type": "medical",
            "severity": "High",
            "message": "Devotee fainted",
            "location": "Ghat 4",
            "coordinates": {"lat": 25.0, "lng": 81.0}
        }));
        let alert = input.create(77).unwrap();
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.timestamp, 77);
    }

    #[test]
    fn crowd_reading_needs_known_location() {
        let input: CrowdDataInput = parse(json!({"locationId": "nope", "currentOccupancy": 5}));
        let err = input.create(1, false, None).unwrap_err();
        assert_eq!(
            err.errors,
            vec!["locationId does not reference an existing location"]
        );
    }

    #[test]
    fn crowd_reading_uses_derived_level() {
        let input: CrowdDataInput = parse(json!({"locationId": "loc", "currentOccupancy": 5}));
        assert_eq!(input.occupancy(), Some(5));
        let reading = input.create(1, true, Some(CrowdLevel::Medium)).unwrap();
        assert_eq!(reading.crowd_level, CrowdLevel::Medium);

        let explicit: CrowdDataInput = parse(json!({
            "locationId": "loc", "currentOccupancy": 5, "crowdLevel": "critical"
        }));
        let reading = explicit.create(1, true, Some(CrowdLevel::Low)).unwrap();
        assert_eq!(reading.crowd_level, CrowdLevel::Critical);
    }

    #[test]
    fn timing_requires_both_fields() {
        let input: TimingInput = parse(json!({"devoteeId": "d1"}));
        let err = input.validate().unwrap_err();
        assert_eq!(err.errors, vec!["devoteeId and zone required"]);
    }

    #[test]
    fn setting_value_is_required_and_category_defaults() {
        let err = parse::<SettingInput>(json!({"key": "k", "value": null}))
            .create(1)
            .unwrap_err();
        assert_eq!(err.errors, vec!["value is required"]);

        let setting = parse::<SettingInput>(json!({"key": "k", "value": [1, "two"]}))
            .create(1)
            .unwrap();
        assert_eq!(setting.category, "general");
    }

    #[test]
    fn route_rejects_bad_waypoint() {
        let input: RouteInput = parse(json!({
            "name": "Route A", "from": "Gate 1", "to": "Sangam",
            "coordinates": [{"lat": 1.0, "lng": 2.0}, {"lat": 100.0, "lng": 2.0}]
        }));
        let err = input.create(1).unwrap_err();
        assert_eq!(err.errors, vec!["coordinates[1] is out of range"]);
    }

    #[test]
    fn feedback_rating_bounds() {
        let err = parse::<FeedbackInput>(json!({"rating": 6})).create(1).unwrap_err();
        assert_eq!(err.errors, vec!["rating must be between 1 and 5"]);
        let ok = parse::<FeedbackInput>(json!({"rating": 4, "comments": "Clean ghats"}))
            .create(1)
            .unwrap();
        assert_eq!(ok.rating, 4);
    }

    #[test]
    fn claim_sets_claimant() {
        let mut item = parse::<LostFoundInput>(json!({
            "type": "found", "item": "Phone", "location": "Ghat 2",
            "coordinates": {"lat": 1.0, "lng": 1.0}
        }))
        .create(1)
        .unwrap();
        item.claim(Some("Ravi".to_string()), 5);
        assert_eq!(item.status, ItemStatus::Claimed);
        assert_eq!(item.claimed_by.as_deref(), Some("Ravi"));
        assert_eq!(item.claimed_at, Some(5));
    }
}
