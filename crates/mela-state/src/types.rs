//! Domain types for the Mela state store.
//!
//! These are the persisted documents behind every REST resource. All types
//! serialize to camelCase JSON, which is both the wire format and the
//! on-disk value format in redb tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a stored document.
pub type DocId = String;

/// Generate a fresh random document id.
pub fn new_id() -> DocId {
    uuid::Uuid::new_v4().to_string()
}

/// Declare a closed set of string values with a fixed wire spelling.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// A latitude/longitude pair. Accepts `latitude`/`longitude` on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

// ── Location ──────────────────────────────────────────────────────

string_enum! {
    /// What kind of place a location is.
    LocationKind {
        Temple => "temple",
        Facility => "facility",
        Emergency => "emergency",
        Information => "information",
        Parking => "parking",
        Food => "food",
        Restroom => "restroom",
        Security => "security",
        Other => "other",
    }
}

string_enum! {
    LocationStatus {
        Active => "active",
        Inactive => "inactive",
        Maintenance => "maintenance",
        Closed => "closed",
    }
}

impl Default for LocationStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperatingHours {
    pub open: String,
    pub close: String,
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self {
            open: "06:00".to_string(),
            close: "22:00".to_string(),
        }
    }
}

/// A physical area being monitored (ghat, temple, parking, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: DocId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub coordinates: GeoPoint,
    pub description: String,
    pub capacity: u32,
    pub current_occupancy: u32,
    pub status: LocationStatus,
    pub amenities: Vec<String>,
    pub operating_hours: OperatingHours,
    pub is_emergency_point: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

// ── Alert ─────────────────────────────────────────────────────────

string_enum! {
    Severity {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
}

string_enum! {
    AlertStatus {
        Active => "Active",
        Acknowledged => "Acknowledged",
        Resolved => "Resolved",
        InProgress => "In Progress",
    }
}

impl Default for AlertStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: DocId,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    /// Free-form place name.
    pub location: String,
    pub coordinates: GeoPoint,
    pub timestamp: u64,
    pub status: AlertStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

// ── Crowd data ────────────────────────────────────────────────────

string_enum! {
    /// Coarse occupancy bucket.
    CrowdLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// One occupancy reading for a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrowdData {
    pub id: DocId,
    pub location_id: DocId,
    pub current_occupancy: u32,
    pub crowd_level: CrowdLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<Vec<Vec<f64>>>,
    pub timestamp: u64,
    /// Store-assigned insertion order; breaks ties between equal timestamps.
    #[serde(default)]
    pub seq: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl CrowdData {
    /// Sort key for "most recent": timestamp, then insertion order.
    pub fn recency(&self) -> (u64, u64) {
        (self.timestamp, self.seq)
    }
}

// ── Lost & found ──────────────────────────────────────────────────

string_enum! {
    ItemKind {
        Lost => "lost",
        Found => "found",
    }
}

string_enum! {
    ItemStatus {
        Open => "open",
        Claimed => "claimed",
        Resolved => "resolved",
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LostFound {
    pub id: DocId,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub status: ItemStatus,
    pub reported_at: u64,
    pub location: String,
    pub coordinates: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

// ── Devotee timing ────────────────────────────────────────────────

/// A single visit of a devotee to a zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DevoteeTiming {
    pub id: DocId,
    pub devotee_id: String,
    pub zone: String,
    pub entry_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u64>,
    pub overstay: bool,
    pub alert_sent: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl DevoteeTiming {
    pub fn enter(devotee_id: &str, zone: &str, now: u64) -> Self {
        Self {
            id: new_id(),
            devotee_id: devotee_id.to_string(),
            zone: zone.to_string(),
            entry_time: now,
            exit_time: None,
            duration_minutes: None,
            overstay: false,
            alert_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// Record the exit, compute the rounded stay length and flag overstays
    /// longer than `overstay_minutes`.
    pub fn close(&mut self, exit_time: u64, overstay_minutes: u64) {
        let elapsed = exit_time.saturating_sub(self.entry_time);
        let minutes = (elapsed + 30) / 60;
        self.exit_time = Some(exit_time);
        self.duration_minutes = Some(minutes);
        self.overstay = minutes > overstay_minutes;
        self.updated_at = exit_time;
    }
}

// ── Settings ──────────────────────────────────────────────────────

/// Schema-less setting value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<SettingValue>),
    Map(BTreeMap<String, SettingValue>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    /// Unique across all categories.
    pub key: String,
    pub value: SettingValue,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

// ── Route status ──────────────────────────────────────────────────

string_enum! {
    RouteState {
        Open => "open",
        Closed => "closed",
        Congested => "congested",
        Diverted => "diverted",
    }
}

impl Default for RouteState {
    fn default() -> Self {
        Self::Open
    }
}

/// Live status of a named pilgrim route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    pub id: DocId,
    pub name: String,
    pub from: String,
    pub to: String,
    pub status: RouteState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_message: Option<String>,
    pub coordinates: Vec<GeoPoint>,
    pub created_at: u64,
    pub updated_at: u64,
}

// ── Feedback ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: DocId,
    pub rating: u8,
    pub comments: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    pub submitted_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&AlertStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(LocationKind::Restroom.as_str(), "restroom");
        assert_eq!(CrowdLevel::ALL.len(), 4);
        let parsed: Severity = serde_json::from_str("\"Critical\"").unwrap();
        assert_eq!(parsed, Severity::Critical);
    }

    #[test]
    fn geo_point_accepts_long_field_names() {
        let p: GeoPoint = serde_json::from_str(r#"{"latitude":25.43,"longitude":81.84}"#).unwrap();
        assert_eq!(p, GeoPoint::new(25.43, 81.84));
        assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"lat":25.43,"lng":81.84}"#);
    }

    #[test]
    fn timing_close_flags_overstay() {
        let mut t = DevoteeTiming::enter("dev-1", "Snan Ghat", 1_000);
        assert!(t.is_open());

        t.close(1_000 + 61 * 60, 60);
        assert_eq!(t.duration_minutes, Some(61));
        assert!(t.overstay);
        assert!(!t.is_open());
    }

    #[test]
    fn timing_close_rounds_minutes() {
        let mut t = DevoteeTiming::enter("dev-1", "Temple", 0);
        t.close(59 * 60 + 29, 60);
        assert_eq!(t.duration_minutes, Some(59));
        assert!(!t.overstay);

        let mut t = DevoteeTiming::enter("dev-1", "Temple", 0);
        t.close(60 * 60 + 30, 60);
        assert_eq!(t.duration_minutes, Some(61));
        assert!(t.overstay);
    }

    #[test]
    fn setting_value_is_untagged() {
        let v: SettingValue = serde_json::from_str(r#"{"enabled":true,"limit":5}"#).unwrap();
        let SettingValue::Map(map) = v else {
            panic!("expected map");
        };
        assert_eq!(map.get("enabled"), Some(&SettingValue::Bool(true)));
        assert_eq!(map.get("limit"), Some(&SettingValue::Number(5.0)));

        assert!(serde_json::from_str::<SettingValue>("null").is_err());
    }
}
