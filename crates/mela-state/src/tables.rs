//! redb table definitions for the Mela state store.
//!
//! Every table maps a `&str` key to a JSON-serialized document. Documents are
//! keyed by their id, except settings which are keyed by their unique `key`.

use redb::TableDefinition;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::*;

/// Shape shared by every document table.
pub type DocTable = TableDefinition<'static, &'static str, &'static [u8]>;

pub const LOCATIONS: DocTable = TableDefinition::new("locations");
pub const ALERTS: DocTable = TableDefinition::new("alerts");
pub const CROWD_DATA: DocTable = TableDefinition::new("crowd_data");
pub const LOST_FOUND: DocTable = TableDefinition::new("lost_found");
pub const DEVOTEE_TIMINGS: DocTable = TableDefinition::new("devotee_timings");

/// Settings keyed by setting key, which makes keys unique.
pub const SETTINGS: DocTable = TableDefinition::new("settings");

pub const ROUTES: DocTable = TableDefinition::new("routes");
pub const FEEDBACK: DocTable = TableDefinition::new("feedback");

/// Store-wide counters, keyed by name.
pub(crate) const COUNTERS: TableDefinition<'static, &'static str, u64> =
    TableDefinition::new("counters");

pub(crate) const CROWD_SEQ: &str = "crowd_seq";

pub(crate) const ALL_TABLES: [DocTable; 8] = [
    LOCATIONS,
    ALERTS,
    CROWD_DATA,
    LOST_FOUND,
    DEVOTEE_TIMINGS,
    SETTINGS,
    ROUTES,
    FEEDBACK,
];

/// A value stored in one of the document tables.
pub trait Document: Serialize + DeserializeOwned {
    const TABLE: DocTable;

    /// Short name used in log lines.
    const KIND: &'static str;

    fn key(&self) -> &str;
}

macro_rules! document {
    ($ty:ty, $table:expr, $kind:literal, $field:ident) => {
        impl Document for $ty {
            const TABLE: DocTable = $table;
            const KIND: &'static str = $kind;

            fn key(&self) -> &str {
                &self.$field
            }
        }
    };
}

document!(Location, LOCATIONS, "location", id);
document!(Alert, ALERTS, "alert", id);
document!(CrowdData, CROWD_DATA, "crowd data", id);
document!(LostFound, LOST_FOUND, "lost-found item", id);
document!(DevoteeTiming, DEVOTEE_TIMINGS, "devotee timing", id);
document!(Setting, SETTINGS, "setting", key);
document!(RouteStatus, ROUTES, "route", id);
document!(Feedback, FEEDBACK, "feedback", id);
