//! mela-sim: live zone board.
//!
//! Holds the demo zones shown on the operations dashboard, re-randomizes
//! them on a timer, and derives the heatmap, surveillance and analytics
//! views from the current state. The board is independent of the document
//! store.

pub mod board;
pub mod summary;
pub mod zone;

pub use board::ZoneBoard;
pub use summary::{Analytics, HeatPoint, SurveillanceReport, ZoneOverview, ZonePrediction, ZoneSummary};
pub use zone::{AlertLevel, DevoteeFlow, Surveillance, WeatherImpact, Zone, demo_zones};
