//! mela-insight: pure heuristics behind the Mela API.
//!
//! Nothing here touches storage or the clock; callers pass documents and
//! timestamps in and get plain values back.
//!
//! # Components
//!
//! - **`matcher`**: Lost/found pair scoring
//! - **`predictor`**: Linear crowd density forecast
//! - **`geo`**: Bounding-box proximity filters
//! - **`levels`**: Occupancy ratio to crowd level bucketing

pub mod geo;
pub mod levels;
pub mod matcher;
pub mod predictor;

pub use geo::{BoundingBox, parse_point_radius};
pub use levels::{crowd_level, occupancy_percent, occupancy_ratio};
pub use matcher::{Confidence, MatchCandidate, find_matches, score_pair};
pub use predictor::{Prediction, PredictionInput, RiskLevel, draw_confidence, emergency_prediction, predict};
