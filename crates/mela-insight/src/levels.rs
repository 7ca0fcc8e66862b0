//! Occupancy bucketing.

use mela_state::CrowdLevel;

/// `occupancy / capacity`, or `None` when capacity is unknown (zero).
pub fn occupancy_ratio(occupancy: u32, capacity: u32) -> Option<f64> {
    (capacity > 0).then(|| f64::from(occupancy) / f64::from(capacity))
}

/// Rounded occupancy percentage.
pub fn occupancy_percent(occupancy: u32, capacity: u32) -> Option<u32> {
    occupancy_ratio(occupancy, capacity).map(|r| (r * 100.0).round() as u32)
}

pub fn crowd_level(occupancy: u32, capacity: u32) -> Option<CrowdLevel> {
    let ratio = occupancy_ratio(occupancy, capacity)?;
    Some(if ratio >= 1.0 {
        CrowdLevel::Critical
    } else if ratio >= 0.8 {
        CrowdLevel::High
    } else if ratio >= 0.5 {
        CrowdLevel::Medium
    } else {
        CrowdLevel::Low
    })
}
