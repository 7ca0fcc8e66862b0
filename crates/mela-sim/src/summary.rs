//! Read-only views derived from the zone list.

use serde::Serialize;

use mela_insight::{Prediction, RiskLevel};
use mela_state::GeoPoint;

use crate::zone::{DevoteeFlow, Surveillance, WeatherImpact, Zone};

fn is_high_risk(zone: &Zone) -> bool {
    matches!(
        zone.prediction.risk_level,
        RiskLevel::High | RiskLevel::Critical
    )
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

// ── Overview ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    pub total_people: u64,
    pub avg_density: u32,
    pub high_risk_zones: usize,
    pub active_anomalies: usize,
    pub total_zones: usize,
}

impl ZoneSummary {
    pub fn of(zones: &[Zone]) -> Self {
        Self {
            total_people: zones.iter().map(|z| u64::from(z.current_count)).sum(),
            avg_density: average(zones.iter().map(|z| z.current_density)).round() as u32,
            high_risk_zones: zones.iter().filter(|z| is_high_risk(z)).count(),
            active_anomalies: zones
                .iter()
                .filter(|z| z.surveillance.anomaly_detected)
                .count(),
            total_zones: zones.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneOverview {
    pub zones: Vec<Zone>,
    pub summary: ZoneSummary,
}

impl ZoneOverview {
    pub fn of(zones: Vec<Zone>) -> Self {
        let summary = ZoneSummary::of(&zones);
        Self { zones, summary }
    }
}

// ── Predictions ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePrediction {
    pub zone_id: String,
    pub zone_name: String,
    pub current_density: f64,
    pub prediction: Prediction,
    pub coordinates: GeoPoint,
}

impl From<&Zone> for ZonePrediction {
    fn from(zone: &Zone) -> Self {
        Self {
            zone_id: zone.id.clone(),
            zone_name: zone.zone_name.clone(),
            current_density: zone.current_density,
            prediction: zone.prediction.clone(),
            coordinates: zone.coordinates,
        }
    }
}

// ── Heatmap ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    /// Density as a fraction, 0 to 1.
    pub intensity: f64,
    pub radius: f64,
    pub color: &'static str,
}

pub fn heat_color(density: f64) -> &'static str {
    if density > 80.0 {
        "#ff4444"
    } else if density > 60.0 {
        "#ffaa00"
    } else if density > 40.0 {
        "#44aaff"
    } else {
        "#44ff44"
    }
}

impl From<&Zone> for HeatPoint {
    fn from(zone: &Zone) -> Self {
        let d = zone.current_density;
        Self {
            lat: zone.coordinates.lat,
            lng: zone.coordinates.lng,
            intensity: d / 100.0,
            radius: (d * 2.0).max(20.0),
            color: heat_color(d),
        }
    }
}

// ── Surveillance ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSurveillance {
    pub zone_id: String,
    pub zone_name: String,
    pub surveillance: Surveillance,
    pub coordinates: GeoPoint,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveillanceSummary {
    pub total_cameras: u32,
    pub active_anomalies: usize,
    pub system_status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveillanceReport {
    pub zones: Vec<ZoneSurveillance>,
    pub summary: SurveillanceSummary,
}

impl SurveillanceReport {
    pub fn of(zones: &[Zone]) -> Self {
        let active_anomalies = zones
            .iter()
            .filter(|z| z.surveillance.anomaly_detected)
            .count();
        Self {
            zones: zones
                .iter()
                .map(|z| ZoneSurveillance {
                    zone_id: z.id.clone(),
                    zone_name: z.zone_name.clone(),
                    surveillance: z.surveillance.clone(),
                    coordinates: z.coordinates,
                    timestamp: z.timestamp,
                })
                .collect(),
            summary: SurveillanceSummary {
                total_cameras: zones.iter().map(|z| z.surveillance.active_cameras).sum(),
                active_anomalies,
                system_status: if active_anomalies > 0 { "Alert" } else { "Normal" },
            },
        }
    }
}

// ── Analytics ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_people: u64,
    pub total_capacity: u64,
    pub overall_density: u32,
    pub avg_density: u32,
    pub efficiency: u32,
    pub active_anomalies: usize,
    pub total_cameras: u32,
    pub risk_distribution: RiskDistribution,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneAnalytics {
    pub zone_id: String,
    pub zone_name: String,
    pub coordinates: GeoPoint,
    /// Exits as a percentage of entries.
    pub efficiency: u32,
    pub avg_stay_time: u32,
    pub capacity_utilization: u32,
    pub risk_score: u8,
    pub current_density: f64,
    pub prediction: Prediction,
    pub surveillance: Surveillance,
    pub devotee_flow: DevoteeFlow,
    pub weather_impact: WeatherImpact,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakHours {
    pub zone_name: String,
    pub peak_hours: Vec<String>,
    pub entry_rate: f64,
    pub exit_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskEntry {
    pub name: String,
    pub density: f64,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub high_risk_zones: Vec<RiskEntry>,
    pub medium_risk_zones: Vec<RiskEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub overview: AnalyticsOverview,
    pub zone_analytics: Vec<ZoneAnalytics>,
    pub peak_hours: Vec<PeakHours>,
    pub risk_assessment: RiskAssessment,
    pub recommendations: Vec<&'static str>,
    pub last_updated: u64,
    pub timeframe: String,
    pub refresh_interval: u64,
}

fn percent(part: f64, whole: f64) -> u32 {
    if whole > 0.0 {
        (part / whole * 100.0).round() as u32
    } else {
        0
    }
}

fn risk_entry(zone: &Zone) -> RiskEntry {
    RiskEntry {
        name: zone.zone_name.clone(),
        density: zone.current_density,
        prediction: zone.prediction.clone(),
    }
}

impl Analytics {
    pub fn of(zones: &[Zone], timeframe: &str, refresh_interval: u64, now: u64) -> Self {
        let total_capacity: u64 = zones.iter().map(|z| u64::from(z.max_capacity)).sum();
        let total_people: u64 = zones.iter().map(|z| u64::from(z.current_count)).sum();
        let overall_density = percent(total_people as f64, total_capacity as f64);

        let zone_analytics: Vec<ZoneAnalytics> = zones
            .iter()
            .map(|z| ZoneAnalytics {
                zone_id: z.id.clone(),
                zone_name: z.zone_name.clone(),
                coordinates: z.coordinates,
                efficiency: percent(z.devotee_flow.exit_rate, z.devotee_flow.entry_rate),
                avg_stay_time: z.devotee_flow.avg_stay_time,
                capacity_utilization: percent(f64::from(z.current_count), f64::from(z.max_capacity)),
                risk_score: z.prediction.risk_level.score(),
                current_density: z.current_density,
                prediction: z.prediction.clone(),
                surveillance: z.surveillance.clone(),
                devotee_flow: z.devotee_flow.clone(),
                weather_impact: z.weather_impact.clone(),
            })
            .collect();

        let high: Vec<&Zone> = zones.iter().filter(|z| is_high_risk(z)).collect();
        let medium: Vec<&Zone> = zones
            .iter()
            .filter(|z| z.prediction.risk_level == RiskLevel::Medium)
            .collect();
        let low = zones
            .iter()
            .filter(|z| z.prediction.risk_level == RiskLevel::Low)
            .count();
        let active_anomalies = zones
            .iter()
            .filter(|z| z.surveillance.anomaly_detected)
            .count();

        let mut recommendations = Vec::new();
        if overall_density > 70 {
            recommendations.push("Consider implementing crowd flow restrictions");
        }
        if active_anomalies > 0 {
            recommendations.push("Active anomalies detected - investigate immediately");
        }
        if high.len() > 1 {
            recommendations.push("Multiple high-risk zones - deploy additional resources");
        }
        if overall_density > 85 {
            recommendations.push(
                "CRITICAL: Overall capacity approaching maximum - implement emergency protocols",
            );
        }

        let overview = AnalyticsOverview {
            total_people,
            total_capacity,
            overall_density,
            avg_density: average(zones.iter().map(|z| z.current_density)).round() as u32,
            efficiency: average(zone_analytics.iter().map(|z| f64::from(z.efficiency))).round() as u32,
            active_anomalies,
            total_cameras: zones.iter().map(|z| z.surveillance.active_cameras).sum(),
            risk_distribution: RiskDistribution {
                high: high.len(),
                medium: medium.len(),
                low,
            },
        };

        Self {
            overview,
            zone_analytics,
            peak_hours: zones
                .iter()
                .map(|z| PeakHours {
                    zone_name: z.zone_name.clone(),
                    peak_hours: z.devotee_flow.peak_hours.clone(),
                    entry_rate: z.devotee_flow.entry_rate,
                    exit_rate: z.devotee_flow.exit_rate,
                })
                .collect(),
            risk_assessment: RiskAssessment {
                high_risk_zones: high.into_iter().map(risk_entry).collect(),
                medium_risk_zones: medium.into_iter().map(risk_entry).collect(),
            },
            recommendations,
            last_updated: now,
            timeframe: timeframe.to_string(),
            refresh_interval,
        }
    }
}
