//! Zone model and the per-tick random walk.

use rand::Rng;
use serde::{Deserialize, Serialize};

use mela_insight::{Prediction, PredictionInput, draw_confidence, emergency_prediction, predict};
use mela_state::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surveillance {
    pub active_cameras: u32,
    pub anomaly_detected: bool,
    pub last_anomaly: Option<String>,
    pub ai_alert_level: AlertLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevoteeFlow {
    /// People per minute.
    pub entry_rate: f64,
    pub exit_rate: f64,
    /// Minutes.
    pub avg_stay_time: u32,
    pub peak_hours: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherImpact {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub comfort_index: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub zone_name: String,
    pub coordinates: GeoPoint,
    /// Percentage of capacity, 0 to 100.
    pub current_density: f64,
    pub max_capacity: u32,
    pub current_count: u32,
    pub prediction: Prediction,
    pub surveillance: Surveillance,
    pub devotee_flow: DevoteeFlow,
    pub weather_impact: WeatherImpact,
    /// Active emergency drill. While set, `prediction` stays pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency: Option<String>,
    pub timestamp: u64,
}

impl Zone {
    pub fn prediction_input(&self) -> PredictionInput {
        PredictionInput {
            current_density: self.current_density,
            entry_rate: self.devotee_flow.entry_rate,
            exit_rate: self.devotee_flow.exit_rate,
            comfort_index: self.weather_impact.comfort_index.clone(),
        }
    }

    /// Recompute the forecast unless an emergency has pinned it.
    pub fn refresh_prediction<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.emergency.is_none() {
            self.prediction = predict(&self.prediction_input(), draw_confidence(rng));
        }
    }

    /// Apply an operator density reading and re-derive the alert state.
    /// Clears any active emergency.
    pub fn set_density<R: Rng + ?Sized>(
        &mut self,
        density: f64,
        people: Option<u32>,
        now: u64,
        rng: &mut R,
    ) {
        self.current_density = density.clamp(0.0, 100.0);
        if let Some(people) = people {
            self.current_count = people;
        }
        self.timestamp = now;
        self.emergency = None;
        self.refresh_prediction(rng);

        if density > 80.0 {
            self.surveillance.anomaly_detected = true;
            self.surveillance.last_anomaly = Some("High density detected".to_string());
            self.surveillance.ai_alert_level = AlertLevel::Critical;
        } else if density > 60.0 {
            self.surveillance.ai_alert_level = AlertLevel::Warning;
        } else {
            self.surveillance.anomaly_detected = false;
            self.surveillance.ai_alert_level = AlertLevel::Normal;
        }
    }

    pub fn start_emergency(&mut self, kind: &str, now: u64) {
        self.current_density = 95.0;
        self.surveillance.anomaly_detected = true;
        self.surveillance.last_anomaly = Some(format!("Emergency simulation: {kind}"));
        self.surveillance.ai_alert_level = AlertLevel::Critical;
        self.prediction = emergency_prediction();
        self.emergency = Some(kind.to_string());
        self.timestamp = now;
    }

    /// One step of the demo random walk.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R, now: u64) {
        let density = (self.current_density + rng.gen_range(-5.0..=5.0)).clamp(0.0, 100.0);
        self.current_density = density.round();
        self.current_count = (self.current_density / 100.0 * f64::from(self.max_capacity)).round() as u32;

        let flow = &mut self.devotee_flow;
        flow.entry_rate = (flow.entry_rate + rng.gen_range(-5.0..=5.0)).max(0.0);
        flow.exit_rate = (flow.exit_rate + rng.gen_range(-4.0..=4.0)).max(0.0);

        let weather = &mut self.weather_impact;
        weather.temperature += rng.gen_range(-1.0..=1.0);
        weather.humidity = (weather.humidity + rng.gen_range(-5.0..=5.0)).clamp(30.0, 90.0);

        self.timestamp = now;
        self.refresh_prediction(rng);
    }
}

struct Seed {
    id: &'static str,
    name: &'static str,
    at: (f64, f64),
    density: f64,
    capacity: u32,
    flow: (f64, f64, u32, [&'static str; 2]),
    cameras: u32,
    anomaly: Option<&'static str>,
    level: AlertLevel,
    weather: (f64, f64, f64, &'static str),
}

const DEMO: [Seed; 3] = [
    Seed {
        id: "1",
        name: "Main Ghat Area",
        at: (25.4358, 81.8463),
        density: 85.0,
        capacity: 5000,
        flow: (45.0, 32.0, 35, ["06:00-09:00", "17:00-20:00"]),
        cameras: 12,
        anomaly: Some("Overcrowding detected"),
        level: AlertLevel::Critical,
        weather: (28.0, 65.0, 5.0, "Moderate"),
    },
    Seed {
        id: "2",
        name: "Puja Kendra Complex",
        at: (25.4368, 81.8473),
        density: 65.0,
        capacity: 3000,
        flow: (25.0, 22.0, 45, ["05:00-08:00", "18:00-21:00"]),
        cameras: 8,
        anomaly: None,
        level: AlertLevel::Normal,
        weather: (27.0, 60.0, 8.0, "Good"),
    },
    Seed {
        id: "3",
        name: "Service & Rest Area",
        at: (25.4348, 81.8453),
        density: 45.0,
        capacity: 2000,
        flow: (15.0, 18.0, 25, ["12:00-14:00", "19:00-21:00"]),
        cameras: 6,
        anomaly: None,
        level: AlertLevel::Normal,
        weather: (26.0, 58.0, 10.0, "Excellent"),
    },
];

/// The three demo zones around the main ghat, with fresh forecasts.
pub fn demo_zones<R: Rng + ?Sized>(rng: &mut R, now: u64) -> Vec<Zone> {
    DEMO.iter()
        .map(|s| {
            let devotee_flow = DevoteeFlow {
                entry_rate: s.flow.0,
                exit_rate: s.flow.1,
                avg_stay_time: s.flow.2,
                peak_hours: s.flow.3.iter().map(|h| h.to_string()).collect(),
            };
            let weather_impact = WeatherImpact {
                temperature: s.weather.0,
                humidity: s.weather.1,
                wind_speed: s.weather.2,
                comfort_index: s.weather.3.to_string(),
            };
            let input = PredictionInput {
                current_density: s.density,
                entry_rate: devotee_flow.entry_rate,
                exit_rate: devotee_flow.exit_rate,
                comfort_index: weather_impact.comfort_index.clone(),
            };
            Zone {
                id: s.id.to_string(),
                zone_name: s.name.to_string(),
                coordinates: GeoPoint::new(s.at.0, s.at.1),
                current_density: s.density,
                max_capacity: s.capacity,
                current_count: (s.density / 100.0 * f64::from(s.capacity)).round() as u32,
                prediction: predict(&input, draw_confidence(rng)),
                surveillance: Surveillance {
                    active_cameras: s.cameras,
                    anomaly_detected: s.anomaly.is_some(),
                    last_anomaly: s.anomaly.map(str::to_string),
                    ai_alert_level: s.level,
                },
                devotee_flow,
                weather_impact,
                emergency: None,
                timestamp: now,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_insight::RiskLevel;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn zones() -> Vec<Zone> {
        demo_zones(&mut StdRng::seed_from_u64(1), 1_000)
    }

    #[test]
    fn demo_zones_match_capacity() {
        let zones = zones();
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[0].current_count, 4250);
        assert_eq!(zones[1].current_count, 1950);
        assert_eq!(zones[2].current_count, 900);
        assert_eq!(zones[0].prediction.risk_level, RiskLevel::High);
        assert_eq!(zones[2].prediction.risk_level, RiskLevel::Low);
    }

    #[test]
    fn advance_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut zones = zones();
        zones[0].current_density = 99.0;
        zones[2].current_density = 1.0;
        zones[2].devotee_flow.exit_rate = 0.5;
        zones[1].weather_impact.humidity = 89.0;

        for step in 0..500 {
            for zone in &mut zones {
                let before = zone.current_density;
                zone.advance(&mut rng, 2_000 + step);
                assert!((0.0..=100.0).contains(&zone.current_density));
                assert_eq!(zone.current_density, zone.current_density.round());
                assert!((zone.current_density - before).abs() <= 5.5);
                assert!(zone.devotee_flow.entry_rate >= 0.0);
                assert!(zone.devotee_flow.exit_rate >= 0.0);
                assert!((30.0..=90.0).contains(&zone.weather_impact.humidity));
                let expected = (zone.current_density / 100.0 * f64::from(zone.max_capacity)).round() as u32;
                assert_eq!(zone.current_count, expected);
            }
        }
        assert_eq!(zones[0].timestamp, 2_499);
    }

    #[test]
    fn density_bands_drive_alert_level() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut zone = zones().remove(1);

        zone.set_density(90.0, Some(2700), 5, &mut rng);
        assert!(zone.surveillance.anomaly_detected);
        assert_eq!(zone.surveillance.ai_alert_level, AlertLevel::Critical);
        assert_eq!(zone.surveillance.last_anomaly.as_deref(), Some("High density detected"));
        assert_eq!(zone.current_count, 2700);

        zone.set_density(70.0, None, 6, &mut rng);
        assert!(zone.surveillance.anomaly_detected);
        assert_eq!(zone.surveillance.ai_alert_level, AlertLevel::Warning);
        assert_eq!(zone.current_count, 2700);

        zone.set_density(30.0, None, 7, &mut rng);
        assert!(!zone.surveillance.anomaly_detected);
        assert_eq!(zone.surveillance.ai_alert_level, AlertLevel::Normal);
    }

    #[test]
    fn emergency_pins_prediction_until_density_update() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut zone = zones().remove(2);

        zone.start_emergency("stampede", 10);
        assert_eq!(zone.current_density, 95.0);
        assert_eq!(
            zone.surveillance.last_anomaly.as_deref(),
            Some("Emergency simulation: stampede")
        );

        zone.advance(&mut rng, 11);
        zone.refresh_prediction(&mut rng);
        assert_eq!(zone.prediction, emergency_prediction());

        zone.set_density(40.0, None, 12, &mut rng);
        assert!(zone.emergency.is_none());
        assert_ne!(zone.prediction.risk_level, RiskLevel::Critical);
    }
}
