//! Linear crowd density forecast.
//!
//! The forecast extrapolates the net flow (entries minus exits per minute)
//! scaled by a weather comfort multiplier:
//!
//! ```text
//! next30Min = clamp(density + flow * 0.5 * w, 0, 100)
//! nextHour  = clamp(density + flow * 1.2 * w, 0, 100)
//! ```
//!
//! Risk is read from the one-hour value. `Critical` is never produced here;
//! only [`emergency_prediction`] uses it.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Weight used by zone analytics.
    pub fn score(&self) -> u8 {
        match self {
            Self::High | Self::Critical => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// Flow snapshot a forecast is computed from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    /// Percentage, 0 to 100.
    pub current_density: f64,
    /// People per minute.
    pub entry_rate: f64,
    pub exit_rate: f64,
    #[serde(default = "default_comfort")]
    pub comfort_index: String,
}

fn default_comfort() -> String {
    "Moderate".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub next_hour: u8,
    #[serde(rename = "next30Min")]
    pub next_30_min: u8,
    pub risk_level: RiskLevel,
    pub recommended_action: String,
    pub confidence: u8,
}

pub fn weather_multiplier(comfort_index: &str) -> f64 {
    match comfort_index {
        "Excellent" => 1.1,
        "Good" => 1.05,
        "Moderate" => 1.0,
        _ => 0.9,
    }
}

fn clamp_percent(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

/// Forecast density for the next half hour and hour.
pub fn predict(input: &PredictionInput, confidence: u8) -> Prediction {
    let flow = input.entry_rate - input.exit_rate;
    let w = weather_multiplier(&input.comfort_index);

    let next_30 = input.current_density + flow * 0.5 * w;
    let next_hour = input.current_density + flow * 1.2 * w;

    let next_hour_clamped = next_hour.clamp(0.0, 100.0);
    let (risk_level, action) = if next_hour_clamped > 80.0 {
        (RiskLevel::High, "Deploy crowd control, restrict entry if needed")
    } else if next_hour_clamped > 60.0 {
        (RiskLevel::Medium, "Monitor closely, prepare intervention")
    } else {
        (RiskLevel::Low, "Normal operations")
    };

    Prediction {
        next_hour: clamp_percent(next_hour),
        next_30_min: clamp_percent(next_30),
        risk_level,
        recommended_action: action.to_string(),
        confidence,
    }
}

/// Forecast pinned on a zone while an emergency drill is active.
pub fn emergency_prediction() -> Prediction {
    Prediction {
        next_hour: 98,
        next_30_min: 97,
        risk_level: RiskLevel::Critical,
        recommended_action: "IMMEDIATE EVACUATION REQUIRED".to_string(),
        confidence: 99,
    }
}

/// Model confidence, drawn uniformly from 85..=95.
pub fn draw_confidence<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(85..=95)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn input(density: f64, entry: f64, exit: f64, comfort: &str) -> PredictionInput {
        PredictionInput {
            current_density: density,
            entry_rate: entry,
            exit_rate: exit,
            comfort_index: comfort.to_string(),
        }
    }

    #[test]
    fn busy_ghat_is_high_risk() {
        let p = predict(&input(85.0, 45.0, 32.0, "Moderate"), 90);
        // 85 + 13 * 0.5 = 91.5, 85 + 13 * 1.2 = 100.6 clamped.
        assert_eq!(p.next_30_min, 92);
        assert_eq!(p.next_hour, 100);
        assert_eq!(p.risk_level, RiskLevel::High);
        assert_eq!(p.confidence, 90);
    }

    #[test]
    fn values_stay_in_range_for_any_comfort() {
        for comfort in ["Excellent", "Good", "Moderate", "Poor", ""] {
            let p = predict(&input(85.0, 45.0, 32.0, comfort), 85);
            assert!(p.next_30_min <= 100 && p.next_hour <= 100);
            assert_eq!(p.risk_level, RiskLevel::High);
        }
        let drained = predict(&input(5.0, 0.0, 40.0, "Good"), 85);
        assert_eq!(drained.next_hour, 0);
        assert_eq!(drained.next_30_min, 0);
        assert_eq!(drained.risk_level, RiskLevel::Low);
    }

    #[test]
    fn medium_band() {
        let p = predict(&input(65.0, 25.0, 22.0, "Good"), 87);
        // 65 + 3 * 1.2 * 1.05 = 68.78
        assert_eq!(p.next_hour, 69);
        assert_eq!(p.risk_level, RiskLevel::Medium);
        assert_eq!(p.recommended_action, "Monitor closely, prepare intervention");
    }

    #[test]
    fn weather_multipliers() {
        assert_eq!(weather_multiplier("Excellent"), 1.1);
        assert_eq!(weather_multiplier("Good"), 1.05);
        assert_eq!(weather_multiplier("Moderate"), 1.0);
        assert_eq!(weather_multiplier("Stormy"), 0.9);
    }

    #[test]
    fn wire_names() {
        let json = serde_json::to_value(emergency_prediction()).unwrap();
        assert_eq!(json["next30Min"], 97);
        assert_eq!(json["nextHour"], 98);
        assert_eq!(json["riskLevel"], "Critical");
    }

    #[test]
    fn confidence_within_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let c = draw_confidence(&mut rng);
            assert!((85..=95).contains(&c));
        }
    }
}
