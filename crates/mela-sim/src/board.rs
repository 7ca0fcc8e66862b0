//! ZoneBoard: shared live zone state.
//!
//! Handlers read views from the board while a background task re-randomizes
//! it every `interval`. All randomness is drawn inside synchronous helpers
//! so no RNG handle is held across an await.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

use mela_core::epoch_secs;

use crate::summary::{Analytics, HeatPoint, SurveillanceReport, ZoneOverview, ZonePrediction};
use crate::zone::{Zone, demo_zones};

fn refresh_all(zones: &mut [Zone]) {
    let mut rng = rand::thread_rng();
    for zone in zones {
        zone.refresh_prediction(&mut rng);
    }
}

fn advance_all(zones: &mut [Zone], now: u64) {
    let mut rng = rand::thread_rng();
    for zone in zones {
        zone.advance(&mut rng, now);
    }
}

#[derive(Clone)]
pub struct ZoneBoard {
    zones: Arc<RwLock<Vec<Zone>>>,
    interval: Duration,
}

impl ZoneBoard {
    pub fn new(zones: Vec<Zone>, interval: Duration) -> Self {
        Self {
            zones: Arc::new(RwLock::new(zones)),
            interval,
        }
    }

    /// Board preloaded with the three demo zones.
    pub fn with_demo_zones(interval: Duration) -> Self {
        let zones = demo_zones(&mut rand::thread_rng(), epoch_secs());
        Self::new(zones, interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// All zones with freshly computed forecasts.
    pub async fn snapshot(&self) -> Vec<Zone> {
        let mut zones = self.zones.read().await.clone();
        refresh_all(&mut zones);
        zones
    }

    pub async fn overview(&self) -> ZoneOverview {
        ZoneOverview::of(self.snapshot().await)
    }

    pub async fn get(&self, zone_id: &str) -> Option<Zone> {
        let mut zone = self
            .zones
            .read()
            .await
            .iter()
            .find(|z| z.id == zone_id)
            .cloned()?;
        refresh_all(std::slice::from_mut(&mut zone));
        Some(zone)
    }

    pub async fn predictions(&self) -> Vec<ZonePrediction> {
        self.snapshot().await.iter().map(ZonePrediction::from).collect()
    }

    pub async fn heatmap(&self) -> Vec<HeatPoint> {
        self.zones.read().await.iter().map(HeatPoint::from).collect()
    }

    pub async fn surveillance(&self) -> SurveillanceReport {
        SurveillanceReport::of(&self.zones.read().await)
    }

    pub async fn analytics(&self, timeframe: &str) -> Analytics {
        let zones = self.snapshot().await;
        Analytics::of(&zones, timeframe, self.interval.as_secs(), epoch_secs())
    }

    /// Apply a density reading to one zone. Returns `None` for unknown zones.
    pub async fn update_density(
        &self,
        zone_id: &str,
        density: f64,
        people: Option<u32>,
    ) -> Option<Zone> {
        let mut zones = self.zones.write().await;
        let zone = zones.iter_mut().find(|z| z.id == zone_id)?;
        zone.set_density(density, people, epoch_secs(), &mut rand::thread_rng());
        info!(%zone_id, density, level = ?zone.surveillance.ai_alert_level, "zone density updated");
        Some(zone.clone())
    }

    /// Put a zone into an emergency drill. Returns `None` for unknown zones.
    pub async fn simulate_emergency(&self, zone_id: &str, kind: &str) -> Option<Zone> {
        let mut zones = self.zones.write().await;
        let zone = zones.iter_mut().find(|z| z.id == zone_id)?;
        zone.start_emergency(kind, epoch_secs());
        info!(%zone_id, %kind, "emergency simulation started");
        Some(zone.clone())
    }

    /// Advance every zone one random step.
    pub async fn tick(&self) {
        let mut zones = self.zones.write().await;
        advance_all(&mut zones, epoch_secs());
        debug!(zones = zones.len(), "zone board advanced");
    }

    /// Run the re-randomizer until shutdown signal.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "zone simulator started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    info!("zone simulator shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_insight::{RiskLevel, emergency_prediction};
    use crate::zone::AlertLevel;

    fn board() -> ZoneBoard {
        ZoneBoard::with_demo_zones(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn unknown_zone_is_none() {
        let board = board();
        assert!(board.get("99").await.is_none());
        assert!(board.update_density("99", 10.0, None).await.is_none());
        assert!(board.simulate_emergency("99", "fire").await.is_none());
    }

    #[tokio::test]
    async fn emergency_is_pinned_across_reads_and_ticks() {
        let board = board();
        board.simulate_emergency("2", "overcrowding").await.unwrap();
        board.tick().await;

        let zone = board.get("2").await.unwrap();
        assert_eq!(zone.prediction, emergency_prediction());
        let overview = board.overview().await;
        let pinned = overview.zones.iter().find(|z| z.id == "2").unwrap();
        assert_eq!(pinned.prediction.risk_level, RiskLevel::Critical);

        let updated = board.update_density("2", 20.0, Some(600)).await.unwrap();
        assert!(updated.emergency.is_none());
        assert_eq!(updated.surveillance.ai_alert_level, AlertLevel::Normal);
        assert_eq!(updated.current_count, 600);
    }

    #[tokio::test]
    async fn views_cover_every_zone() {
        let board = board();
        assert_eq!(board.snapshot().await.len(), 3);
        assert_eq!(board.predictions().await.len(), 3);
        assert_eq!(board.heatmap().await.len(), 3);
        assert_eq!(board.surveillance().await.zones.len(), 3);
        let analytics = board.analytics("24h").await;
        assert_eq!(analytics.zone_analytics.len(), 3);
        assert_eq!(analytics.timeframe, "24h");
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let board = board();
        let (tx, rx) = watch::channel(false);
        let task = {
            let board = board.clone();
            tokio::spawn(async move { board.run(rx).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("simulator did not stop")
            .unwrap();
    }
}
