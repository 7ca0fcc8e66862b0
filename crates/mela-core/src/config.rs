//! mela.toml configuration parser.
//!
//! Every section is optional; missing values fall back to the defaults
//! used for a single-site deployment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MelaConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub simulation: SimulationConfig,
    pub timing: TimingConfig,
    pub events: Vec<EventConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Origin allowed by CORS (the admin dashboard).
    pub cors_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Stays longer than this many minutes are flagged as overstays.
    pub overstay_minutes: u64,
}

/// A scheduled event shown to mobile users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    #[serde(default = "default_event_kind")]
    pub kind: String,
}

impl Default for MelaConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            simulation: SimulationConfig::default(),
            timing: TimingConfig::default(),
            events: default_events(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/mela"),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { overstay_minutes: 60 }
    }
}

fn default_event_kind() -> String {
    "daily".to_string()
}

fn default_events() -> Vec<EventConfig> {
    vec![
        EventConfig {
            title: "Morning Aarti".to_string(),
            description: "Daily morning prayers and aarti".to_string(),
            start_time: "06:00".to_string(),
            end_time: "07:00".to_string(),
            location: "Main Temple".to_string(),
            kind: default_event_kind(),
        },
        EventConfig {
            title: "Evening Aarti".to_string(),
            description: "Daily evening prayers and aarti".to_string(),
            start_time: "19:00".to_string(),
            end_time: "20:00".to_string(),
            location: "Main Temple".to_string(),
            kind: default_event_kind(),
        },
    ]
}

impl MelaConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Path of the redb database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.storage.data_dir.join("mela.redb")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MelaConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.simulation.interval_secs, 30);
        assert_eq!(config.timing.overstay_minutes, 60);
        assert_eq!(config.events.len(), 2);
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/mela/mela.redb"));
    }

    #[test]
    fn test_parse_partial() {
        let toml_str = r#"
[server]
port = 8080

[timing]
overstay_minutes = 45
"#;
        let config = MelaConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.timing.overstay_minutes, 45);
        assert!(config.simulation.enabled);
        assert_eq!(config.events.len(), 2);
    }

    #[test]
    fn test_parse_custom_events() {
        let toml_str = r#"
[[events]]
title = "Shahi Snan"
start_time = "04:00"
end_time = "09:00"
location = "Sangam"
"#;
        let config = MelaConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.events.len(), 1);
        assert_eq!(config.events[0].title, "Shahi Snan");
        assert_eq!(config.events[0].kind, "daily");
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mela.toml");
        let mut config = MelaConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = MelaConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.storage.data_dir, dir.path());
        assert_eq!(loaded.events, config.events);
    }
}
