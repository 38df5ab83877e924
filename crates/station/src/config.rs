use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use interop::NetIoConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub tick_rate: u32,
    pub bind: String,
    pub peer: String,
    pub queue_capacity: usize,
    pub stats_interval_secs: f64,
    /// Name of the spawned player used as the range-filter origin.
    pub ownship: Option<String>,
    pub players: Vec<PlayerEntry>,
    pub netio: NetIoConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30,
            bind: "0.0.0.0:3000".to_string(),
            peer: "255.255.255.255:3000".to_string(),
            queue_capacity: 1024,
            stats_interval_secs: 10.0,
            ownship: None,
            players: Vec::new(),
            netio: NetIoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerEntry {
    pub name: String,
    pub template: String,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    /// Roll, pitch, yaw in degrees.
    pub orientation: [f64; 3],
    /// Degrees per second.
    pub angular_velocity: [f64; 3],
}

impl StationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }
}
