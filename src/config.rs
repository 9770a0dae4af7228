use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::game::Timestamp;

/// Tunables for one match. Tables are indexed by match phase, phases past
/// the end of a table reuse its last entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Delay between the second player joining and the boards going live.
    pub start_delay_ms: u64,
    /// Board progress (percent) per phase step.
    pub phase_threshold: f64,
    /// Power-up progress for the first correct value in a cell.
    pub progress_gain: Vec<u8>,
    /// Extra power-up progress for solving a golden cell.
    pub golden_gain: Vec<u8>,
    /// How long a theme power-up threat stays open.
    pub challenge_duration_ms: Vec<Timestamp>,
    /// Largest tolerated gap between a client clock and the server clock.
    pub max_clock_drift_ms: Timestamp,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: 5_000,
            phase_threshold: 33.4,
            progress_gain: vec![20, 15, 10],
            golden_gain: vec![30, 25, 20],
            challenge_duration_ms: vec![30_000, 25_000, 20_000],
            max_clock_drift_ms: 2_000,
        }
    }
}

fn by_phase<T: Copy + Default>(table: &[T], phase: u32) -> T {
    table
        .get(phase as usize)
        .or(table.last())
        .copied()
        .unwrap_or_default()
}

impl GameConfig {
    /// Read a JSON config file. Missing fields fall back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Parse and sanity check a JSON config.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        anyhow::ensure!(
            config.phase_threshold > 0.0,
            "phaseThreshold must be positive, got {}",
            config.phase_threshold
        );
        Ok(config)
    }

    pub fn progress_gain(&self, phase: u32) -> u8 {
        by_phase(&self.progress_gain, phase)
    }

    pub fn golden_gain(&self, phase: u32) -> u8 {
        by_phase(&self.golden_gain, phase)
    }

    pub fn challenge_duration(&self, phase: u32) -> Timestamp {
        by_phase(&self.challenge_duration_ms, phase)
    }

    /// Board progress needed to move past `phase`.
    pub fn next_phase_threshold(&self, phase: u32) -> f64 {
        (phase + 1) as f64 * self.phase_threshold
    }
}
