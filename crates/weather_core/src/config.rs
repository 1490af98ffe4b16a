//! Tunable constants. Every value here is hand-calibrated; they are exposed so
//! tests and tools can pin or sweep them rather than re-deriving them.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::region::ClimateArchetype;

/// Soft and hard caps on consecutive precipitation hours.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreakCaps {
    pub soft: u32,
    pub hard: u32,
}

impl StreakCaps {
    pub const fn new(soft: u32, hard: u32) -> Self {
        Self { soft, hard }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakTable {
    pub tropical_wet: StreakCaps,
    pub monsoon: StreakCaps,
    pub maritime: StreakCaps,
    pub polar: StreakCaps,
    pub temperate: StreakCaps,
    pub continental: StreakCaps,
}

impl Default for StreakTable {
    fn default() -> Self {
        Self {
            tropical_wet: StreakCaps::new(10, 20),
            monsoon: StreakCaps::new(18, 36),
            maritime: StreakCaps::new(12, 30),
            polar: StreakCaps::new(10, 24),
            temperate: StreakCaps::new(8, 20),
            continental: StreakCaps::new(6, 14),
        }
    }
}

impl StreakTable {
    pub fn caps(&self, archetype: ClimateArchetype) -> StreakCaps {
        match archetype {
            ClimateArchetype::TropicalWet => self.tropical_wet,
            ClimateArchetype::Monsoon => self.monsoon,
            ClimateArchetype::Maritime => self.maritime,
            ClimateArchetype::Polar => self.polar,
            ClimateArchetype::Temperate => self.temperate,
            ClimateArchetype::Continental => self.continental,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Days governed by one synoptic pattern.
    pub pattern_cycle_days: u32,
    /// Cycles looked back when settling the state a pattern is drawn from. The
    /// window doubles until every candidate history agrees.
    pub pattern_settle_cycles: u32,
    /// Selection multipliers after 1, 2 and 3+ repeats of the same pattern.
    pub fatigue_multipliers: [f64; 3],
    /// Width of the blend window centred on each cycle boundary.
    pub boundary_blend_hours: u32,
    pub streak_caps: StreakTable,
    pub streak_decay: f64,
    pub streak_floor: f64,
    pub forced_break_hours: u32,
    pub type_history_hours: u32,
    pub trend_hours: u32,
    pub replay_epoch_days: u32,
    pub replay_warmup_hours: u32,
    pub sample_minutes: u32,
    pub bisection_tolerance_hours: f64,
    pub accumulation_lookback_days: u32,
    pub drought_lookback_days: u32,
    pub flood_lookback_days: u32,
    pub extreme_lookback_days: u32,
    /// Hourly entries kept by each derived-service cache before it is flushed.
    pub derived_cache_capacity: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            pattern_cycle_days: 4,
            pattern_settle_cycles: 8,
            fatigue_multipliers: [0.5, 0.25, 0.1],
            boundary_blend_hours: 12,
            streak_caps: StreakTable::default(),
            streak_decay: 2.5,
            streak_floor: 0.15,
            forced_break_hours: 3,
            type_history_hours: 12,
            trend_hours: 3,
            replay_epoch_days: 14,
            replay_warmup_hours: 48,
            sample_minutes: 15,
            bisection_tolerance_hours: 0.001,
            accumulation_lookback_days: 14,
            drought_lookback_days: 30,
            flood_lookback_days: 14,
            extreme_lookback_days: 7,
            derived_cache_capacity: 1 << 16,
        }
    }
}

impl Tuning {
    /// Load a tuning document from disk. Missing keys keep their defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open tuning file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let tuning: Self = serde_json::from_reader(reader).context("invalid tuning json")?;
        Ok(tuning.sanitized())
    }

    /// Clamp values that would make the replay or root finder degenerate.
    pub fn sanitized(mut self) -> Self {
        self.pattern_cycle_days = self.pattern_cycle_days.max(1);
        self.pattern_settle_cycles = self.pattern_settle_cycles.max(1);
        self.derived_cache_capacity = self.derived_cache_capacity.max(1);
        // Seam reconciliation between epochs assumes the epoch outlasts a full streak.
        self.replay_epoch_days = self.replay_epoch_days.max(4);
        self.sample_minutes = self.sample_minutes.clamp(1, 60);
        self.trend_hours = self.trend_hours.max(1);
        self.type_history_hours = self.type_history_hours.max(self.trend_hours);
        self.forced_break_hours = self.forced_break_hours.max(1);
        self.streak_floor = self.streak_floor.clamp(0.0, 1.0);
        if !(self.bisection_tolerance_hours > 0.0) {
            self.bisection_tolerance_hours = 0.001;
        }
        for caps in [
            &mut self.streak_caps.tropical_wet,
            &mut self.streak_caps.monsoon,
            &mut self.streak_caps.maritime,
            &mut self.streak_caps.polar,
            &mut self.streak_caps.temperate,
            &mut self.streak_caps.continental,
        ] {
            caps.hard = caps.hard.max(1);
            caps.soft = caps.soft.min(caps.hard.saturating_sub(1));
        }
        self
    }

    pub fn epoch_hours(&self) -> i64 {
        i64::from(self.replay_epoch_days) * 24
    }

    pub fn cycle_hours(&self) -> i64 {
        i64::from(self.pattern_cycle_days) * 24
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let json = r#"{"streak_floor": 0.2, "streak_caps": {"polar": {"soft": 4, "hard": 9}}}"#;
        let tuning = Tuning::from_reader(json.as_bytes()).expect("tuning parses");
        assert_eq!(tuning.streak_floor, 0.2);
        assert_eq!(tuning.streak_caps.polar, StreakCaps::new(4, 9));
        assert_eq!(tuning.streak_caps.monsoon, StreakCaps::new(18, 36));
        assert_eq!(tuning.fatigue_multipliers, [0.5, 0.25, 0.1]);
        assert_eq!(tuning.pattern_cycle_days, 4);
    }

    #[test]
    fn sanitizing_repairs_degenerate_values() {
        let tuning = Tuning {
            pattern_cycle_days: 0,
            sample_minutes: 0,
            bisection_tolerance_hours: -1.0,
            streak_caps: StreakTable {
                polar: StreakCaps::new(30, 10),
                ..StreakTable::default()
            },
            ..Tuning::default()
        }
        .sanitized();
        assert_eq!(tuning.pattern_cycle_days, 1);
        assert_eq!(tuning.sample_minutes, 1);
        assert_eq!(tuning.bisection_tolerance_hours, 0.001);
        assert!(tuning.streak_caps.polar.soft < tuning.streak_caps.polar.hard);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = Tuning::from_reader("{not json".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid tuning json"));
    }
}
