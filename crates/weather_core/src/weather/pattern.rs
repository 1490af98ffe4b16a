//! Synoptic pattern chain.
//!
//! Time is cut into fixed cycles (four days by default) and each cycle carries
//! one [`PatternKind`]. The kind is drawn from a weighted Markov table keyed on
//! the previous cycle, with a fatigue penalty against long repeats.
//!
//! Each cycle owns one fixed roll, so the state a cycle is drawn from can be
//! found without walking the whole history: every possible state is run forward
//! over a window of earlier rolls, and the window doubles until they all agree.
//! The result is the same state an unbroken chain would reach.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, Memo};
use crate::calendar::GameDate;
use crate::config::Tuning;
use crate::rng::{cycle_seed, weighted_choice, SeededRandom};

pub const PATTERN_CONTEXT: &str = "pattern";

/// Relative transition weights, rows are the previous pattern and columns the
/// candidate, both in [`PatternKind::ALL`] order.
const TRANSITIONS: [[f64; 5]; 5] = [
    [2.0, 3.0, 3.0, 1.0, 3.0],
    [2.0, 1.0, 2.0, 4.0, 1.0],
    [1.0, 3.0, 1.0, 3.0, 2.0],
    [5.0, 1.0, 1.0, 1.0, 2.0],
    [3.0, 2.0, 3.0, 2.0, 2.0],
];

/// Applied to every wet candidate once two wet cycles have run back to back.
const WET_RUN_PENALTY: f64 = 0.5;
const WET_CHANCE_THRESHOLD: f64 = 0.45;
/// Wet runs past this length all draw from the same penalised table.
const WET_RUN_LIMIT: u32 = 2;
/// Longest settling window before the first surviving candidate is taken.
const SETTLE_LIMIT: i64 = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternKind {
    HighPressure,
    LowPressure,
    WarmFront,
    ColdFront,
    Stable,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternTraits {
    pub clear_skies: f64,
    pub precipitation_chance: f64,
    pub wind_multiplier: f64,
    pub temp_modifier: f64,
}

impl PatternKind {
    pub const ALL: [PatternKind; 5] = [
        PatternKind::HighPressure,
        PatternKind::LowPressure,
        PatternKind::WarmFront,
        PatternKind::ColdFront,
        PatternKind::Stable,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::HighPressure => 0,
            Self::LowPressure => 1,
            Self::WarmFront => 2,
            Self::ColdFront => 3,
            Self::Stable => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::HighPressure => "High Pressure",
            Self::LowPressure => "Low Pressure",
            Self::WarmFront => "Warm Front",
            Self::ColdFront => "Cold Front",
            Self::Stable => "Stable",
        }
    }

    pub fn traits(&self) -> PatternTraits {
        let (clear_skies, precipitation_chance, wind_multiplier, temp_modifier) = match self {
            Self::HighPressure => (0.8, 0.1, 0.8, 3.0),
            Self::LowPressure => (0.2, 0.6, 1.3, -2.0),
            Self::WarmFront => (0.3, 0.45, 1.1, 5.0),
            Self::ColdFront => (0.4, 0.5, 1.5, -7.0),
            Self::Stable => (0.6, 0.2, 0.7, 0.0),
        };
        PatternTraits {
            clear_skies,
            precipitation_chance,
            wind_multiplier,
            temp_modifier,
        }
    }

    /// Declared lifetime in days, inclusive.
    pub fn duration_range(&self) -> (u32, u32) {
        match self {
            Self::HighPressure => (3, 6),
            Self::LowPressure => (2, 4),
            Self::WarmFront => (1, 3),
            Self::ColdFront => (1, 2),
            Self::Stable => (3, 7),
        }
    }

    /// Sea-level pressure departure in hPa.
    pub fn pressure_offset(&self) -> f64 {
        match self {
            Self::HighPressure => 12.0,
            Self::LowPressure => -14.0,
            Self::WarmFront => -5.0,
            Self::ColdFront => -8.0,
            Self::Stable => 4.0,
        }
    }

    /// Chance that a wet three-hour block is heavy.
    pub fn heavy_chance(&self) -> f64 {
        match self {
            Self::LowPressure | Self::ColdFront => 0.25,
            Self::WarmFront => 0.15,
            Self::HighPressure | Self::Stable => 0.08,
        }
    }

    /// Offset of the wind direction from the band's prevailing wind.
    pub fn wind_veer(&self) -> f64 {
        match self {
            Self::HighPressure | Self::Stable => 0.0,
            Self::LowPressure => -60.0,
            Self::WarmFront => -90.0,
            Self::ColdFront => 60.0,
        }
    }

    pub fn is_wet(&self) -> bool {
        self.traits().precipitation_chance >= WET_CHANCE_THRESHOLD
    }

    /// Average precipitation chance over every pattern, used for climatology.
    pub fn mean_precipitation_chance() -> f64 {
        Self::ALL
            .iter()
            .map(|kind| kind.traits().precipitation_chance)
            .sum::<f64>()
            / Self::ALL.len() as f64
    }
}

/// The pattern bound to one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclePattern {
    pub kind: PatternKind,
    pub cycle: i64,
    pub total_days: u32,
    /// Consecutive cycles, this one included, sharing `kind`.
    pub repeat: u32,
    /// Consecutive wet cycles, this one included.
    pub wet_run: u32,
}

/// A pattern as seen from one hour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSnapshot {
    pub kind: PatternKind,
    pub cycle: i64,
    pub day_in_cycle: u32,
    pub total_days: u32,
    /// Temperature modifier after boundary smoothing.
    pub temp_modifier: f64,
    pub pressure_offset: f64,
}

/// The part of a cycle the next draw depends on: its kind, with the repeat and
/// wet-run counters capped where the transition table stops distinguishing them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ChainState {
    kind: PatternKind,
    repeat: u32,
    wet_run: u32,
}

impl ChainState {
    #[cfg(test)]
    fn of(pattern: &CyclePattern, repeat_limit: u32) -> Self {
        Self {
            kind: pattern.kind,
            repeat: pattern.repeat.clamp(1, repeat_limit),
            wet_run: pattern.wet_run.min(WET_RUN_LIMIT),
        }
    }

    /// Every state a cycle can leave behind.
    fn every(repeat_limit: u32) -> Vec<Self> {
        let mut states = Vec::new();
        for kind in PatternKind::ALL {
            let wet_runs = if kind.is_wet() { 1..=WET_RUN_LIMIT } else { 0..=0 };
            for wet_run in wet_runs {
                for repeat in 1..=repeat_limit {
                    states.push(Self {
                        kind,
                        repeat,
                        wet_run,
                    });
                }
            }
        }
        states
    }

    fn followed_by(self, kind: PatternKind, repeat_limit: u32) -> Self {
        Self {
            kind,
            repeat: if kind == self.kind {
                (self.repeat + 1).min(repeat_limit)
            } else {
                1
            },
            wet_run: if kind.is_wet() {
                (self.wet_run + 1).min(WET_RUN_LIMIT)
            } else {
                0
            },
        }
    }
}

#[derive(Debug)]
pub struct PatternService {
    cycle_days: u32,
    settle_cycles: i64,
    fatigue: [f64; 3],
    blend_hours: u32,
    cycles: Memo<(String, i64), CyclePattern>,
}

impl PatternService {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            cycle_days: tuning.pattern_cycle_days.max(1),
            settle_cycles: i64::from(tuning.pattern_settle_cycles.max(1)),
            fatigue: tuning.fatigue_multipliers,
            blend_hours: tuning.boundary_blend_hours,
            cycles: Memo::new("pattern-cycles"),
        }
    }

    pub fn cycle_hours(&self) -> i64 {
        i64::from(self.cycle_days) * 24
    }

    pub fn cycle_of(&self, date: &GameDate) -> i64 {
        date.absolute_day().div_euclid(i64::from(self.cycle_days))
    }

    pub fn pattern_for_cycle(&self, region_id: &str, cycle: i64) -> CyclePattern {
        self.cycles
            .get_or_insert_with((region_id.to_string(), cycle), || self.draw(region_id, cycle))
    }

    pub fn pattern_at(&self, region_id: &str, date: &GameDate) -> CyclePattern {
        self.pattern_for_cycle(region_id, self.cycle_of(date))
    }

    /// The pattern at `date` with temperature and pressure blended across the
    /// `boundary_blend_hours` window centred on each cycle boundary.
    pub fn snapshot(&self, region_id: &str, date: &GameDate) -> PatternSnapshot {
        let hour = date.absolute_hour();
        let cycle_hours = self.cycle_hours();
        let cycle = hour.div_euclid(cycle_hours);
        let offset = hour - cycle * cycle_hours;
        let current = self.pattern_for_cycle(region_id, cycle);

        let half = f64::from(self.blend_hours) / 2.0;
        let mut temp_modifier = current.kind.traits().temp_modifier;
        let mut pressure_offset = current.kind.pressure_offset();
        if half > 0.0 {
            let since_start = offset as f64;
            let until_end = (cycle_hours - offset) as f64;
            let neighbour = if since_start < half {
                Some((self.pattern_for_cycle(region_id, cycle - 1), since_start))
            } else if until_end <= half {
                Some((self.pattern_for_cycle(region_id, cycle + 1), until_end))
            } else {
                None
            };
            if let Some((other, distance)) = neighbour {
                let own = 0.5 + 0.5 * (distance / half);
                temp_modifier = lerp(other.kind.traits().temp_modifier, temp_modifier, own);
                pressure_offset = lerp(other.kind.pressure_offset(), pressure_offset, own);
            }
        }

        PatternSnapshot {
            kind: current.kind,
            cycle,
            day_in_cycle: (offset / 24) as u32 + 1,
            total_days: current.total_days,
            temp_modifier,
            pressure_offset,
        }
    }

    pub fn invalidate(&self, region_id: &str) {
        self.cycles.retain(|(id, _)| id != region_id);
    }

    pub fn clear(&self) {
        self.cycles.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cycles.stats()
    }

    fn repeat_limit(&self) -> u32 {
        self.fatigue.len() as u32
    }

    fn cycle_rng(&self, region_id: &str, cycle: i64) -> SeededRandom {
        SeededRandom::new(cycle_seed(
            region_id,
            cycle,
            self.cycle_days,
            PATTERN_CONTEXT,
        ))
    }

    /// Capped state left behind by `cycle`.
    fn settled(&self, region_id: &str, cycle: i64) -> ChainState {
        let limit = self.repeat_limit();
        let mut depth = self.settle_cycles;
        loop {
            let mut states = ChainState::every(limit);
            for index in cycle - depth + 1..=cycle {
                let roll = self.cycle_rng(region_id, index).next();
                let mut next: Vec<ChainState> = Vec::with_capacity(states.len());
                for state in &states {
                    let stepped = state.followed_by(self.choose(state, roll), limit);
                    if !next.contains(&stepped) {
                        next.push(stepped);
                    }
                }
                states = next;
            }
            match states.as_slice() {
                [settled] => return *settled,
                [first, ..] if depth >= SETTLE_LIMIT => {
                    tracing::debug!(
                        region = region_id,
                        cycle,
                        candidates = states.len(),
                        "pattern chain did not settle"
                    );
                    return *first;
                }
                [] => {
                    return ChainState {
                        kind: PatternKind::Stable,
                        repeat: 1,
                        wet_run: 0,
                    }
                }
                _ => depth *= 2,
            }
        }
    }

    fn draw(&self, region_id: &str, cycle: i64) -> CyclePattern {
        let previous = self.settled(region_id, cycle - 1);
        let mut rng = self.cycle_rng(region_id, cycle);
        let kind = self.choose(&previous, rng.next());
        let (min, max) = kind.duration_range();
        let total_days = rng.int(i64::from(min), i64::from(max)) as u32;

        // Uncapped counters come from the cached predecessor; the recursion only
        // runs as long as the current run.
        let repeat = if kind == previous.kind {
            self.pattern_for_cycle(region_id, cycle - 1).repeat + 1
        } else {
            1
        };
        let wet_run = match (kind.is_wet(), previous.wet_run > 0) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => self.pattern_for_cycle(region_id, cycle - 1).wet_run + 1,
        };
        CyclePattern {
            kind,
            cycle,
            total_days,
            repeat,
            wet_run,
        }
    }

    fn choose(&self, previous: &ChainState, roll: f64) -> PatternKind {
        PatternKind::ALL[weighted_choice(&self.transition_weights(previous), roll)]
    }

    fn transition_weights(&self, previous: &ChainState) -> [f64; 5] {
        let mut weights = TRANSITIONS[previous.kind.index()];
        let fatigue_index = (previous.repeat.max(1) as usize - 1).min(self.fatigue.len() - 1);
        weights[previous.kind.index()] *= self.fatigue[fatigue_index];
        if previous.wet_run >= WET_RUN_LIMIT {
            for kind in PatternKind::ALL {
                if kind.is_wet() {
                    weights[kind.index()] *= WET_RUN_PENALTY;
                }
            }
        }
        weights
    }
}

fn lerp(from: f64, to: f64, weight: f64) -> f64 {
    from + (to - from) * weight
}
