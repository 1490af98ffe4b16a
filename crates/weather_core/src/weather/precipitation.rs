//! Precipitation occurrence, intensity and type.
//!
//! Occurrence is a two-state hourly chain (dry or wet) whose probabilities are
//! scaled by regional modifiers and by streak fatigue. Type is resolved with
//! hysteresis from the recent type history so it does not flap around the
//! freezing point. The stateful walk over hours lives in `timeline`; the
//! functions here are the per-hour rules it applies.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::calendar::{GameDate, Season};
use crate::config::StreakCaps;
use crate::region::RegionProfile;
use crate::rng::{self, SeededRandom};

use super::pattern::PatternKind;

const START_SCALE: f64 = 0.12;
const CONTINUE_BASE: f64 = 0.55;
const CONTINUE_SCALE: f64 = 0.35;
const MAX_PROBABILITY: f64 = 0.95;
/// Upper cumulative bound for a moderate block once heavy has been ruled out.
const MODERATE_CEILING: f64 = 0.55;
pub const INTENSITY_BLOCK_HOURS: i64 = 3;

/// Always snow at or below this temperature (°F).
pub const SNOW_LINE: f64 = 22.0;
/// Always rain at or above this temperature (°F).
pub const RAIN_LINE: f64 = 45.0;
const SNOW_HOLD_CEILING: f64 = 36.0;
const SNOW_RELEASE: f64 = 34.0;
const RAIN_HOLD_FLOOR: f64 = 30.0;
const RAIN_RELEASE: f64 = 32.0;
const BUFFER_TO_SNOW: f64 = 28.0;
const BUFFER_TO_RAIN: f64 = 38.0;
const FRESH_SNOW_BELOW: f64 = 30.0;
const FRESH_RAIN_ABOVE: f64 = 36.0;
const ESTABLISHED_STREAK: usize = 3;
const TREND_STEP: f64 = 0.1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrecipitationType {
    #[default]
    None,
    Rain,
    Snow,
    Sleet,
    FreezingRain,
}

impl PrecipitationType {
    pub fn is_wet(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Sleet and freezing rain sit between rain and snow.
    pub fn is_mixed(&self) -> bool {
        matches!(self, Self::Sleet | Self::FreezingRain)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Sleet => "sleet",
            Self::FreezingRain => "freezing rain",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intensity {
    Light,
    Moderate,
    Heavy,
}

#[skip_serializing_none]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precipitation {
    pub kind: PrecipitationType,
    pub intensity: Option<Intensity>,
}

impl Precipitation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn wet(kind: PrecipitationType, intensity: Intensity) -> Self {
        if kind.is_wet() {
            Self {
                kind,
                intensity: Some(intensity),
            }
        } else {
            Self::none()
        }
    }

    pub fn is_wet(&self) -> bool {
        self.kind.is_wet()
    }

    pub fn is_heavy(&self) -> bool {
        self.is_wet() && self.intensity == Some(Intensity::Heavy)
    }
}

/// Multiplier on occurrence from aridity factors, humidity, season and time of day.
pub fn occurrence_modifier(region: &RegionProfile, date: &GameDate) -> f64 {
    let mut modifier = 1.0;

    let dry_air = region.factor_or("dryAir", 0.0).clamp(0.0, 1.0);
    modifier *= 1.0 - 0.5 * dry_air;
    if region.flag("permafrost") {
        modifier *= 0.7;
    }
    if region.flag("coldOceanCurrent") {
        modifier *= 0.6;
    }
    let rain_shadow = region.factor_or("rainShadow", 0.0).clamp(0.0, 1.0);
    modifier *= 1.0 - 0.5 * rain_shadow;

    let (humidity, _) = region.humidity_stats(date);
    modifier *= if humidity.mean < 30.0 {
        0.6
    } else if humidity.mean < 50.0 {
        0.85
    } else if humidity.mean > 75.0 {
        1.2
    } else {
        1.0
    };

    let season = date.season(region.latitude);
    if region.flag("monsoon") {
        modifier *= match season {
            Season::Summer => 2.0,
            Season::Winter => 0.4,
            _ => 1.0,
        };
    }
    if region.flag("drySeason") && season == Season::Winter {
        modifier *= 0.3;
    }
    if region.flag("mediterranean") {
        modifier *= match season {
            Season::Summer => 0.3,
            Season::Winter => 1.3,
            _ => 1.0,
        };
    }

    // Convection favours the afternoon everywhere but the poles.
    if region.latitude.abs() < 60.0 {
        modifier *= match date.hour {
            13..=18 => 1.2,
            0..=5 => 0.9,
            _ => 1.0,
        };
    }

    modifier.max(0.0)
}

/// Probability multiplier once a wet streak passes its soft cap.
pub fn streak_fatigue(streak: u32, caps: StreakCaps, decay: f64, floor: f64) -> f64 {
    if streak <= caps.soft {
        return 1.0;
    }
    let span = f64::from(caps.hard.saturating_sub(caps.soft).max(1));
    let excess = f64::from(streak - caps.soft);
    (-decay * excess / span).exp().max(floor)
}

pub fn start_probability(chance: f64, modifier: f64) -> f64 {
    (START_SCALE * chance * modifier).clamp(0.0, MAX_PROBABILITY)
}

pub fn continue_probability(chance: f64, modifier: f64, fatigue: f64) -> f64 {
    ((CONTINUE_BASE + CONTINUE_SCALE * chance) * modifier * fatigue).clamp(0.0, MAX_PROBABILITY)
}

/// Intensity shared by every hour of a three-hour block.
pub fn block_intensity(region_id: &str, absolute_hour: i64, pattern: PatternKind) -> Intensity {
    let block = absolute_hour.div_euclid(INTENSITY_BLOCK_HOURS);
    let block_start = GameDate::from_absolute_hour(block * INTENSITY_BLOCK_HOURS);
    let mut stream = rng::stream(
        region_id,
        &block_start,
        &format!("intensity:{}", block_start.hour),
    );
    let roll = stream.next();
    let heavy = pattern.heavy_chance();
    if roll < heavy {
        Intensity::Heavy
    } else if roll < MODERATE_CEILING {
        Intensity::Moderate
    } else {
        Intensity::Light
    }
}

/// One hour of type history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypeSample {
    pub kind: PrecipitationType,
    pub temperature: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Warming,
    Cooling,
    Steady,
}

/// Sustained when each of the last `hours` hourly changes moves the same way.
pub fn sustained_trend(temperatures: &[f64], hours: usize) -> Trend {
    if hours == 0 || temperatures.len() < hours + 1 {
        return Trend::Steady;
    }
    let recent = &temperatures[temperatures.len() - hours - 1..];
    let deltas = recent.windows(2).map(|pair| pair[1] - pair[0]);
    let (mut warming, mut cooling) = (true, true);
    for delta in deltas {
        warming &= delta > TREND_STEP;
        cooling &= delta < -TREND_STEP;
    }
    if warming {
        Trend::Warming
    } else if cooling {
        Trend::Cooling
    } else {
        Trend::Steady
    }
}

/// Most recent wet type in the window and how many wet hours of it run back
/// from there, skipping dry hours.
pub fn recent_wet(history: &[TypeSample]) -> Option<(PrecipitationType, usize)> {
    let mut wet = history.iter().rev().filter(|sample| sample.kind.is_wet());
    let last = wet.next()?.kind;
    let streak = 1 + wet.take_while(|sample| sample.kind == last).count();
    Some((last, streak))
}

/// Resolve the type of a wet hour from its temperature and the preceding
/// `history` (oldest first, not including this hour).
pub fn resolve_type(
    temperature: f64,
    history: &[TypeSample],
    trend_hours: usize,
    rng: &mut SeededRandom,
) -> PrecipitationType {
    let recent = recent_wet(history);
    let candidate = candidate_type(temperature, history, recent, trend_hours, rng);
    guard_transition(candidate, recent.map(|(kind, _)| kind))
}

fn candidate_type(
    temperature: f64,
    history: &[TypeSample],
    recent: Option<(PrecipitationType, usize)>,
    trend_hours: usize,
    rng: &mut SeededRandom,
) -> PrecipitationType {
    if temperature <= SNOW_LINE {
        return PrecipitationType::Snow;
    }
    if temperature >= RAIN_LINE {
        return PrecipitationType::Rain;
    }

    let mut temperatures: Vec<f64> = history.iter().map(|sample| sample.temperature).collect();
    temperatures.push(temperature);
    let trend = sustained_trend(&temperatures, trend_hours);

    match recent {
        Some((PrecipitationType::Snow, streak)) if streak >= ESTABLISHED_STREAK => {
            if (trend == Trend::Warming && temperature >= SNOW_RELEASE)
                || temperature > SNOW_HOLD_CEILING
            {
                PrecipitationType::Sleet
            } else {
                PrecipitationType::Snow
            }
        }
        Some((PrecipitationType::Rain, streak)) if streak >= ESTABLISHED_STREAK => {
            if (trend == Trend::Cooling && temperature <= RAIN_RELEASE)
                || temperature < RAIN_HOLD_FLOOR
            {
                mixed(rng)
            } else {
                PrecipitationType::Rain
            }
        }
        Some((buffer, _)) if buffer.is_mixed() => {
            if trend == Trend::Cooling && temperature < BUFFER_TO_SNOW {
                PrecipitationType::Snow
            } else if trend == Trend::Warming && temperature > BUFFER_TO_RAIN {
                PrecipitationType::Rain
            } else {
                buffer
            }
        }
        _ => fresh_type(temperature, rng),
    }
}

fn fresh_type(temperature: f64, rng: &mut SeededRandom) -> PrecipitationType {
    if temperature < FRESH_SNOW_BELOW {
        PrecipitationType::Snow
    } else if temperature > FRESH_RAIN_ABOVE {
        PrecipitationType::Rain
    } else {
        mixed(rng)
    }
}

fn mixed(rng: &mut SeededRandom) -> PrecipitationType {
    if rng.chance(0.5) {
        PrecipitationType::Sleet
    } else {
        PrecipitationType::FreezingRain
    }
}

/// Rain never follows snow directly, nor snow rain; the hour becomes sleet.
pub fn guard_transition(
    candidate: PrecipitationType,
    last_wet: Option<PrecipitationType>,
) -> PrecipitationType {
    match (last_wet, candidate) {
        (Some(PrecipitationType::Rain), PrecipitationType::Snow)
        | (Some(PrecipitationType::Snow), PrecipitationType::Rain) => PrecipitationType::Sleet,
        _ => candidate,
    }
}
