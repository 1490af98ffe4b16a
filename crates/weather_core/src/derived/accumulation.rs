//! Snow and ice on the ground, rebuilt by replaying the recent hourly record.
//!
//! The replay starts from bare ground `accumulation_lookback_days` before the
//! query and steps forward through snowfall, sleet, glaze, melt and
//! compaction. Depths are inches; water equivalent is inches of water.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::cache::{CacheStats, Memo};
use crate::calendar::GameDate;
use crate::celestial::sun::is_daylight;
use crate::config::Tuning;
use crate::region::{LatitudeBand, RegionProfile};
use crate::weather::{HourRecord, Intensity, PrecipitationType, WeatherGenerator};

use super::ground::FREEZING;

/// Snowfall rate at 10:1, inches per hour.
const SNOW_RATES: [f64; 3] = [0.2, 0.6, 1.5];
/// Freezing rain glaze, inches per hour.
const GLAZE_RATES: [f64; 3] = [0.02, 0.05, 0.10];
const SNOW_RATIO: f64 = 10.0;
const COLD_SNOW_RATIO: f64 = 15.0;
const COLD_SNOW_BELOW: f64 = 15.0;
const SLEET_SHARE: f64 = 0.1;
const SLEET_RATIO: f64 = 3.0;
/// Inches of water melted per degree-hour above freezing.
const DEGREE_HOUR_MELT: f64 = 0.006;
const DAYLIGHT_MELT_BOOST: f64 = 1.5;
const RAIN_ON_SNOW_MELT: f64 = 0.01;
const ICE_MELT: f64 = 0.002;
const COMPACTION_PER_HOUR: f64 = 0.002;
const MAX_DENSITY: f64 = 0.4;
const TRACE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceCondition {
    Dry,
    Wet,
    Icy,
    Slush,
    Dusting,
    SnowCovered,
    DeepSnow,
}

impl SurfaceCondition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dry => "dry",
            Self::Wet => "wet",
            Self::Icy => "icy",
            Self::Slush => "slushy",
            Self::Dusting => "dusted with snow",
            Self::SnowCovered => "snow covered",
            Self::DeepSnow => "deep snow",
        }
    }
}

#[skip_serializing_none]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnowIceState {
    pub snow_depth: f64,
    pub snow_water_equivalent: f64,
    pub ice_thickness: f64,
    /// Water equivalent over depth, 0 when bare.
    pub density: f64,
    pub fresh_snow_24h: f64,
    /// Water equivalent released by melt in the last 72 hours.
    pub melt_72h: f64,
    pub hours_since_snowfall: Option<u32>,
    pub surface: SurfaceCondition,
}

impl SnowIceState {
    pub fn bare() -> Self {
        Self {
            snow_depth: 0.0,
            snow_water_equivalent: 0.0,
            ice_thickness: 0.0,
            density: 0.0,
            fresh_snow_24h: 0.0,
            melt_72h: 0.0,
            hours_since_snowfall: None,
            surface: SurfaceCondition::Dry,
        }
    }
}

fn rate_index(intensity: Option<Intensity>) -> usize {
    match intensity {
        Some(Intensity::Heavy) => 2,
        Some(Intensity::Moderate) => 1,
        _ => 0,
    }
}

/// Replay `records` (oldest first) from bare ground.
pub fn replay(records: &[HourRecord], band: LatitudeBand) -> SnowIceState {
    let mut depth = 0.0f64;
    let mut swe = 0.0f64;
    let mut ice = 0.0f64;
    let mut since_snow: Option<u32> = None;
    let total = records.len();
    let mut fresh_24h = 0.0;
    let mut melt_72h = 0.0;

    for (index, record) in records.iter().enumerate() {
        let remaining = total - index;
        let temperature = record.temperature;
        let precipitation = record.precipitation;
        let rate = rate_index(precipitation.intensity);

        since_snow = since_snow.map(|hours| hours + 1);
        match precipitation.kind {
            PrecipitationType::Snow => {
                let water = SNOW_RATES[rate] / SNOW_RATIO;
                let ratio = if temperature < COLD_SNOW_BELOW {
                    COLD_SNOW_RATIO
                } else {
                    SNOW_RATIO
                };
                depth += water * ratio;
                swe += water;
                since_snow = Some(0);
                if remaining <= 24 {
                    fresh_24h += water * ratio;
                }
            }
            PrecipitationType::Sleet => {
                let pellets = SLEET_SHARE * SNOW_RATES[rate];
                depth += pellets;
                swe += pellets / SLEET_RATIO;
            }
            PrecipitationType::FreezingRain => {
                ice += GLAZE_RATES[rate];
            }
            PrecipitationType::Rain | PrecipitationType::None => {}
        }

        if temperature > FREEZING {
            let date = GameDate::from_absolute_hour(record.absolute_hour);
            let boost = if is_daylight(band, &date) {
                DAYLIGHT_MELT_BOOST
            } else {
                1.0
            };
            let mut potential = DEGREE_HOUR_MELT * (temperature - FREEZING) * boost;
            if precipitation.kind == PrecipitationType::Rain {
                potential += RAIN_ON_SNOW_MELT;
            }
            let melted = potential.min(swe);
            if melted > 0.0 && swe > 0.0 {
                depth *= (swe - melted) / swe;
                swe -= melted;
                if remaining <= 72 {
                    melt_72h += melted;
                }
            }
            ice = (ice - ICE_MELT * (temperature - FREEZING) * boost).max(0.0);
        }

        if depth > 0.0 {
            let compacted = depth * (1.0 - COMPACTION_PER_HOUR);
            depth = compacted.max(swe / MAX_DENSITY).min(depth);
        }
        if swe < TRACE || depth < TRACE {
            depth = 0.0;
            swe = 0.0;
        }
    }

    let last = records.last();
    let surface = classify_surface(depth, ice, last);
    SnowIceState {
        snow_depth: depth,
        snow_water_equivalent: swe,
        ice_thickness: ice,
        density: if depth > 0.0 { swe / depth } else { 0.0 },
        fresh_snow_24h: fresh_24h,
        melt_72h,
        hours_since_snowfall: since_snow,
        surface,
    }
}

fn classify_surface(depth: f64, ice: f64, last: Option<&HourRecord>) -> SurfaceCondition {
    let temperature = last.map_or(FREEZING, |record| record.temperature);
    let raining = last.map_or(false, |record| {
        matches!(record.precipitation.kind, PrecipitationType::Rain)
    });
    if depth >= 12.0 {
        SurfaceCondition::DeepSnow
    } else if depth >= 2.0 {
        SurfaceCondition::SnowCovered
    } else if depth > 0.0 && temperature > FREEZING {
        SurfaceCondition::Slush
    } else if depth >= 0.1 {
        SurfaceCondition::Dusting
    } else if ice >= 0.01 {
        SurfaceCondition::Icy
    } else if raining {
        SurfaceCondition::Wet
    } else {
        SurfaceCondition::Dry
    }
}

#[derive(Debug)]
pub struct AccumulationService {
    lookback_hours: u32,
    states: Memo<(String, i64), SnowIceState>,
}

impl AccumulationService {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            lookback_hours: tuning.accumulation_lookback_days.max(1) * 24,
            states: Memo::bounded("accumulation", tuning.derived_cache_capacity),
        }
    }

    pub fn state(
        &self,
        generator: &WeatherGenerator,
        region: &RegionProfile,
        date: &GameDate,
    ) -> SnowIceState {
        let key = (region.id.clone(), date.absolute_hour());
        self.states.get_or_insert_with(key, || {
            let history = generator.history(region, date, self.lookback_hours);
            replay(&history, region.latitude_band)
        })
    }

    pub fn invalidate(&self, region_id: &str) {
        self.states.retain(|(id, _)| id != region_id);
    }

    pub fn clear(&self) {
        self.states.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.states.stats()
    }
}
