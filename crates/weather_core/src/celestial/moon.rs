use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::cache::{CacheStats, Memo};
use crate::calendar::GameDate;

use super::geometry::{
    illumination_percent, is_waxing, moon_angle, phase_angle, sun_angle, PhaseName,
};
use super::roots::find_crossings;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarPhase {
    pub phase_angle: f64,
    pub phase_name: PhaseName,
    pub illumination: f64,
    pub is_waxing: bool,
}

/// Rise and set hours within one day; either may be absent because the
/// 24.8 h orbit slips past the day boundary once a month.
#[skip_serializing_none]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonTimes {
    pub moonrise_hour: Option<f64>,
    pub moonset_hour: Option<f64>,
}

type MoonKey = (i64, u64, u64);

#[derive(Debug)]
pub struct MoonService {
    step_hours: f64,
    tolerance: f64,
    times: Memo<MoonKey, MoonTimes>,
}

impl MoonService {
    pub fn new(sample_minutes: u32, tolerance: f64) -> Self {
        Self {
            step_hours: f64::from(sample_minutes.max(1)) / 60.0,
            tolerance,
            times: Memo::new("moon-times"),
        }
    }

    pub fn lunar_phase(&self, date: &GameDate, moon_phase: f64, sun_phase: f64) -> LunarPhase {
        let sun = sun_angle(f64::from(date.hour), sun_phase);
        let moon = moon_angle(date.absolute_hour() as f64, moon_phase);
        let angle = phase_angle(sun, moon);
        LunarPhase {
            phase_angle: angle,
            phase_name: PhaseName::from_angle(angle),
            illumination: illumination_percent(angle),
            is_waxing: is_waxing(angle),
        }
    }

    pub fn moon_rise_set(
        &self,
        date: &GameDate,
        observer_angle: f64,
        moon_phase: f64,
    ) -> MoonTimes {
        let day = date.absolute_day();
        let key = (day, observer_angle.to_bits(), moon_phase.to_bits());
        self.times.get_or_insert_with(key, || {
            let day_start = (day * 24) as f64;
            let above_horizon = |hour: f64| {
                (moon_angle(day_start + hour, moon_phase) - observer_angle)
                    .to_radians()
                    .cos()
            };
            let crossings =
                find_crossings(above_horizon, 0.0, 24.0, self.step_hours, self.tolerance);
            MoonTimes {
                moonrise_hour: crossings.iter().find(|c| c.rising).map(|c| c.hour),
                moonset_hour: crossings.iter().find(|c| !c.rising).map(|c| c.hour),
            }
        })
    }

    /// Whether the moon is above the observer's horizon at the date's hour.
    pub fn is_up(&self, date: &GameDate, observer_angle: f64, moon_phase: f64) -> bool {
        let angle = moon_angle(date.absolute_hour() as f64, moon_phase);
        (angle - observer_angle).to_radians().cos() >= 0.0
    }

    pub fn stats(&self) -> CacheStats {
        self.times.stats()
    }

    pub fn clear(&self) {
        self.times.clear();
    }
}
