use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::cache::{CacheStats, Memo};
use crate::calendar::GameDate;
use crate::region::LatitudeBand;

use super::geometry::{
    distance, sun_angle, sun_radius, TwilightLevel, CIVIL_DISTANCE, DAYLIGHT_DISTANCE,
    DEFAULT_OBSERVER_ANGLE, DEFAULT_SUN_PHASE,
};
use super::roots::find_crossings;

/// Hour-independent solar times for one day.
#[skip_serializing_none]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarDay {
    pub sunrise_hour: Option<f64>,
    pub sunset_hour: Option<f64>,
    pub day_length_hours: f64,
    pub civil_dawn_hour: Option<f64>,
    pub civil_dusk_hour: Option<f64>,
}

/// Result of a sunrise/sunset query at a specific hour.
#[skip_serializing_none]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SunriseSunset {
    pub sunrise_hour: Option<f64>,
    pub sunset_hour: Option<f64>,
    pub day_length_hours: f64,
    pub civil_dawn_hour: Option<f64>,
    pub civil_dusk_hour: Option<f64>,
    pub is_daytime: bool,
    pub twilight_level: TwilightLevel,
}

type DayKey = (LatitudeBand, u16, u64, u64);

#[derive(Debug)]
pub struct SunService {
    step_hours: f64,
    tolerance: f64,
    days: Memo<DayKey, SolarDay>,
}

impl SunService {
    pub fn new(sample_minutes: u32, tolerance: f64) -> Self {
        Self {
            step_hours: f64::from(sample_minutes.max(1)) / 60.0,
            tolerance,
            days: Memo::new("sun-days"),
        }
    }

    /// Sunrise, sunset and day length for the date, plus the illumination at its hour.
    pub fn sunrise_sunset(
        &self,
        band: LatitudeBand,
        date: &GameDate,
        observer_angle: f64,
        sun_phase: f64,
    ) -> SunriseSunset {
        let day = self.solar_day(band, date, observer_angle, sun_phase);
        let hour = f64::from(date.hour);
        let level = self.twilight_level(band, date, hour, observer_angle, sun_phase);
        SunriseSunset {
            sunrise_hour: day.sunrise_hour,
            sunset_hour: day.sunset_hour,
            day_length_hours: day.day_length_hours,
            civil_dawn_hour: day.civil_dawn_hour,
            civil_dusk_hour: day.civil_dusk_hour,
            is_daytime: level == TwilightLevel::Daylight,
            twilight_level: level,
        }
    }

    /// Cached per `(band, day of year, θ_obs, φ_sun)`; the year itself plays no part.
    pub fn solar_day(
        &self,
        band: LatitudeBand,
        date: &GameDate,
        observer_angle: f64,
        sun_phase: f64,
    ) -> SolarDay {
        let key = (
            band,
            date.day_of_year(),
            observer_angle.to_bits(),
            sun_phase.to_bits(),
        );
        self.days.get_or_insert_with(key, || {
            compute_solar_day(
                band,
                date.day_of_year(),
                observer_angle,
                sun_phase,
                self.step_hours,
                self.tolerance,
            )
        })
    }

    pub fn sun_distance(
        &self,
        band: LatitudeBand,
        date: &GameDate,
        hour: f64,
        observer_angle: f64,
        sun_phase: f64,
    ) -> f64 {
        distance(
            band.observer_radius(),
            sun_radius(date.day_of_year()),
            sun_angle(hour, sun_phase),
            observer_angle,
        )
    }

    pub fn twilight_level(
        &self,
        band: LatitudeBand,
        date: &GameDate,
        hour: f64,
        observer_angle: f64,
        sun_phase: f64,
    ) -> TwilightLevel {
        TwilightLevel::from_distance(self.sun_distance(band, date, hour, observer_angle, sun_phase))
    }

    pub fn is_daytime(
        &self,
        band: LatitudeBand,
        date: &GameDate,
        observer_angle: f64,
        sun_phase: f64,
    ) -> bool {
        self.twilight_level(band, date, f64::from(date.hour), observer_angle, sun_phase)
            == TwilightLevel::Daylight
    }

    pub fn stats(&self) -> CacheStats {
        self.days.stats()
    }

    pub fn clear(&self) {
        self.days.clear();
    }
}

/// Daylight at the date's hour for an observer at the default angle and phase.
pub fn is_daylight(band: LatitudeBand, date: &GameDate) -> bool {
    let d = distance(
        band.observer_radius(),
        sun_radius(date.day_of_year()),
        sun_angle(f64::from(date.hour), DEFAULT_SUN_PHASE),
        DEFAULT_OBSERVER_ANGLE,
    );
    TwilightLevel::from_distance(d) == TwilightLevel::Daylight
}

fn compute_solar_day(
    band: LatitudeBand,
    day_of_year: u16,
    observer_angle: f64,
    sun_phase: f64,
    step: f64,
    tolerance: f64,
) -> SolarDay {
    let observer_radius = band.observer_radius();
    let orbit = sun_radius(day_of_year);
    let lit_margin = |threshold: f64| {
        move |hour: f64| {
            threshold - distance(observer_radius, orbit, sun_angle(hour, sun_phase), observer_angle)
        }
    };

    let (sunrise_hour, sunset_hour, day_length_hours) =
        rise_and_set(lit_margin(DAYLIGHT_DISTANCE), step, tolerance);
    let (civil_dawn_hour, civil_dusk_hour, _) =
        rise_and_set(lit_margin(CIVIL_DISTANCE), step, tolerance);

    tracing::trace!(
        band = band.label(),
        day_of_year,
        ?sunrise_hour,
        ?sunset_hour,
        day_length_hours,
        "solar day computed"
    );

    SolarDay {
        sunrise_hour,
        sunset_hour,
        day_length_hours,
        civil_dawn_hour,
        civil_dusk_hour,
    }
}

/// First upward crossing, last downward crossing and the lit span between them.
fn rise_and_set<F>(margin: F, step: f64, tolerance: f64) -> (Option<f64>, Option<f64>, f64)
where
    F: Fn(f64) -> f64,
{
    let crossings = find_crossings(&margin, 0.0, 24.0, step, tolerance);
    let rise = crossings.iter().find(|c| c.rising).map(|c| c.hour);
    let set = crossings.iter().rev().find(|c| !c.rising).map(|c| c.hour);
    let length = match (rise, set) {
        (Some(rise), Some(set)) if set > rise => set - rise,
        (Some(rise), Some(set)) => 24.0 - (rise - set),
        (Some(rise), None) => 24.0 - rise,
        (None, Some(set)) => set,
        (None, None) => {
            if margin(0.0) >= 0.0 {
                24.0
            } else {
                0.0
            }
        }
    };
    (rise, set, length)
}
