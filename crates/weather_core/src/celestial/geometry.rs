//! Flat-disc celestial geometry.
//!
//! The world is a disc with the observer at `R_obs` from the centre and angle
//! `θ_obs`. Sun and moon are point lights circling the centre; how lit the sky
//! is depends only on the straight-line distance from observer to body.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

pub const SUN_MEAN_RADIUS: f64 = 6_000.0;
pub const SUN_RADIUS_AMPLITUDE: f64 = 1_800.0;
pub const MOON_ORBIT_RADIUS: f64 = 5_000.0;
pub const SUN_PERIOD_HOURS: f64 = 24.0;
pub const MOON_PERIOD_HOURS: f64 = 24.8;
/// Puts the sun over `θ_obs = 0` at noon.
pub const DEFAULT_SUN_PHASE: f64 = 180.0;
pub const DEFAULT_MOON_PHASE: f64 = 0.0;
pub const DEFAULT_OBSERVER_ANGLE: f64 = 0.0;

pub const DAYLIGHT_DISTANCE: f64 = 7_500.0;
pub const CIVIL_DISTANCE: f64 = 8_100.0;
pub const NAUTICAL_DISTANCE: f64 = 8_700.0;
pub const ASTRONOMICAL_DISTANCE: f64 = 9_300.0;

pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Sun angle at a (fractional) hour of the day.
pub fn sun_angle(hour: f64, phase: f64) -> f64 {
    normalize_degrees(360.0 / SUN_PERIOD_HOURS * hour + phase)
}

/// Moon angle after `hours` elapsed hours. The hour count is reduced modulo the
/// orbital period first so large absolute counts keep their precision.
pub fn moon_angle(hours: f64, phase: f64) -> f64 {
    let within_orbit = hours.rem_euclid(MOON_PERIOD_HOURS);
    normalize_degrees(360.0 / MOON_PERIOD_HOURS * within_orbit + phase)
}

/// Seasonal orbital radius standing in for axial tilt; smallest near midsummer.
pub fn sun_radius(day_of_year: u16) -> f64 {
    SUN_MEAN_RADIUS + SUN_RADIUS_AMPLITUDE * (TAU * f64::from(day_of_year) / 365.0).cos()
}

/// Law of cosines distance between observer and body.
pub fn distance(
    observer_radius: f64,
    body_radius: f64,
    body_angle: f64,
    observer_angle: f64,
) -> f64 {
    let delta = (body_angle - observer_angle).to_radians();
    let squared = observer_radius * observer_radius + body_radius * body_radius
        - 2.0 * observer_radius * body_radius * delta.cos();
    squared.max(0.0).sqrt()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TwilightLevel {
    Daylight,
    CivilTwilight,
    NauticalTwilight,
    AstronomicalTwilight,
    Night,
}

impl TwilightLevel {
    pub fn from_distance(distance: f64) -> Self {
        if distance <= DAYLIGHT_DISTANCE {
            Self::Daylight
        } else if distance <= CIVIL_DISTANCE {
            Self::CivilTwilight
        } else if distance <= NAUTICAL_DISTANCE {
            Self::NauticalTwilight
        } else if distance <= ASTRONOMICAL_DISTANCE {
            Self::AstronomicalTwilight
        } else {
            Self::Night
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Daylight => "daylight",
            Self::CivilTwilight => "civil twilight",
            Self::NauticalTwilight => "nautical twilight",
            Self::AstronomicalTwilight => "astronomical twilight",
            Self::Night => "night",
        }
    }
}

/// Angle from moon to sun; 0° is new, 180° is full.
pub fn phase_angle(sun_angle: f64, moon_angle: f64) -> f64 {
    normalize_degrees(sun_angle - moon_angle)
}

pub fn illumination_percent(phase_angle: f64) -> f64 {
    50.0 * (1.0 - phase_angle.to_radians().cos())
}

pub fn is_waxing(phase_angle: f64) -> bool {
    phase_angle > 0.0 && phase_angle < 180.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseName {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl PhaseName {
    /// 45° sectors centred on new, quarter and full.
    pub fn from_angle(phase_angle: f64) -> Self {
        let sector = ((normalize_degrees(phase_angle) + 22.5) / 45.0).floor() as u32 % 8;
        match sector {
            0 => Self::NewMoon,
            1 => Self::WaxingCrescent,
            2 => Self::FirstQuarter,
            3 => Self::WaxingGibbous,
            4 => Self::FullMoon,
            5 => Self::WaningGibbous,
            6 => Self::LastQuarter,
            _ => Self::WaningCrescent,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NewMoon => "New Moon",
            Self::WaxingCrescent => "Waxing Crescent",
            Self::FirstQuarter => "First Quarter",
            Self::WaxingGibbous => "Waxing Gibbous",
            Self::FullMoon => "Full Moon",
            Self::WaningGibbous => "Waning Gibbous",
            Self::LastQuarter => "Last Quarter",
            Self::WaningCrescent => "Waning Crescent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sun_is_overhead_at_noon() {
        assert!((sun_angle(12.0, DEFAULT_SUN_PHASE) - 0.0).abs() < 1e-9);
        assert!((sun_angle(0.0, DEFAULT_SUN_PHASE) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn summer_orbit_is_tighter_than_winter() {
        assert!(sun_radius(172) < sun_radius(355));
        assert!(sun_radius(172) < SUN_MEAN_RADIUS);
    }

    #[test]
    fn distance_matches_collinear_cases() {
        assert!((distance(4_000.0, 6_000.0, 30.0, 30.0) - 2_000.0).abs() < 1e-6);
        assert!((distance(4_000.0, 6_000.0, 210.0, 30.0) - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn phase_names_cover_the_cycle() {
        assert_eq!(PhaseName::from_angle(0.0), PhaseName::NewMoon);
        assert_eq!(PhaseName::from_angle(359.0), PhaseName::NewMoon);
        assert_eq!(PhaseName::from_angle(90.0), PhaseName::FirstQuarter);
        assert_eq!(PhaseName::from_angle(180.0), PhaseName::FullMoon);
        assert_eq!(PhaseName::from_angle(270.0), PhaseName::LastQuarter);
        assert_eq!(PhaseName::from_angle(300.0), PhaseName::WaningCrescent);
    }

    #[test]
    fn illumination_tracks_phase() {
        assert!(illumination_percent(0.0).abs() < 1e-9);
        assert!((illumination_percent(180.0) - 100.0).abs() < 1e-9);
        assert!((illumination_percent(90.0) - 50.0).abs() < 1e-9);
        assert!(is_waxing(90.0));
        assert!(!is_waxing(270.0));
        assert!(!is_waxing(0.0));
    }

    #[test]
    fn twilight_steps_outward() {
        assert_eq!(TwilightLevel::from_distance(100.0), TwilightLevel::Daylight);
        assert_eq!(
            TwilightLevel::from_distance(8_000.0),
            TwilightLevel::CivilTwilight
        );
        assert_eq!(TwilightLevel::from_distance(20_000.0), TwilightLevel::Night);
    }

    proptest! {
        #[test]
        fn normalized_angles_stay_in_range(angle in -1.0e7f64..1.0e7f64) {
            let value = normalize_degrees(angle);
            prop_assert!((0.0..360.0).contains(&value));
        }

        #[test]
        fn moon_angle_is_periodic(hours in 0.0f64..100_000.0) {
            let a = moon_angle(hours, 0.0);
            let b = moon_angle(hours + MOON_PERIOD_HOURS, 0.0);
            let diff = (a - b).abs();
            prop_assert!(diff < 1e-6 || (360.0 - diff) < 1e-6);
        }
    }
}
