pub mod geometry;
pub mod moon;
pub mod roots;
pub mod sun;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::calendar::GameDate;
use crate::region::LatitudeBand;

use geometry::{moon_angle, sun_angle, sun_radius, PhaseName, TwilightLevel, MOON_ORBIT_RADIUS};
use moon::MoonService;
use sun::SunService;

/// Observer-relative parameters for celestial queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observer {
    pub band: LatitudeBand,
    pub observer_angle: f64,
    pub sun_phase: f64,
    pub moon_phase: f64,
}

impl Observer {
    pub fn new(band: LatitudeBand) -> Self {
        Self {
            band,
            observer_angle: geometry::DEFAULT_OBSERVER_ANGLE,
            sun_phase: geometry::DEFAULT_SUN_PHASE,
            moon_phase: geometry::DEFAULT_MOON_PHASE,
        }
    }
}

/// Everything about the sky at one hour.
#[skip_serializing_none]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CelestialState {
    pub sun_angle: f64,
    pub moon_angle: f64,
    pub sun_orbit_radius: f64,
    pub moon_orbit_radius: f64,
    pub sun_distance: f64,
    pub twilight_level: TwilightLevel,
    pub is_daytime: bool,
    pub sunrise_hour: Option<f64>,
    pub sunset_hour: Option<f64>,
    pub day_length_hours: f64,
    pub moonrise_hour: Option<f64>,
    pub moonset_hour: Option<f64>,
    pub moon_visible: bool,
    pub phase_angle: f64,
    pub phase_name: PhaseName,
    pub illumination: f64,
    pub is_waxing: bool,
}

pub fn celestial_state(
    sun: &SunService,
    moon: &MoonService,
    observer: &Observer,
    date: &GameDate,
) -> CelestialState {
    let hour = f64::from(date.hour);
    let day = sun.solar_day(observer.band, date, observer.observer_angle, observer.sun_phase);
    let sun_distance = sun.sun_distance(
        observer.band,
        date,
        hour,
        observer.observer_angle,
        observer.sun_phase,
    );
    let twilight_level = TwilightLevel::from_distance(sun_distance);
    let times = moon.moon_rise_set(date, observer.observer_angle, observer.moon_phase);
    let phase = moon.lunar_phase(date, observer.moon_phase, observer.sun_phase);

    CelestialState {
        sun_angle: sun_angle(hour, observer.sun_phase),
        moon_angle: moon_angle(date.absolute_hour() as f64, observer.moon_phase),
        sun_orbit_radius: sun_radius(date.day_of_year()),
        moon_orbit_radius: MOON_ORBIT_RADIUS,
        sun_distance,
        twilight_level,
        is_daytime: twilight_level == TwilightLevel::Daylight,
        sunrise_hour: day.sunrise_hour,
        sunset_hour: day.sunset_hour,
        day_length_hours: day.day_length_hours,
        moonrise_hour: times.moonrise_hour,
        moonset_hour: times.moonset_hour,
        moon_visible: moon.is_up(date, observer.observer_angle, observer.moon_phase),
        phase_angle: phase.phase_angle,
        phase_name: phase.phase_name,
        illumination: phase.illumination,
        is_waxing: phase.is_waxing,
    }
}
