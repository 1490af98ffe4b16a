use serde::{Deserialize, Serialize};

use crate::calendar::GameDate;
use crate::celestial::geometry::normalize_degrees;
use crate::region::RegionProfile;
use crate::rng::{self, SeededRandom};

use super::pattern::PatternKind;

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];
const DIRECTION_NOISE: f64 = 25.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wind {
    /// mph.
    pub speed: f64,
    pub gust: f64,
    /// Degrees the wind blows from.
    pub direction: f64,
    pub cardinal: String,
}

pub fn cardinal(direction: f64) -> &'static str {
    let index = ((normalize_degrees(direction) + 11.25) / 22.5).floor() as usize % COMPASS.len();
    COMPASS[index]
}

fn daily_base(region: &RegionProfile, day: &GameDate) -> f64 {
    let mut stream = rng::stream(&region.id, day, "wind-base");
    let high_winds = region.factor_or("highWinds", 0.0).clamp(0.0, 2.0);
    6.0 + 8.0 * stream.next() + 10.0 * high_winds + 4.0 * region.maritime()
}

/// Sustained wind before any storm boost.
pub fn base_speed(region: &RegionProfile, date: &GameDate, pattern: PatternKind) -> f64 {
    let today = date.start_of_day();
    let start = daily_base(region, &today);
    let end = daily_base(region, &today.advance(24));
    let smoothed = start + (end - start) * f64::from(date.hour) / 24.0;

    let diurnal = match date.hour {
        12..=17 => 1.2,
        0..=5 => 0.85,
        _ => 1.0,
    };
    let terrain = 1.0 - 0.3 * region.roughness();
    let mut hourly = rng::stream(&region.id, date, &format!("wind:{}", date.hour));
    let jitter = 1.0 + 0.1 * hourly.signed();

    (smoothed * pattern.traits().wind_multiplier * diurnal * terrain * jitter).max(0.0)
}

pub fn direction(region: &RegionProfile, date: &GameDate, pattern: PatternKind) -> f64 {
    let mut stream = rng::stream(&region.id, date, &format!("wind-direction:{}", date.hour));
    let mut prevailing = region.latitude_band.prevailing_wind();
    if region.is_southern() {
        prevailing = 360.0 - prevailing;
    }
    normalize_degrees(prevailing + pattern.wind_veer() + stream.signed() * DIRECTION_NOISE)
}

pub fn build(region: &RegionProfile, date: &GameDate, pattern: PatternKind, speed: f64) -> Wind {
    let mut stream = rng::stream(&region.id, date, &format!("gust:{}", date.hour));
    let direction = direction(region, date, pattern);
    Wind {
        speed,
        gust: speed * (1.3 + 0.2 * stream.next()),
        direction,
        cardinal: cardinal(direction).to_string(),
    }
}

/// Extra wind from a storm: 3d6, plus `tornado_risk`·6d6 for thunderstorms.
pub fn storm_boost(rng: &mut SeededRandom, thunderstorm: bool, tornado_risk: f64) -> f64 {
    let mut boost = f64::from(rng.dice(3, 6));
    if thunderstorm {
        boost += tornado_risk.max(0.0) * f64::from(rng.dice(6, 6));
    }
    boost
}
