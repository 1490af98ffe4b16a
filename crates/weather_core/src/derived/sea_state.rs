//! Wind-driven sea and swell for coastal regions.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::calendar::GameDate;
use crate::region::{Enclosure, RegionProfile};
use crate::rng;
use crate::weather::wind::{cardinal, Wind};

/// Lower wind bound (mph) of Beaufort forces 1 through 12.
const BEAUFORT_THRESHOLDS: [f64; 12] = [
    1.0, 4.0, 8.0, 13.0, 19.0, 25.0, 32.0, 39.0, 47.0, 55.0, 64.0, 73.0,
];
/// Open-ocean wave height (ft) at the bottom of each force.
const WAVE_HEIGHTS: [f64; 13] = [
    0.0, 0.25, 1.0, 2.0, 3.5, 6.0, 9.5, 13.5, 18.0, 23.0, 29.0, 37.0, 46.0,
];
const BEAUFORT_NAMES: [&str; 13] = [
    "Calm",
    "Light air",
    "Light breeze",
    "Gentle breeze",
    "Moderate breeze",
    "Fresh breeze",
    "Strong breeze",
    "Near gale",
    "Gale",
    "Strong gale",
    "Storm",
    "Violent storm",
    "Hurricane force",
];
/// Upper combined height (ft) of Douglas degrees 0 through 8.
const DOUGLAS_LIMITS: [f64; 9] = [0.0, 0.33, 1.64, 4.1, 8.2, 13.1, 19.7, 29.5, 45.9];
const DOUGLAS_NAMES: [&str; 10] = [
    "Calm (glassy)",
    "Calm (rippled)",
    "Smooth",
    "Slight",
    "Moderate",
    "Rough",
    "Very rough",
    "High",
    "Very high",
    "Phenomenal",
];
const SWELL_CONTEXT: &str = "swell";

#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeaStateSnapshot {
    pub enclosure: Enclosure,
    pub beaufort: u8,
    pub beaufort_name: String,
    /// Feet.
    pub wave_height: f64,
    pub wave_direction: String,
    pub swell_height: f64,
    pub swell_direction: Option<String>,
    pub combined_height: f64,
    pub douglas: u8,
    pub sea_description: String,
    pub advisory: Option<String>,
}

pub fn beaufort_force(wind_speed: f64) -> u8 {
    BEAUFORT_THRESHOLDS
        .iter()
        .take_while(|&&threshold| wind_speed >= threshold)
        .count() as u8
}

pub fn beaufort_name(force: u8) -> &'static str {
    BEAUFORT_NAMES[usize::from(force.min(12))]
}

/// Open-ocean wave height, interpolated linearly inside each force.
pub fn open_water_height(wind_speed: f64) -> f64 {
    let speed = wind_speed.max(0.0);
    let force = usize::from(beaufort_force(speed));
    if force >= 12 {
        return WAVE_HEIGHTS[12];
    }
    let low = if force == 0 { 0.0 } else { BEAUFORT_THRESHOLDS[force - 1] };
    let high = BEAUFORT_THRESHOLDS[force];
    let t = (speed - low) / (high - low);
    WAVE_HEIGHTS[force] + (WAVE_HEIGHTS[force + 1] - WAVE_HEIGHTS[force]) * t
}

pub fn douglas_degree(height: f64) -> u8 {
    if height <= 0.0 {
        return 0;
    }
    DOUGLAS_LIMITS
        .iter()
        .skip(1)
        .position(|&limit| height < limit)
        .map_or(9, |index| index as u8 + 1)
}

fn swell_factor(region: &RegionProfile, day: &GameDate) -> f64 {
    rng::stream(&region.id, day, SWELL_CONTEXT).range(0.5, 1.5)
}

/// Swell height at the hour, smoothed between daily draws.
pub fn swell_height(
    region: &RegionProfile,
    date: &GameDate,
    base: f64,
    enclosure: Enclosure,
) -> f64 {
    if !enclosure.receives_swell() {
        return 0.0;
    }
    let today = date.start_of_day();
    let start = swell_factor(region, &today);
    let end = swell_factor(region, &today.advance(24));
    let factor = start + (end - start) * f64::from(date.hour) / 24.0;
    base.max(0.0) * factor * enclosure.fetch_factor()
}

fn advisory(force: u8) -> Option<String> {
    let text = match force {
        10.. => "Storm warning",
        8..=9 => "Gale warning",
        6..=7 => "Small craft advisory",
        _ => return None,
    };
    Some(text.to_string())
}

/// Sea state for a coastal region given the hour's wind; `None` inland.
pub fn assess(region: &RegionProfile, date: &GameDate, wind: &Wind) -> Option<SeaStateSnapshot> {
    let marine = region.marine_profile()?;
    let enclosure = marine.enclosure;
    let force = beaufort_force(wind.speed);
    let wave_height = open_water_height(wind.speed) * enclosure.fetch_factor();
    let swell = swell_height(region, date, marine.swell_height, enclosure);
    let combined_height = wave_height.hypot(swell);
    let douglas = douglas_degree(combined_height);

    Some(SeaStateSnapshot {
        enclosure,
        beaufort: force,
        beaufort_name: beaufort_name(force).to_string(),
        wave_height,
        wave_direction: wind.cardinal.clone(),
        swell_height: swell,
        swell_direction: (swell > 0.0).then(|| cardinal(marine.swell_direction).to_string()),
        combined_height,
        douglas,
        sea_description: DOUGLAS_NAMES[usize::from(douglas)].to_string(),
        advisory: advisory(force),
    })
}
