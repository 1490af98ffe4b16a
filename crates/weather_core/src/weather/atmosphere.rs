use serde::{Deserialize, Serialize};

use crate::calendar::GameDate;
use crate::region::RegionProfile;
use crate::rng;

use super::pattern::PatternKind;
use super::precipitation::{Intensity, Precipitation, PrecipitationType};

/// Magnus coefficients over water, °C.
const MAGNUS_A: f64 = 17.625;
const MAGNUS_B: f64 = 243.04;
pub const SEA_LEVEL_PRESSURE: f64 = 1013.25;
const PRESSURE_NOISE: f64 = 4.0;
const PRESSURE_TREND_THRESHOLD: f64 = 0.5;
pub const CLEAR_VISIBILITY: f64 = 10.0;

pub fn fahrenheit_to_celsius(value: f64) -> f64 {
    (value - 32.0) * 5.0 / 9.0
}

pub fn celsius_to_fahrenheit(value: f64) -> f64 {
    value * 9.0 / 5.0 + 32.0
}

/// Relative humidity from air temperature and dew point, both °F.
///
/// The dew point is clamped to the air temperature first, which bounds the
/// result to `[0, 100]`.
pub fn relative_humidity(temperature: f64, dew_point: f64) -> f64 {
    let t = fahrenheit_to_celsius(temperature);
    let td = fahrenheit_to_celsius(dew_point.min(temperature));
    let saturation = |c: f64| (MAGNUS_A * c / (MAGNUS_B + c)).exp();
    (100.0 * saturation(td) / saturation(t)).clamp(0.0, 100.0)
}

/// Target humidity for the hour before precipitation moisture is added.
pub fn target_humidity(
    region: &RegionProfile,
    date: &GameDate,
    pattern: PatternKind,
) -> (f64, bool) {
    let (stats, defaulted) = region.humidity_stats(date);
    let mut stream = rng::stream(&region.id, &date.start_of_day(), "humidity");
    let noise = stream.signed() * stats.variance.abs() * 0.5;
    let pattern_shift = match pattern {
        PatternKind::HighPressure => -10.0,
        PatternKind::LowPressure => 10.0,
        PatternKind::WarmFront => 8.0,
        PatternKind::ColdFront => 0.0,
        PatternKind::Stable => -3.0,
    };
    let dry_air = region.factor_or("dryAir", 0.0).clamp(0.0, 1.0) * 15.0;
    ((stats.mean + noise + pattern_shift - dry_air).clamp(5.0, 100.0), defaulted)
}

/// Dew point (°F) for an hour, generated before humidity so that the dew
/// point can never exceed the air temperature.
pub fn dew_point(temperature: f64, target_humidity: f64, precipitation: &Precipitation) -> f64 {
    let moisture = if precipitation.is_wet() {
        match precipitation.intensity {
            Some(Intensity::Heavy) => 97.0,
            Some(Intensity::Moderate) => 93.0,
            _ => 88.0,
        }
    } else {
        0.0
    };
    let humidity = target_humidity.max(moisture).clamp(1.0, 100.0);
    // Lawrence approximation: each 5 % below saturation is 1 °C of depression.
    let t = fahrenheit_to_celsius(temperature);
    let td = t - (100.0 - humidity) / 5.0;
    celsius_to_fahrenheit(td).min(temperature)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PressureTrend {
    Rising,
    Steady,
    Falling,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pressure {
    /// hPa.
    pub value: f64,
    pub trend: PressureTrend,
}

/// Sea-level pressure from the blended pattern offset and a day-smoothed noise term.
pub fn pressure_value(region: &RegionProfile, date: &GameDate, pattern_offset: f64) -> f64 {
    let today = date.start_of_day();
    let tomorrow = today.advance(24);
    let noise_today = rng::stream(&region.id, &today, "pressure").signed();
    let noise_tomorrow = rng::stream(&region.id, &tomorrow, "pressure").signed();
    let hour = f64::from(date.hour) / 24.0;
    let noise = (noise_today + (noise_tomorrow - noise_today) * hour) * PRESSURE_NOISE;
    SEA_LEVEL_PRESSURE + pattern_offset + noise
}

pub fn pressure_trend(now: f64, earlier: f64) -> PressureTrend {
    let delta = now - earlier;
    if delta > PRESSURE_TREND_THRESHOLD {
        PressureTrend::Rising
    } else if delta < -PRESSURE_TREND_THRESHOLD {
        PressureTrend::Falling
    } else {
        PressureTrend::Steady
    }
}

/// Percent cloud cover.
pub fn cloud_cover(
    region: &RegionProfile,
    date: &GameDate,
    clear_skies: f64,
    precipitation: &Precipitation,
) -> f64 {
    let mut stream = rng::stream(&region.id, date, &format!("cloud:{}", date.hour));
    let base = (1.0 - clear_skies) * 100.0 + stream.signed() * 20.0;
    let floor = match precipitation.intensity {
        _ if !precipitation.is_wet() => 0.0,
        Some(Intensity::Heavy) => 95.0,
        Some(Intensity::Moderate) => 85.0,
        _ => 70.0,
    };
    base.max(floor).clamp(0.0, 100.0)
}

/// Fog needs near-saturated, light-wind air at night or in the morning.
pub fn fog_forms(
    region: &RegionProfile,
    date: &GameDate,
    humidity: f64,
    wind_speed: f64,
    is_daytime: bool,
) -> bool {
    let morning = date.hour <= 9;
    if humidity < 95.0 || wind_speed >= 6.0 || (is_daytime && !morning) {
        return false;
    }
    let probability = if region.flag("fogProne") { 0.8 } else { 0.5 };
    rng::stream(&region.id, date, &format!("fog:{}", date.hour)).chance(probability)
}

/// Visibility in miles.
pub fn visibility(precipitation: &Precipitation, humidity: f64, fog: bool) -> f64 {
    let from_precipitation = match (precipitation.kind, precipitation.intensity) {
        (PrecipitationType::None, _) => CLEAR_VISIBILITY,
        (PrecipitationType::Snow, Some(Intensity::Heavy)) => 0.25,
        (PrecipitationType::Snow, Some(Intensity::Moderate)) => 1.0,
        (PrecipitationType::Snow, _) => 2.5,
        (_, Some(Intensity::Heavy)) => 1.0,
        (_, Some(Intensity::Moderate)) => 3.0,
        (_, _) => 5.0,
    };
    let haze = if humidity > 90.0 {
        CLEAR_VISIBILITY - (humidity - 90.0) * 0.5
    } else {
        CLEAR_VISIBILITY
    };
    let fog_limit = if fog { 0.25 } else { CLEAR_VISIBILITY };
    from_precipitation.min(haze).min(fog_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dry() -> Precipitation {
        Precipitation::none()
    }

    #[test]
    fn saturated_air_is_one_hundred_percent() {
        assert!((relative_humidity(60.0, 60.0) - 100.0).abs() < 1e-9);
        assert!(relative_humidity(80.0, 40.0) < 30.0);
    }

    #[test]
    fn precipitation_moistens_the_air() {
        let wet = Precipitation::wet(PrecipitationType::Rain, Intensity::Heavy);
        let dry_dew = dew_point(60.0, 40.0, &dry());
        let wet_dew = dew_point(60.0, 40.0, &wet);
        assert!(wet_dew > dry_dew);
        assert!(relative_humidity(60.0, wet_dew) > 90.0);
    }

    #[test]
    fn trend_uses_half_hpa_band() {
        assert_eq!(pressure_trend(1010.0, 1009.0), PressureTrend::Rising);
        assert_eq!(pressure_trend(1010.0, 1010.4), PressureTrend::Steady);
        assert_eq!(pressure_trend(1010.0, 1011.0), PressureTrend::Falling);
    }

    #[test]
    fn fog_and_snow_cut_visibility() {
        assert_eq!(visibility(&dry(), 50.0, false), CLEAR_VISIBILITY);
        assert_eq!(visibility(&dry(), 99.0, true), 0.25);
        let snow = Precipitation::wet(PrecipitationType::Snow, Intensity::Heavy);
        assert!(visibility(&snow, 80.0, false) < 1.0);
    }

    proptest! {
        #[test]
        fn humidity_is_bounded_and_dew_point_never_exceeds_air(
            temperature in -60.0f64..130.0,
            target in 0.0f64..120.0,
            wet in any::<bool>(),
        ) {
            let precipitation = if wet {
                Precipitation::wet(PrecipitationType::Rain, Intensity::Moderate)
            } else {
                dry()
            };
            let dew = dew_point(temperature, target, &precipitation);
            prop_assert!(dew <= temperature);
            let rh = relative_humidity(temperature, dew);
            prop_assert!((0.0..=100.0).contains(&rh));
        }
    }
}
