use std::f64::consts::TAU;

use crate::calendar::GameDate;
use crate::region::RegionProfile;
use crate::rng;

pub const ANOMALY_CONTEXT: &str = "temperature-anomaly";
/// Hour of the diurnal maximum.
pub const PEAK_HOUR: f64 = 15.0;
const DIURNAL_SHARE: f64 = 0.4;
const ANOMALY_SHARE: f64 = 0.6;
/// Standard lapse rate, °F per 1000 ft.
const LAPSE_RATE: f64 = 3.5;

/// Temperature at one hour, split into its components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemperatureReading {
    pub value: f64,
    pub seasonal_mean: f64,
    pub variance: f64,
    /// True when the region had no temperature profile.
    pub defaulted: bool,
}

/// Day-scale departure from the seasonal mean; one draw per calendar day.
pub fn daily_anomaly(region: &RegionProfile, date: &GameDate, variance: f64) -> f64 {
    let mut stream = rng::stream(&region.id, &date.start_of_day(), ANOMALY_CONTEXT);
    stream.signed() * variance * ANOMALY_SHARE
}

pub fn diurnal_amplitude(region: &RegionProfile, variance: f64) -> f64 {
    DIURNAL_SHARE * variance * (1.0 - 0.5 * region.maritime())
}

/// Cosine curve peaking at [`PEAK_HOUR`] with a trough twelve hours earlier.
pub fn diurnal_offset(hour: f64, amplitude: f64) -> f64 {
    amplitude * (TAU * (hour - PEAK_HOUR) / 24.0).cos()
}

/// Air temperature before any pattern modifier is applied.
pub fn base_temperature(region: &RegionProfile, date: &GameDate) -> TemperatureReading {
    let (stats, defaulted) = region.temperature_stats(date);
    let variance = stats.variance.abs();
    let hour = f64::from(date.hour);

    // Anomalies are anchored at midnight and interpolated through the day.
    let today = daily_anomaly(region, date, variance);
    let tomorrow_date = date.start_of_day().advance(24);
    let (tomorrow_stats, _) = region.temperature_stats(&tomorrow_date);
    let tomorrow = daily_anomaly(region, &tomorrow_date, tomorrow_stats.variance.abs());
    let anomaly = today + (tomorrow - today) * (hour / 24.0);

    let lapse = region.elevation.max(0.0) / 1_000.0 * LAPSE_RATE;
    let value = stats.mean + anomaly + diurnal_offset(hour, diurnal_amplitude(region, variance))
        - lapse;

    TemperatureReading {
        value,
        seasonal_mean: stats.mean,
        variance,
        defaulted,
    }
}

/// Expected daily high and low for the date, ignoring anomalies and patterns.
pub fn normal_range(region: &RegionProfile, date: &GameDate) -> (f64, f64) {
    let (stats, _) = region.temperature_stats(date);
    let amplitude = diurnal_amplitude(region, stats.variance.abs());
    let lapse = region.elevation.max(0.0) / 1_000.0 * LAPSE_RATE;
    (stats.mean + amplitude - lapse, stats.mean - amplitude - lapse)
}
