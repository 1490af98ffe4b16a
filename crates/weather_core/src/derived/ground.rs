use serde::{Deserialize, Serialize};

use crate::region::GroundType;
use crate::weather::HourRecord;

pub const FREEZING: f64 = 32.0;
/// Snow depth (inches) at which the pack starts insulating the ground.
const INSULATING_DEPTH: f64 = 2.0;
/// Depth at which insulation is complete.
const FULL_INSULATION_DEPTH: f64 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundTemperature {
    pub temperature: f64,
    pub air_temperature: f64,
    pub ground_type: GroundType,
    pub lookback_hours: u32,
    pub snow_insulated: bool,
    pub frozen: bool,
}

/// Exponentially weighted mean of `values` (oldest first) with the smoothing
/// factor of an `n`-period average.
pub fn ewma(values: &[f64], periods: u32) -> Option<f64> {
    let alpha = 2.0 / (f64::from(periods.max(1)) + 1.0);
    let mut iter = values.iter();
    let first = *iter.next()?;
    Some(iter.fold(first, |average, value| alpha * value + (1.0 - alpha) * average))
}

/// Ground temperature from the trailing air history (oldest first, ending
/// with the current hour) and the current snow depth.
pub fn assess(
    ground_type: GroundType,
    history: &[HourRecord],
    snow_depth: f64,
) -> GroundTemperature {
    let lookback = ground_type.lookback_hours();
    let temperatures: Vec<f64> = history.iter().map(|record| record.temperature).collect();
    let air_temperature = temperatures.last().copied().unwrap_or(FREEZING);
    let mut temperature = ewma(&temperatures, lookback).unwrap_or(air_temperature);

    let snow_insulated = snow_depth >= INSULATING_DEPTH;
    if snow_insulated {
        let weight = (snow_depth / FULL_INSULATION_DEPTH).min(1.0);
        temperature = temperature * (1.0 - weight) + FREEZING * weight;
    }

    GroundTemperature {
        temperature,
        air_temperature,
        ground_type,
        lookback_hours: lookback,
        snow_insulated,
        frozen: temperature <= FREEZING,
    }
}
