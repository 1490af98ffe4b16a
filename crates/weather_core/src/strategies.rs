//! Proptest strategies for engine inputs.

use proptest::prelude::*;

use crate::calendar::{days_in_month, GameDate};
use crate::region::{LatitudeBand, RegionProfile, SeasonStats, SeasonalProfile};

pub fn latitude_band() -> impl Strategy<Value = LatitudeBand> {
    prop_oneof![
        Just(LatitudeBand::Equatorial),
        Just(LatitudeBand::Tropical),
        Just(LatitudeBand::Temperate),
        Just(LatitudeBand::Subarctic),
        Just(LatitudeBand::Polar),
    ]
}

pub fn game_date() -> impl Strategy<Value = GameDate> {
    (-500i32..2_000, 1u8..=12, 0u8..24)
        .prop_flat_map(|(year, month, hour)| {
            (1..=days_in_month(month)).prop_map(move |day| GameDate {
                year,
                month,
                day,
                hour,
            })
        })
}

fn season_stats(mean: std::ops::Range<f64>) -> impl Strategy<Value = SeasonStats> {
    (mean, 2.0f64..20.0).prop_map(|(mean, variance)| SeasonStats { mean, variance })
}

pub fn seasonal_profile(mean: std::ops::Range<f64>) -> impl Strategy<Value = SeasonalProfile> {
    (
        season_stats(mean.clone()),
        season_stats(mean.clone()),
        season_stats(mean.clone()),
        season_stats(mean),
    )
        .prop_map(|(winter, spring, summer, fall)| SeasonalProfile {
            winter,
            spring,
            summer,
            fall,
        })
}

/// Regions with arbitrary but valid climate tables.
pub fn region_profile() -> impl Strategy<Value = RegionProfile> {
    (
        "[a-z]{3,10}",
        latitude_band(),
        -80.0f64..80.0,
        0.0f64..1.0,
        prop::option::of(seasonal_profile(-10.0..95.0)),
        prop::option::of(seasonal_profile(15.0..95.0)),
    )
        .prop_map(|(id, band, latitude, maritime, temperature, humidity)| {
            let mut region = RegionProfile::new(id, band);
            region.latitude = latitude;
            region.maritime_influence = maritime;
            region.temperature_profile = temperature;
            region.humidity_profile = humidity;
            region
        })
}
