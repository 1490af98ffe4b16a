use weather_core::calendar::GameDate;
use weather_core::config::Tuning;
use weather_core::region::{
    ClimateArchetype, FactorValue, LatitudeBand, RegionProfile, SeasonStats, SeasonalProfile,
};
use weather_core::weather::condition::thunderstorm_probability;
use weather_core::weather::precipitation::guard_transition;
use weather_core::weather::{Condition, Intensity, PrecipitationType};
use weather_core::Almanac;

const YEAR_HOURS: u32 = 365 * 24;

fn profile(mean: [f64; 4], variance: f64) -> SeasonalProfile {
    let stats = |mean| SeasonStats { mean, variance };
    SeasonalProfile {
        winter: stats(mean[0]),
        spring: stats(mean[1]),
        summer: stats(mean[2]),
        fall: stats(mean[3]),
    }
}

fn archetype_regions() -> Vec<RegionProfile> {
    let humid = profile([80.0, 80.0, 85.0, 80.0], 8.0);

    let mut tropical = RegionProfile::new("rainforest", LatitudeBand::Equatorial);
    tropical.temperature_profile = Some(profile([78.0, 80.0, 82.0, 80.0], 4.0));
    tropical.humidity_profile = Some(humid);

    let mut monsoon = RegionProfile::new("delta", LatitudeBand::Tropical);
    monsoon
        .special_factors
        .insert("monsoon".into(), FactorValue::Flag(true));
    monsoon.temperature_profile = Some(profile([70.0, 82.0, 86.0, 78.0], 5.0));
    monsoon.humidity_profile = Some(humid);

    let mut maritime = RegionProfile::new("fjordlands", LatitudeBand::Temperate);
    maritime.maritime_influence = 0.85;
    maritime.temperature_profile = Some(profile([33.0, 45.0, 60.0, 47.0], 9.0));
    maritime.humidity_profile = Some(humid);

    let mut polar = RegionProfile::new("glacier", LatitudeBand::Polar);
    polar.temperature_profile = Some(profile([-20.0, 5.0, 34.0, 5.0], 10.0));
    polar.humidity_profile = Some(humid);

    let mut temperate = RegionProfile::new("heartland", LatitudeBand::Temperate);
    temperate.maritime_influence = 0.4;
    temperate.temperature_profile = Some(profile([30.0, 50.0, 72.0, 52.0], 12.0));
    temperate.humidity_profile = Some(humid);

    let mut continental = RegionProfile::new("steppe", LatitudeBand::Temperate);
    continental.maritime_influence = 0.1;
    continental.temperature_profile = Some(profile([15.0, 45.0, 78.0, 45.0], 14.0));
    continental.humidity_profile = Some(humid);

    vec![tropical, monsoon, maritime, polar, temperate, continental]
}

#[test]
fn fixture_regions_cover_every_archetype() {
    let archetypes: Vec<ClimateArchetype> =
        archetype_regions().iter().map(|region| region.archetype()).collect();
    assert_eq!(
        archetypes,
        vec![
            ClimateArchetype::TropicalWet,
            ClimateArchetype::Monsoon,
            ClimateArchetype::Maritime,
            ClimateArchetype::Polar,
            ClimateArchetype::Temperate,
            ClimateArchetype::Continental,
        ]
    );
}

#[test]
fn wet_runs_never_exceed_the_hard_cap_over_a_year() {
    let almanac = Almanac::default();
    let tuning = Tuning::default();
    let end = GameDate::new(1402, 12, 31, 23).expect("valid");
    for region in archetype_regions() {
        let hard = tuning.streak_caps.caps(region.archetype()).hard;
        let records = almanac.weather().history(&region, &end, YEAR_HOURS);
        assert_eq!(records.len(), YEAR_HOURS as usize);
        let longest = records
            .iter()
            .scan(0u32, |run, record| {
                *run = if record.is_wet() { *run + 1 } else { 0 };
                Some(*run)
            })
            .max()
            .unwrap_or(0);
        assert!(
            longest <= hard,
            "{} ran {} wet hours against a cap of {}",
            region.id,
            longest,
            hard
        );
        assert!(longest > 0, "{} never saw precipitation", region.id);
    }
}

#[test]
fn rain_and_snow_never_touch_directly() {
    let almanac = Almanac::default();
    let window = Tuning::default().type_history_hours as i64;
    let end = GameDate::new(1403, 4, 30, 23).expect("valid");

    let mut transitional = Vec::new();
    for (index, variance) in [8.0, 12.0, 16.0].into_iter().enumerate() {
        let mut region = RegionProfile::new(format!("borderland-{index}"), LatitudeBand::Temperate);
        region.temperature_profile = Some(profile([33.0, 38.0, 50.0, 38.0], variance));
        region.humidity_profile = Some(profile([85.0, 80.0, 75.0, 80.0], 8.0));
        transitional.push(region);
    }
    transitional.extend(archetype_regions());

    let mut mixed_hours = 0;
    for region in &transitional {
        let records = almanac.weather().history(region, &end, 180 * 24);
        let mut last_wet: Option<(PrecipitationType, i64)> = None;
        for record in &records {
            let kind = record.precipitation.kind;
            if !kind.is_wet() {
                continue;
            }
            mixed_hours += usize::from(kind.is_mixed());
            if let Some((previous, hour)) = last_wet {
                if record.absolute_hour - hour <= window {
                    let direct = matches!(
                        (previous, kind),
                        (PrecipitationType::Rain, PrecipitationType::Snow)
                            | (PrecipitationType::Snow, PrecipitationType::Rain)
                    );
                    assert!(
                        !direct,
                        "{} flipped {:?} -> {:?} at hour {}",
                        region.id, previous, kind, record.absolute_hour
                    );
                    assert_eq!(guard_transition(kind, Some(previous)), kind);
                }
            }
            last_wet = Some((kind, record.absolute_hour));
        }
    }
    assert!(mixed_hours > 0, "transitional climates should produce sleet or freezing rain");
}

#[test]
fn thunderstorm_frequency_tracks_the_probability_formula() {
    let almanac = Almanac::default();
    let mut samples = 0u32;
    let mut storms = 0u32;
    let mut expected = 0.0;

    for index in 0..160 {
        let mut region = RegionProfile::new(format!("prairie-{index}"), LatitudeBand::Temperate);
        region.latitude = 45.0;
        region.maritime_influence = 0.3;
        region
            .special_factors
            .insert("thunderstorms".into(), FactorValue::Number(0.7));
        region.temperature_profile = Some(profile([30.0, 60.0, 85.0, 60.0], 6.0));
        region.humidity_profile = Some(profile([70.0, 75.0, 85.0, 75.0], 8.0));

        for day in 1..=31u8 {
            for hour in 12..=18u8 {
                let date = GameDate::new(1404, 7, day, hour).expect("valid");
                let snapshot = almanac.generate_weather(&region, &date).expect("weather");
                let precipitation = snapshot.precipitation;
                if precipitation.kind != PrecipitationType::Rain
                    || precipitation.intensity != Some(Intensity::Heavy)
                    || snapshot.temperature < 55.0
                {
                    continue;
                }
                samples += 1;
                expected += thunderstorm_probability(&region, &date, snapshot.temperature);
                if snapshot.condition == Condition::Thunderstorm {
                    storms += 1;
                } else {
                    assert_eq!(snapshot.condition, Condition::HeavyRain);
                }
            }
        }
    }

    assert!(samples >= 150, "only {} heavy afternoon rain hours", samples);
    let observed = f64::from(storms) / f64::from(samples);
    let expected = expected / f64::from(samples);
    assert!(expected >= 0.67 && expected <= 0.77 + 1e-9, "expected {}", expected);
    assert!(
        (observed - expected).abs() < 0.1,
        "observed {} against expected {} over {} samples",
        observed,
        expected,
        samples
    );
}
