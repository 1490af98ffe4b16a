use weather_core::calendar::GameDate;
use weather_core::celestial::geometry::{PhaseName, DEFAULT_MOON_PHASE, DEFAULT_SUN_PHASE};
use weather_core::region::{LatitudeBand, RegionProfile};
use weather_core::Almanac;

const BANDS: [LatitudeBand; 5] = [
    LatitudeBand::Equatorial,
    LatitudeBand::Tropical,
    LatitudeBand::Temperate,
    LatitudeBand::Subarctic,
    LatitudeBand::Polar,
];

#[test]
fn polar_solstice_is_endless_day() {
    let almanac = Almanac::default();
    let solstice = GameDate::new(1000, 6, 21, 12).expect("valid");
    let times = almanac
        .sunrise_sunset(LatitudeBand::Polar, &solstice, 0.0)
        .expect("valid date");
    assert_eq!(times.sunrise_hour, None);
    assert_eq!(times.sunset_hour, None);
    assert_eq!(times.day_length_hours, 24.0);
}

#[test]
fn rise_and_set_are_consistent_with_day_length() {
    let almanac = Almanac::default();
    for band in BANDS {
        for observer_angle in [0.0, 90.0, 200.0] {
            for day in (0..365).step_by(5) {
                let date = GameDate::from_absolute_day(365 * 700 + day);
                let times = almanac
                    .sunrise_sunset(band, &date, observer_angle)
                    .expect("valid date");
                assert!((0.0..=24.0).contains(&times.day_length_hours));
                if let (Some(rise), Some(set)) = (times.sunrise_hour, times.sunset_hour) {
                    assert!(rise != set, "{band} day {day}: rise equals set");
                    let recomputed = (set - rise).rem_euclid(24.0);
                    assert!(
                        (recomputed - times.day_length_hours).abs() < 0.01,
                        "{band} day {day}: {recomputed} vs {}",
                        times.day_length_hours
                    );
                }
            }
        }
    }
}

#[test]
fn day_length_shrinks_from_the_pole_toward_the_equator_in_summer() {
    let almanac = Almanac::default();
    let midsummer = GameDate::new(5, 6, 21, 0).expect("valid");
    let lengths: Vec<f64> = BANDS
        .iter()
        .map(|band| {
            almanac
                .sunrise_sunset(*band, &midsummer, 0.0)
                .expect("valid")
                .day_length_hours
        })
        .collect();
    for pair in lengths.windows(2) {
        assert!(pair[0] <= pair[1] + 1e-9, "{:?}", lengths);
    }
}

#[test]
fn lunar_cycle_visits_every_phase() {
    let almanac = Almanac::default();
    let start = GameDate::new(250, 3, 1, 0).expect("valid");
    let mut seen = Vec::new();
    for day in 0..31 {
        let phase = almanac
            .lunar_phase(&start.advance(day * 24), DEFAULT_MOON_PHASE, DEFAULT_SUN_PHASE)
            .expect("valid");
        assert!((0.0..=100.0).contains(&phase.illumination));
        assert_eq!(phase.is_waxing, phase.phase_angle > 0.0 && phase.phase_angle < 180.0);
        if !seen.contains(&phase.phase_name) {
            seen.push(phase.phase_name);
        }
    }
    let cardinal = [
        PhaseName::NewMoon,
        PhaseName::FirstQuarter,
        PhaseName::FullMoon,
        PhaseName::LastQuarter,
    ];
    for name in cardinal {
        assert!(seen.contains(&name), "missing {:?} in {:?}", name, seen);
    }
}

#[test]
fn moonrise_and_moonset_fall_inside_the_day() {
    let almanac = Almanac::default();
    let start = GameDate::new(250, 9, 1, 0).expect("valid");
    let mut with_both = 0;
    for day in 0..30 {
        let times = almanac
            .moon_rise_set(&start.advance(day * 24), 0.0)
            .expect("valid");
        for hour in [times.moonrise_hour, times.moonset_hour].into_iter().flatten() {
            assert!((0.0..24.0).contains(&hour));
        }
        if times.moonrise_hour.is_some() && times.moonset_hour.is_some() {
            with_both += 1;
        }
    }
    assert!(with_both >= 25);
}

#[test]
fn celestial_state_matches_the_individual_queries() {
    let almanac = Almanac::default();
    let region = RegionProfile::new("ridge", LatitudeBand::Subarctic);
    let date = GameDate::new(612, 10, 5, 20).expect("valid");
    let state = almanac.celestial_state(&region, &date).expect("valid");
    let sun = almanac
        .sunrise_sunset(region.latitude_band, &date, 0.0)
        .expect("valid");
    let moon = almanac.moon_rise_set(&date, 0.0).expect("valid");
    let phase = almanac
        .lunar_phase(&date, DEFAULT_MOON_PHASE, DEFAULT_SUN_PHASE)
        .expect("valid");
    assert_eq!(state.sunrise_hour, sun.sunrise_hour);
    assert_eq!(state.sunset_hour, sun.sunset_hour);
    assert_eq!(state.is_daytime, sun.is_daytime);
    assert_eq!(state.moonrise_hour, moon.moonrise_hour);
    assert_eq!(state.phase_name, phase.phase_name);
    assert_eq!(state.illumination, phase.illumination);
}
