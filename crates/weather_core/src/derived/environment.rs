//! Drought, flood, heat, cold and wildfire tracking from the recent record.
//!
//! Each indicator compares what the timeline actually produced over a trailing
//! window with what the region's climatology would lead one to expect.
//! Snow on the ground or a frozen three days switch drought and wildfire off.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::cache::{CacheStats, Memo};
use crate::calendar::GameDate;
use crate::config::Tuning;
use crate::region::RegionProfile;
use crate::weather::precipitation::{continue_probability, occurrence_modifier, start_probability};
use crate::weather::temperature::normal_range;
use crate::weather::{HourRecord, Intensity, PatternKind, PrecipitationType, WeatherGenerator};

use super::accumulation::SnowIceState;
use super::ground::FREEZING;

const MIN_EXPECTED_WET_DAYS: f64 = 3.0;
const MIN_FLOOD_LOAD: f64 = 20.0;
/// Flood load credited per inch of water released by snowmelt.
const MELT_LOAD_PER_INCH: f64 = 40.0;
const MEAN_INTENSITY_WEIGHT: f64 = 1.8;
const EXTREME_DEPARTURE: f64 = 10.0;
const HEAT_FLOOR: f64 = 80.0;
const COLD_CEILING: f64 = 40.0;
const SUPPRESSING_SNOW: f64 = 0.5;
const SUPPRESSING_HOURS: usize = 72;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Advisory,
    Watch,
    Warning,
    Extreme,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    Drought,
    Flood,
    HeatWave,
    ColdSnap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub summary: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FireDanger {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl FireDanger {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::Extreme,
            s if s >= 60.0 => Self::VeryHigh,
            s if s >= 40.0 => Self::High,
            s if s >= 20.0 => Self::Moderate,
            _ => Self::Low,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WildfireRisk {
    /// 0 to 100.
    pub score: f64,
    pub level: FireDanger,
}

#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSet {
    pub alerts: Vec<Alert>,
    pub wildfire: WildfireRisk,
    /// 0 when rain is on schedule, 1 when none fell at all.
    pub drought_index: f64,
    /// Observed over expected precipitation load; `None` when nothing was expected.
    pub flood_ratio: Option<f64>,
    /// Snow cover or a frozen spell is holding drought and fire off.
    pub suppressed: bool,
}

impl AlertSet {
    pub fn severity(&self, kind: AlertKind) -> Option<Severity> {
        self.alerts
            .iter()
            .find(|alert| alert.kind == kind)
            .map(|alert| alert.severity)
    }
}

/// Records grouped by calendar day, oldest first.
fn days(records: &[HourRecord]) -> Vec<(i64, Vec<&HourRecord>)> {
    let mut grouped: BTreeMap<i64, Vec<&HourRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.absolute_hour.div_euclid(24))
            .or_default()
            .push(record);
    }
    grouped.into_iter().collect()
}

fn tail(records: &[HourRecord], hours: usize) -> &[HourRecord] {
    &records[records.len().saturating_sub(hours)..]
}

/// Stationary wet-hour fraction and per-hour start chance for the day.
fn climatology(region: &RegionProfile, day: &GameDate) -> (f64, f64) {
    let chance = PatternKind::mean_precipitation_chance();
    let modifier = (0..24u8)
        .map(|hour| occurrence_modifier(region, &day.with_hour(hour)))
        .sum::<f64>()
        / 24.0;
    let start = start_probability(chance, modifier);
    let cont = continue_probability(chance, modifier, 1.0);
    let denominator = 1.0 - cont + start;
    let wet_fraction = if denominator > 0.0 { start / denominator } else { 0.0 };
    (wet_fraction, start)
}

fn expected_wet_day(region: &RegionProfile, day: &GameDate) -> f64 {
    let (wet_fraction, start) = climatology(region, day);
    1.0 - (1.0 - wet_fraction) * (1.0 - start).powi(23)
}

/// Returns the drought index and, when enough rain was expected, an alert.
pub fn drought(region: &RegionProfile, records: &[HourRecord]) -> (f64, Option<Alert>) {
    let grouped = days(records);
    let observed = grouped
        .iter()
        .filter(|(_, hours)| hours.iter().any(|record| record.is_wet()))
        .count() as f64;
    let expected: f64 = grouped
        .iter()
        .map(|(day, _)| expected_wet_day(region, &GameDate::from_absolute_day(*day)))
        .sum();
    if expected < MIN_EXPECTED_WET_DAYS {
        return (0.0, None);
    }
    let index = (1.0 - observed / expected).clamp(0.0, 1.0);
    let severity = match index {
        i if i >= 0.9 => Some(Severity::Extreme),
        i if i >= 0.75 => Some(Severity::Warning),
        i if i >= 0.6 => Some(Severity::Watch),
        i if i >= 0.45 => Some(Severity::Advisory),
        _ => None,
    };
    let alert = severity.map(|severity| Alert {
        kind: AlertKind::Drought,
        severity,
        summary: format!(
            "{} wet days against {:.1} expected over {} days",
            observed,
            expected,
            grouped.len()
        ),
    });
    (index, alert)
}

fn precipitation_load(record: &HourRecord) -> f64 {
    match record.precipitation.kind {
        // Snow is held on the ground and only counts once it melts.
        PrecipitationType::None | PrecipitationType::Snow => 0.0,
        _ => match record.precipitation.intensity {
            Some(Intensity::Heavy) => 4.0,
            Some(Intensity::Moderate) => 2.0,
            _ => 1.0,
        },
    }
}

/// Observed precipitation load (plus snowmelt) against the climatological load.
pub fn flood(
    region: &RegionProfile,
    records: &[HourRecord],
    melt: f64,
) -> (Option<f64>, Option<Alert>) {
    let observed =
        records.iter().map(precipitation_load).sum::<f64>() + melt.max(0.0) * MELT_LOAD_PER_INCH;
    let expected: f64 = days(records)
        .iter()
        .map(|(day, hours)| {
            let (wet_fraction, _) = climatology(region, &GameDate::from_absolute_day(*day));
            wet_fraction * hours.len() as f64 * MEAN_INTENSITY_WEIGHT
        })
        .sum();
    if expected <= 0.0 {
        return (None, None);
    }
    let ratio = observed / expected;
    if observed < MIN_FLOOD_LOAD {
        return (Some(ratio), None);
    }
    let severity = match ratio {
        r if r >= 3.5 => Some(Severity::Extreme),
        r if r >= 2.75 => Some(Severity::Warning),
        r if r >= 2.0 => Some(Severity::Watch),
        r if r >= 1.5 => Some(Severity::Advisory),
        _ => None,
    };
    let alert = severity.map(|severity| Alert {
        kind: AlertKind::Flood,
        severity,
        summary: format!("precipitation load {:.1}x normal", ratio),
    });
    (Some(ratio), alert)
}

fn run_severity(days: usize) -> Option<Severity> {
    match days {
        0 | 1 => None,
        2 => Some(Severity::Advisory),
        3 => Some(Severity::Watch),
        4 | 5 => Some(Severity::Warning),
        _ => Some(Severity::Extreme),
    }
}

/// Trailing runs of abnormally hot highs and cold lows.
pub fn extremes(region: &RegionProfile, records: &[HourRecord]) -> Vec<Alert> {
    let grouped = days(records);
    let mut hot_run = 0;
    let mut cold_run = 0;
    let mut hot_open = true;
    let mut cold_open = true;
    for (day, hours) in grouped.iter().rev() {
        let date = GameDate::from_absolute_day(*day);
        let (normal_high, normal_low) = normal_range(region, &date);
        let high = hours.iter().map(|r| r.temperature).fold(f64::MIN, f64::max);
        let low = hours.iter().map(|r| r.temperature).fold(f64::MAX, f64::min);

        hot_open &= high >= normal_high + EXTREME_DEPARTURE && high >= HEAT_FLOOR;
        cold_open &= low <= normal_low - EXTREME_DEPARTURE && low <= COLD_CEILING;
        hot_run += usize::from(hot_open);
        cold_run += usize::from(cold_open);
        if !hot_open && !cold_open {
            break;
        }
    }

    let mut alerts = Vec::new();
    if let Some(severity) = run_severity(hot_run) {
        alerts.push(Alert {
            kind: AlertKind::HeatWave,
            severity,
            summary: format!(
                "{} days at least {}°F above normal highs",
                hot_run, EXTREME_DEPARTURE
            ),
        });
    }
    if let Some(severity) = run_severity(cold_run) {
        alerts.push(Alert {
            kind: AlertKind::ColdSnap,
            severity,
            summary: format!(
                "{} days at least {}°F below normal lows",
                cold_run, EXTREME_DEPARTURE
            ),
        });
    }
    alerts
}

/// Composite fire danger for the latest hour of `records`.
pub fn wildfire(drought_index: f64, records: &[HourRecord]) -> WildfireRisk {
    let Some(now) = records.last() else {
        return WildfireRisk {
            score: 0.0,
            level: FireDanger::Low,
        };
    };
    let recent = tail(records, SUPPRESSING_HOURS);
    let recent_days = days(recent);
    let recent_high = recent_days
        .iter()
        .map(|(_, hours)| hours.iter().map(|r| r.temperature).fold(f64::MIN, f64::max))
        .sum::<f64>()
        / recent_days.len().max(1) as f64;
    let wet_hours = recent.iter().filter(|record| record.is_wet()).count() as f64;

    let drought = 35.0 * drought_index.clamp(0.0, 1.0);
    let heat = 25.0 * ((recent_high - 70.0) / 30.0).clamp(0.0, 1.0);
    let dryness = 20.0 * ((60.0 - now.humidity) / 50.0).clamp(0.0, 1.0);
    let wind = 20.0 * (now.wind_speed / 40.0).clamp(0.0, 1.0);
    let rain = 30.0 * (wet_hours / 12.0).clamp(0.0, 1.0);

    let score = (drought + heat + dryness + wind - rain).clamp(0.0, 100.0);
    WildfireRisk {
        score,
        level: FireDanger::from_score(score),
    }
}

/// True when snow cover or a frozen spell holds drought and fire off.
pub fn suppressed(snow: &SnowIceState, records: &[HourRecord]) -> bool {
    if snow.snow_depth >= SUPPRESSING_SNOW {
        return true;
    }
    let recent = tail(records, SUPPRESSING_HOURS);
    if recent.is_empty() {
        return false;
    }
    let mean = recent.iter().map(|r| r.temperature).sum::<f64>() / recent.len() as f64;
    mean <= FREEZING
}

/// Evaluate every indicator. `records` must end with the query hour and reach
/// back at least as far as the longest window.
pub fn evaluate(
    tuning: &Tuning,
    region: &RegionProfile,
    records: &[HourRecord],
    snow: &SnowIceState,
) -> AlertSet {
    let window = |days: u32| tail(records, days as usize * 24);
    let suppressed = suppressed(snow, records);

    let (drought_index, drought_alert) = drought(region, window(tuning.drought_lookback_days));
    let (flood_ratio, flood_alert) =
        flood(region, window(tuning.flood_lookback_days), snow.melt_72h);
    let extreme_alerts = extremes(region, window(tuning.extreme_lookback_days));

    let mut alerts = Vec::new();
    if !suppressed {
        alerts.extend(drought_alert);
    }
    alerts.extend(flood_alert);
    alerts.extend(extreme_alerts);

    let wildfire = if suppressed {
        WildfireRisk {
            score: 0.0,
            level: FireDanger::Low,
        }
    } else {
        wildfire(drought_index, records)
    };

    AlertSet {
        alerts,
        wildfire,
        drought_index: if suppressed { 0.0 } else { drought_index },
        flood_ratio,
        suppressed,
    }
}

#[derive(Debug)]
pub struct EnvironmentService {
    tuning: Tuning,
    sets: Memo<(String, i64), AlertSet>,
}

impl EnvironmentService {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            tuning: tuning.clone(),
            sets: Memo::bounded("environment", tuning.derived_cache_capacity),
        }
    }

    fn lookback_hours(&self) -> u32 {
        let days = self
            .tuning
            .drought_lookback_days
            .max(self.tuning.flood_lookback_days)
            .max(self.tuning.extreme_lookback_days)
            .max(3);
        days * 24
    }

    pub fn conditions(
        &self,
        generator: &WeatherGenerator,
        region: &RegionProfile,
        date: &GameDate,
        snow: &SnowIceState,
    ) -> AlertSet {
        let key = (region.id.clone(), date.absolute_hour());
        self.sets.get_or_insert_with(key, || {
            let records = generator.history(region, date, self.lookback_hours());
            tracing::debug!(
                region = %region.id,
                %date,
                hours = records.len(),
                "evaluating environment"
            );
            evaluate(&self.tuning, region, &records, snow)
        })
    }

    pub fn invalidate(&self, region_id: &str) {
        self.sets.retain(|(id, _)| id != region_id);
    }

    pub fn clear(&self) {
        self.sets.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.sets.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{LatitudeBand, SeasonStats, SeasonalProfile};
    use crate::weather::Precipitation;

    fn region() -> RegionProfile {
        let mut region = RegionProfile::new("valley", LatitudeBand::Temperate);
        region.temperature_profile = Some(SeasonalProfile::uniform(SeasonStats {
            mean: 60.0,
            variance: 10.0,
        }));
        region.humidity_profile = Some(SeasonalProfile::uniform(SeasonStats {
            mean: 60.0,
            variance: 10.0,
        }));
        region
    }

    fn records(days: i64, make: impl Fn(i64) -> (f64, Precipitation)) -> Vec<HourRecord> {
        let start = GameDate::new(100, 6, 1, 0).expect("valid").absolute_hour();
        (0..days * 24)
            .map(|offset| {
                let (temperature, precipitation) = make(offset);
                HourRecord {
                    absolute_hour: start + offset,
                    temperature,
                    dew_point: temperature - 20.0,
                    humidity: 30.0,
                    wind_speed: 20.0,
                    pattern: PatternKind::HighPressure,
                    precipitation,
                    wet_streak: 0,
                    forced_dry: false,
                    temperature_defaulted: false,
                    humidity_defaulted: false,
                }
            })
            .collect()
    }

    #[test]
    fn bone_dry_month_is_an_extreme_drought() {
        let dry = records(30, |_| (75.0, Precipitation::none()));
        let (index, alert) = drought(&region(), &dry);
        assert_eq!(index, 1.0);
        assert_eq!(alert.map(|a| a.severity), Some(Severity::Extreme));
    }

    #[test]
    fn daily_rain_is_not_a_drought() {
        let wet = records(30, |hour| {
            if hour % 24 == 6 {
                (60.0, Precipitation::wet(PrecipitationType::Rain, Intensity::Light))
            } else {
                (60.0, Precipitation::none())
            }
        });
        let (index, alert) = drought(&region(), &wet);
        assert_eq!(index, 0.0);
        assert!(alert.is_none());
    }

    #[test]
    fn relentless_heavy_rain_floods() {
        let deluge = records(14, |_| {
            (60.0, Precipitation::wet(PrecipitationType::Rain, Intensity::Heavy))
        });
        let (ratio, alert) = flood(&region(), &deluge, 0.0);
        assert!(ratio.expect("expected load") > 3.5);
        assert_eq!(alert.map(|a| a.severity), Some(Severity::Extreme));
    }

    #[test]
    fn heat_wave_counts_trailing_days() {
        let hot = records(7, |hour| {
            let day = hour / 24;
            let temperature = if day >= 3 { 90.0 } else { 60.0 };
            (temperature, Precipitation::none())
        });
        let alerts = extremes(&region(), &hot);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::HeatWave);
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[test]
    fn snow_cover_suppresses_drought_and_fire() {
        let dry = records(30, |_| (80.0, Precipitation::none()));
        let tuning = Tuning::default();
        let bare = evaluate(&tuning, &region(), &dry, &SnowIceState::bare());
        assert!(bare.severity(AlertKind::Drought).is_some());
        assert!(bare.wildfire.score > 0.0);

        let snowy = SnowIceState {
            snow_depth: 3.0,
            ..SnowIceState::bare()
        };
        let covered = evaluate(&tuning, &region(), &dry, &snowy);
        assert!(covered.suppressed);
        assert!(covered.severity(AlertKind::Drought).is_none());
        assert_eq!(covered.wildfire.level, FireDanger::Low);
        assert_eq!(covered.wildfire.score, 0.0);
    }

    #[test]
    fn frozen_spell_suppresses_fire() {
        let frozen = records(30, |_| (10.0, Precipitation::none()));
        let set = evaluate(&Tuning::default(), &region(), &frozen, &SnowIceState::bare());
        assert!(set.suppressed);
        assert_eq!(set.wildfire.score, 0.0);
    }
}
