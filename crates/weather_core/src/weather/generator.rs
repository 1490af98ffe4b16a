use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::calendar::GameDate;
use crate::celestial::sun::is_daylight;
use crate::config::Tuning;
use crate::error::{Error, Result};
use crate::region::RegionProfile;
use crate::rng;

use super::atmosphere::{
    cloud_cover, fog_forms, pressure_trend, pressure_value, visibility, Pressure,
};
use super::condition::{classify, effects, feels_like, thunderstorm_probability, Condition, Sky};
use super::pattern::{PatternService, PatternSnapshot};
use super::precipitation::Precipitation;
use super::timeline::{HourRecord, Timeline};
use super::wind::{self, storm_boost, Wind};

/// Longest forecast a single call may request.
pub const MAX_FORECAST_HOURS: u32 = 24 * 14;
const PRESSURE_TREND_HOURS: i64 = 3;

/// Weather at one hour for one region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub region_id: String,
    pub date: GameDate,
    pub temperature: f64,
    pub feels_like: f64,
    pub condition: Condition,
    pub precipitation: Precipitation,
    pub wind: Wind,
    pub humidity: f64,
    pub dew_point: f64,
    pub pressure: Pressure,
    pub cloud_cover: f64,
    /// Miles.
    pub visibility: f64,
    pub pattern: PatternSnapshot,
    pub is_daytime: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub effects: Vec<String>,
    /// Defaults substituted while generating this snapshot.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub region_id: String,
    pub date: GameDate,
    pub high: f64,
    pub low: f64,
    pub mean_temperature: f64,
    pub precipitation_hours: u32,
    pub dominant_condition: Condition,
    pub max_wind: f64,
}

#[derive(Debug)]
pub struct WeatherGenerator {
    patterns: PatternService,
    timeline: Timeline,
}

impl WeatherGenerator {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            patterns: PatternService::new(tuning),
            timeline: Timeline::new(tuning),
        }
    }

    pub fn patterns(&self) -> &PatternService {
        &self.patterns
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn record(&self, region: &RegionProfile, date: &GameDate) -> HourRecord {
        self.timeline
            .record(region, &self.patterns, date.absolute_hour())
    }

    /// The `hours` records ending with `date`, oldest first.
    pub fn history(&self, region: &RegionProfile, date: &GameDate, hours: u32) -> Vec<HourRecord> {
        let end = date.absolute_hour() + 1;
        self.timeline
            .records(region, &self.patterns, end - i64::from(hours), end)
    }

    pub fn generate(&self, region: &RegionProfile, date: &GameDate) -> WeatherSnapshot {
        let record = self.record(region, date);
        self.compose(region, date, &record)
    }

    pub fn forecast(
        &self,
        region: &RegionProfile,
        start: &GameDate,
        hours: u32,
    ) -> Result<Vec<WeatherSnapshot>> {
        if hours > MAX_FORECAST_HOURS {
            return Err(Error::InvalidForecastLength {
                requested: hours,
                max: MAX_FORECAST_HOURS,
            });
        }
        let from = start.absolute_hour();
        let records = self
            .timeline
            .records(region, &self.patterns, from, from + i64::from(hours));
        Ok(records
            .iter()
            .map(|record| self.compose(region, &record.date(), record))
            .collect())
    }

    pub fn daily_summary(&self, region: &RegionProfile, date: &GameDate) -> DailySummary {
        let day = date.start_of_day();
        let snapshots: Vec<WeatherSnapshot> = (0..24)
            .map(|hour| self.generate(region, &day.advance(hour)))
            .collect();

        let temperatures = snapshots.iter().map(|s| s.temperature);
        let high = temperatures.clone().fold(f64::MIN, f64::max);
        let low = temperatures.clone().fold(f64::MAX, f64::min);
        let mean_temperature = temperatures.sum::<f64>() / snapshots.len() as f64;

        let mut tally: Vec<(Condition, u32)> = Vec::new();
        for snapshot in &snapshots {
            match tally.iter_mut().find(|(c, _)| *c == snapshot.condition) {
                Some(entry) => entry.1 += 1,
                None => tally.push((snapshot.condition, 1)),
            }
        }
        // Ties go to whichever condition appeared first in the day.
        let dominant_condition = tally
            .iter()
            .fold(None::<(Condition, u32)>, |best, &(condition, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((condition, count)),
            })
            .map(|(condition, _)| condition)
            .unwrap_or(Condition::Clear);

        DailySummary {
            region_id: region.id.clone(),
            date: day,
            high,
            low,
            mean_temperature,
            precipitation_hours: snapshots
                .iter()
                .filter(|s| s.precipitation.is_wet())
                .count() as u32,
            dominant_condition,
            max_wind: snapshots.iter().map(|s| s.wind.speed).fold(0.0, f64::max),
        }
    }

    pub fn invalidate(&self, region_id: &str) {
        self.patterns.invalidate(region_id);
        self.timeline.invalidate(region_id);
    }

    pub fn clear(&self) {
        self.patterns.clear();
        self.timeline.clear();
    }

    pub fn stats(&self) -> [(&'static str, CacheStats); 2] {
        [
            ("pattern-cycles", self.patterns.stats()),
            ("timeline-epochs", self.timeline.stats()),
        ]
    }

    fn compose(
        &self,
        region: &RegionProfile,
        date: &GameDate,
        record: &HourRecord,
    ) -> WeatherSnapshot {
        let pattern = self.patterns.snapshot(&region.id, date);
        let traits = pattern.kind.traits();
        let is_daytime = is_daylight(region.latitude_band, date);
        let precipitation = record.precipitation;

        let fog = !precipitation.is_wet()
            && fog_forms(region, date, record.humidity, record.wind_speed, is_daytime);
        let clouds = cloud_cover(region, date, traits.clear_skies, &precipitation);
        let sky = Sky {
            precipitation,
            temperature: record.temperature,
            wind_speed: record.wind_speed,
            cloud_cover: clouds,
            fog,
            thunderstorm_probability: thunderstorm_probability(region, date, record.temperature),
        };
        let mut stream = rng::stream(&region.id, date, &format!("condition:{}", date.hour));
        let condition = classify(&sky, &mut stream);

        let mut speed = record.wind_speed;
        if condition.is_storm() {
            speed += storm_boost(
                &mut stream,
                condition == Condition::Thunderstorm,
                region.factor_or("tornadoRisk", 0.0),
            );
        }
        let wind = wind::build(region, date, pattern.kind, speed);
        let feels = feels_like(record.temperature, speed, record.humidity);
        let miles = visibility(&precipitation, record.humidity, condition == Condition::Fog);

        let earlier = date.advance(-PRESSURE_TREND_HOURS);
        let earlier_offset = self.patterns.snapshot(&region.id, &earlier).pressure_offset;
        let now = pressure_value(region, date, pattern.pressure_offset);
        let pressure = Pressure {
            value: now,
            trend: pressure_trend(now, pressure_value(region, &earlier, earlier_offset)),
        };

        let mut notes = Vec::new();
        if record.temperature_defaulted {
            notes.push("no temperature profile; seasonal mean defaulted to 70°F".to_string());
        }
        if record.humidity_defaulted {
            notes.push("no humidity profile; seasonal mean defaulted to 50%".to_string());
        }

        WeatherSnapshot {
            region_id: region.id.clone(),
            date: *date,
            temperature: record.temperature,
            feels_like: feels,
            condition,
            precipitation,
            wind,
            humidity: record.humidity,
            dew_point: record.dew_point,
            pressure,
            cloud_cover: clouds,
            visibility: miles,
            pattern,
            is_daytime,
            effects: effects(condition, record.temperature, feels, speed, miles),
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{LatitudeBand, SeasonStats, SeasonalProfile};

    fn region() -> RegionProfile {
        let mut region = RegionProfile::new("highland", LatitudeBand::Temperate);
        region.temperature_profile = Some(SeasonalProfile {
            winter: SeasonStats { mean: 25.0, variance: 12.0 },
            spring: SeasonStats { mean: 50.0, variance: 12.0 },
            summer: SeasonStats { mean: 75.0, variance: 10.0 },
            fall: SeasonStats { mean: 50.0, variance: 12.0 },
        });
        region
    }

    #[test]
    fn forecast_matches_single_hour_generation() {
        let generator = WeatherGenerator::new(&Tuning::default());
        let region = region();
        let start = GameDate::new(700, 2, 27, 20).expect("valid");
        let forecast = generator.forecast(&region, &start, 48).expect("forecast");
        assert_eq!(forecast.len(), 48);
        for (offset, snapshot) in forecast.iter().enumerate() {
            let direct = generator.generate(&region, &start.advance(offset as i64));
            assert_eq!(&direct, snapshot);
        }
    }

    #[test]
    fn overlong_forecast_is_rejected() {
        let generator = WeatherGenerator::new(&Tuning::default());
        let start = GameDate::new(1, 1, 1, 0).expect("valid");
        let err = generator
            .forecast(&region(), &start, MAX_FORECAST_HOURS + 1)
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidForecastLength {
                requested: MAX_FORECAST_HOURS + 1,
                max: MAX_FORECAST_HOURS
            }
        );
    }

    #[test]
    fn missing_profiles_are_noted() {
        let generator = WeatherGenerator::new(&Tuning::default());
        let bare = RegionProfile::new("bare", LatitudeBand::Tropical);
        let snapshot = generator.generate(&bare, &GameDate::new(3, 4, 5, 6).expect("valid"));
        assert_eq!(snapshot.notes.len(), 2);
    }

    #[test]
    fn daily_summary_brackets_the_day() {
        let generator = WeatherGenerator::new(&Tuning::default());
        let region = region();
        let date = GameDate::new(12, 7, 1, 9).expect("valid");
        let summary = generator.daily_summary(&region, &date);
        assert!(summary.high >= summary.mean_temperature);
        assert!(summary.low <= summary.mean_temperature);
        assert!(summary.precipitation_hours <= 24);
        assert_eq!(summary.date, date.start_of_day());
    }
}
