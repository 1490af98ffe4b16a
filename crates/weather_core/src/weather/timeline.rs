//! Hour-by-hour replay of the history-dependent weather state.
//!
//! Precipitation occurrence and type depend on what happened in the preceding
//! hours. Rather than persisting that state, time is cut into fixed epochs
//! aligned on absolute days and each epoch is produced by one forward replay
//! that starts cold a warm-up window before the epoch. The live generator and
//! every historical service read the same epoch records, so each hour has
//! exactly one precipitation state.
//!
//! Two replays meet at every epoch seam. The records of an epoch are settled
//! against the tail of the previous epoch's raw replay so that streak caps and
//! the rain/snow guard hold across the seam as well.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, Memo};
use crate::calendar::GameDate;
use crate::config::{StreakCaps, Tuning};
use crate::region::RegionProfile;
use crate::rng::{self, SeededRandom};

use super::atmosphere::{dew_point, relative_humidity, target_humidity};
use super::pattern::{PatternKind, PatternService};
use super::precipitation::{
    block_intensity, continue_probability, guard_transition, occurrence_modifier, resolve_type,
    start_probability, streak_fatigue, Precipitation, PrecipitationType, TypeSample,
};
use super::temperature::base_temperature;
use super::wind;

/// Chance per hour that a forced dry break ends early.
const BREAK_ESCAPE: f64 = 0.05;

/// Everything the replay decides for one hour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourRecord {
    pub absolute_hour: i64,
    pub temperature: f64,
    pub dew_point: f64,
    pub humidity: f64,
    /// Sustained wind before any storm boost, mph.
    pub wind_speed: f64,
    pub pattern: PatternKind,
    pub precipitation: Precipitation,
    /// Consecutive precipitation hours ending with this one.
    pub wet_streak: u32,
    pub forced_dry: bool,
    pub temperature_defaulted: bool,
    pub humidity_defaulted: bool,
}

impl HourRecord {
    pub fn date(&self) -> GameDate {
        GameDate::from_absolute_hour(self.absolute_hour)
    }

    pub fn is_wet(&self) -> bool {
        self.precipitation.is_wet()
    }
}

type EpochKey = (String, i64);

#[derive(Debug)]
pub struct Timeline {
    tuning: Tuning,
    raw: Memo<EpochKey, Arc<Vec<HourRecord>>>,
    settled: Memo<EpochKey, Arc<Vec<HourRecord>>>,
}

impl Timeline {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            tuning: tuning.clone(),
            raw: Memo::new("timeline-raw"),
            settled: Memo::new("timeline-epochs"),
        }
    }

    pub fn epoch_hours(&self) -> i64 {
        self.tuning.epoch_hours()
    }

    pub fn epoch_of(&self, absolute_hour: i64) -> i64 {
        absolute_hour.div_euclid(self.epoch_hours())
    }

    /// Settled records for one epoch.
    pub fn epoch(
        &self,
        region: &RegionProfile,
        patterns: &PatternService,
        epoch: i64,
    ) -> Arc<Vec<HourRecord>> {
        self.settled
            .get_or_insert_with((region.id.clone(), epoch), || {
                let previous = self.raw_epoch(region, patterns, epoch - 1);
                let current = self.raw_epoch(region, patterns, epoch);
                Arc::new(self.settle(region, &previous, current.as_ref().clone()))
            })
    }

    pub fn record(
        &self,
        region: &RegionProfile,
        patterns: &PatternService,
        absolute_hour: i64,
    ) -> HourRecord {
        let epoch = self.epoch_of(absolute_hour);
        let records = self.epoch(region, patterns, epoch);
        let index = (absolute_hour - epoch * self.epoch_hours()) as usize;
        records[index].clone()
    }

    /// Records for `[from, to)` in hour order.
    pub fn records(
        &self,
        region: &RegionProfile,
        patterns: &PatternService,
        from: i64,
        to: i64,
    ) -> Vec<HourRecord> {
        if to <= from {
            return Vec::new();
        }
        let epoch_hours = self.epoch_hours();
        let mut out = Vec::with_capacity((to - from) as usize);
        for epoch in self.epoch_of(from)..=self.epoch_of(to - 1) {
            let records = self.epoch(region, patterns, epoch);
            let start = epoch * epoch_hours;
            let lo = (from.max(start) - start) as usize;
            let hi = (to.min(start + epoch_hours) - start) as usize;
            out.extend_from_slice(&records[lo..hi]);
        }
        out
    }

    pub fn invalidate(&self, region_id: &str) {
        self.raw.retain(|(id, _)| id != region_id);
        self.settled.retain(|(id, _)| id != region_id);
    }

    pub fn clear(&self) {
        self.raw.clear();
        self.settled.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.settled.stats()
    }

    fn raw_epoch(
        &self,
        region: &RegionProfile,
        patterns: &PatternService,
        epoch: i64,
    ) -> Arc<Vec<HourRecord>> {
        self.raw.get_or_insert_with((region.id.clone(), epoch), || {
            Arc::new(self.replay(region, patterns, epoch))
        })
    }

    fn caps(&self, region: &RegionProfile) -> StreakCaps {
        self.tuning.streak_caps.caps(region.archetype())
    }

    fn replay(
        &self,
        region: &RegionProfile,
        patterns: &PatternService,
        epoch: i64,
    ) -> Vec<HourRecord> {
        let epoch_hours = self.epoch_hours();
        let start = epoch * epoch_hours;
        let begin = start - i64::from(self.tuning.replay_warmup_hours);
        let caps = self.caps(region);
        let history_hours = self.tuning.type_history_hours as usize;
        let trend_hours = self.tuning.trend_hours as usize;

        tracing::debug!(region = %region.id, epoch, begin, "replaying weather epoch");

        let mut history: VecDeque<TypeSample> = VecDeque::with_capacity(history_hours + 1);
        let mut wet_streak = 0u32;
        let mut break_left = 0u32;
        let mut records = Vec::with_capacity(epoch_hours as usize);

        for absolute_hour in begin..start + epoch_hours {
            let date = GameDate::from_absolute_hour(absolute_hour);
            let pattern = patterns.snapshot(&region.id, &date);
            let traits = pattern.kind.traits();
            let reading = base_temperature(region, &date);
            let temperature = reading.value + pattern.temp_modifier;
            let modifier = occurrence_modifier(region, &date);

            let mut stream = SeededRandom::new(rng::seed(
                &region.id,
                &date,
                &format!("precipitation:{}", date.hour),
            ));
            let roll = stream.next();
            let mut forced_dry = false;
            let wet = if wet_streak >= caps.hard {
                tracing::debug!(
                    region = %region.id,
                    absolute_hour,
                    streak = wet_streak,
                    "forcing dry break at streak cap"
                );
                break_left = self.tuning.forced_break_hours.saturating_sub(1);
                forced_dry = true;
                false
            } else if break_left > 0 {
                break_left -= 1;
                if stream.chance(BREAK_ESCAPE) {
                    break_left = 0;
                    roll < start_probability(traits.precipitation_chance, modifier)
                } else {
                    forced_dry = true;
                    false
                }
            } else if wet_streak > 0 {
                let fatigue = streak_fatigue(
                    wet_streak,
                    caps,
                    self.tuning.streak_decay,
                    self.tuning.streak_floor,
                );
                roll < continue_probability(traits.precipitation_chance, modifier, fatigue)
            } else {
                roll < start_probability(traits.precipitation_chance, modifier)
            };

            let precipitation = if wet {
                let intensity = block_intensity(&region.id, absolute_hour, pattern.kind);
                let kind = resolve_type(
                    temperature,
                    history.make_contiguous(),
                    trend_hours,
                    &mut stream,
                );
                Precipitation::wet(kind, intensity)
            } else {
                Precipitation::none()
            };
            wet_streak = if wet { wet_streak + 1 } else { 0 };

            history.push_back(TypeSample {
                kind: precipitation.kind,
                temperature,
            });
            while history.len() > history_hours {
                history.pop_front();
            }

            if absolute_hour < start {
                continue;
            }
            let (target, humidity_defaulted) = target_humidity(region, &date, pattern.kind);
            let dew = dew_point(temperature, target, &precipitation);
            records.push(HourRecord {
                absolute_hour,
                temperature,
                dew_point: dew,
                humidity: relative_humidity(temperature, dew),
                wind_speed: wind::base_speed(region, &date, pattern.kind),
                pattern: pattern.kind,
                precipitation,
                wet_streak,
                forced_dry,
                temperature_defaulted: reading.defaulted,
                humidity_defaulted,
            });
        }
        records
    }

    /// Reconcile an epoch with the previous epoch's tail: cap the wet run that
    /// crosses the seam, then re-apply the rain/snow guard over the whole epoch.
    fn settle(
        &self,
        region: &RegionProfile,
        previous: &[HourRecord],
        mut records: Vec<HourRecord>,
    ) -> Vec<HourRecord> {
        let caps = self.caps(region);
        let history_hours = self.tuning.type_history_hours as usize;
        let mut adjusted = 0usize;

        let mut streak = previous
            .iter()
            .rev()
            .take_while(|record| record.is_wet())
            .count() as u32;
        for record in records.iter_mut() {
            if !record.is_wet() {
                streak = 0;
            } else if streak >= caps.hard {
                let date = record.date();
                let (target, _) = target_humidity(region, &date, record.pattern);
                record.precipitation = Precipitation::none();
                record.forced_dry = true;
                record.dew_point = dew_point(record.temperature, target, &record.precipitation);
                record.humidity = relative_humidity(record.temperature, record.dew_point);
                streak = 0;
                adjusted += 1;
            } else {
                streak += 1;
            }
            record.wet_streak = streak;
        }

        let tail_start = previous.len().saturating_sub(history_hours);
        let mut window: VecDeque<PrecipitationType> = previous[tail_start..]
            .iter()
            .map(|record| record.precipitation.kind)
            .collect();
        for record in records.iter_mut() {
            if record.is_wet() {
                let last_wet = window.iter().rev().find(|kind| kind.is_wet()).copied();
                let guarded = guard_transition(record.precipitation.kind, last_wet);
                if guarded != record.precipitation.kind {
                    record.precipitation.kind = guarded;
                    adjusted += 1;
                }
            }
            window.push_back(record.precipitation.kind);
            while window.len() > history_hours {
                window.pop_front();
            }
        }

        if adjusted > 0 {
            tracing::debug!(region = %region.id, adjusted, "settled epoch seam");
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{LatitudeBand, SeasonStats, SeasonalProfile};

    fn region() -> RegionProfile {
        let mut region = RegionProfile::new("marsh", LatitudeBand::Temperate);
        region.temperature_profile = Some(SeasonalProfile::uniform(SeasonStats {
            mean: 34.0,
            variance: 12.0,
        }));
        region.humidity_profile = Some(SeasonalProfile::uniform(SeasonStats {
            mean: 80.0,
            variance: 10.0,
        }));
        region
    }

    fn services() -> (Timeline, PatternService) {
        let tuning = Tuning::default();
        (Timeline::new(&tuning), PatternService::new(&tuning))
    }

    #[test]
    fn epochs_are_contiguous() {
        let (timeline, patterns) = services();
        let region = region();
        let from = 200_000;
        let records = timeline.records(&region, &patterns, from, from + 1_000);
        assert_eq!(records.len(), 1_000);
        for (offset, record) in records.iter().enumerate() {
            assert_eq!(record.absolute_hour, from + offset as i64);
        }
    }

    #[test]
    fn single_record_matches_range() {
        let (timeline, patterns) = services();
        let region = region();
        let hour = 123_457;
        let single = timeline.record(&region, &patterns, hour);
        let range = timeline.records(&region, &patterns, hour - 5, hour + 5);
        assert_eq!(range[5], single);
    }

    #[test]
    fn seams_respect_cap_and_guard() {
        let (timeline, patterns) = services();
        let region = region();
        let hard = Tuning::default().streak_caps.caps(region.archetype()).hard;
        let records = timeline.records(&region, &patterns, 0, 24 * 200);
        let mut run = 0;
        let mut last_wet: Option<(PrecipitationType, i64)> = None;
        for record in &records {
            if record.is_wet() {
                run += 1;
                assert!(run <= hard, "run {run} at {}", record.absolute_hour);
                if let Some((kind, hour)) = last_wet {
                    if record.absolute_hour - hour <= 12 {
                        assert_eq!(
                            guard_transition(record.precipitation.kind, Some(kind)),
                            record.precipitation.kind
                        );
                    }
                }
                last_wet = Some((record.precipitation.kind, record.absolute_hour));
            } else {
                run = 0;
            }
        }
    }

    #[test]
    fn dew_point_never_exceeds_temperature() {
        let (timeline, patterns) = services();
        for record in timeline.records(&region(), &patterns, -5_000, -3_000) {
            assert!(record.dew_point <= record.temperature);
            assert!((0.0..=100.0).contains(&record.humidity));
        }
    }

    #[test]
    fn invalidate_forces_recompute() {
        let (timeline, patterns) = services();
        let region = region();
        timeline.record(&region, &patterns, 10);
        assert_eq!(timeline.stats().entries, 1);
        timeline.invalidate("marsh");
        assert_eq!(timeline.stats().entries, 0);
    }
}
