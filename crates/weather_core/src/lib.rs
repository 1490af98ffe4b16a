pub mod cache;
pub mod calendar;
pub mod celestial;
pub mod config;
pub mod derived;
pub mod error;
pub mod io;
pub mod region;
pub mod rng;
#[cfg(any(test, feature = "proptest-support"))]
pub mod strategies;
pub mod weather;

use cache::CacheStats;
use calendar::GameDate;
use celestial::geometry::{DEFAULT_MOON_PHASE, DEFAULT_SUN_PHASE};
use celestial::moon::{LunarPhase, MoonService, MoonTimes};
use celestial::sun::{SunService, SunriseSunset};
use celestial::{CelestialState, Observer};
use config::Tuning;
use derived::{
    ground, sea_state, AccumulationService, AlertSet, EnvironmentService, GroundTemperature,
    SeaStateSnapshot, SnowIceState,
};
use region::{LatitudeBand, RegionProfile};
use weather::{DailySummary, WeatherGenerator, WeatherSnapshot};

pub use error::{Error, Result};

/// Entry point to the engine: every read operation, with the caches behind them.
///
/// Each answer is a pure function of its inputs. The caches only save work, so
/// one `Almanac` can be shared across threads and queried in any order.
#[derive(Debug)]
pub struct Almanac {
    tuning: Tuning,
    sun: SunService,
    moon: MoonService,
    weather: WeatherGenerator,
    accumulation: AccumulationService,
    environment: EnvironmentService,
}

impl Default for Almanac {
    fn default() -> Self {
        Self::new(Tuning::default())
    }
}

impl Almanac {
    pub fn new(tuning: Tuning) -> Self {
        let tuning = tuning.sanitized();
        Self {
            sun: SunService::new(tuning.sample_minutes, tuning.bisection_tolerance_hours),
            moon: MoonService::new(tuning.sample_minutes, tuning.bisection_tolerance_hours),
            weather: WeatherGenerator::new(&tuning),
            accumulation: AccumulationService::new(&tuning),
            environment: EnvironmentService::new(&tuning),
            tuning,
        }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn weather(&self) -> &WeatherGenerator {
        &self.weather
    }

    #[tracing::instrument(level = "trace", skip_all, fields(region = %region.id, date = %date))]
    pub fn generate_weather(
        &self,
        region: &RegionProfile,
        date: &GameDate,
    ) -> Result<WeatherSnapshot> {
        region.validate()?;
        let date = date.validate()?;
        Ok(self.weather.generate(region, &date))
    }

    /// Sun times for the band and day, with daylight evaluated at the date's hour.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn sunrise_sunset(
        &self,
        band: LatitudeBand,
        date: &GameDate,
        observer_angle: f64,
    ) -> Result<SunriseSunset> {
        let date = date.validate()?;
        Ok(self
            .sun
            .sunrise_sunset(band, &date, observer_angle, DEFAULT_SUN_PHASE))
    }

    #[tracing::instrument(level = "trace", skip(self))]
    pub fn lunar_phase(
        &self,
        date: &GameDate,
        moon_phase: f64,
        sun_phase: f64,
    ) -> Result<LunarPhase> {
        let date = date.validate()?;
        Ok(self.moon.lunar_phase(&date, moon_phase, sun_phase))
    }

    #[tracing::instrument(level = "trace", skip(self))]
    pub fn moon_rise_set(&self, date: &GameDate, observer_angle: f64) -> Result<MoonTimes> {
        let date = date.validate()?;
        Ok(self
            .moon
            .moon_rise_set(&date, observer_angle, DEFAULT_MOON_PHASE))
    }

    /// Full sky state for the region's band at the date's hour.
    #[tracing::instrument(level = "trace", skip_all, fields(region = %region.id, date = %date))]
    pub fn celestial_state(
        &self,
        region: &RegionProfile,
        date: &GameDate,
    ) -> Result<CelestialState> {
        region.validate()?;
        let date = date.validate()?;
        let observer = Observer::new(region.latitude_band);
        Ok(celestial::celestial_state(&self.sun, &self.moon, &observer, &date))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(region = %region.id, date = %date))]
    pub fn accumulation(&self, region: &RegionProfile, date: &GameDate) -> Result<SnowIceState> {
        region.validate()?;
        let date = date.validate()?;
        Ok(self.accumulation.state(&self.weather, region, &date))
    }

    /// Sea state for the hour described by `weather`; `None` for inland regions.
    #[tracing::instrument(level = "trace", skip_all, fields(region = %region.id, date = %date))]
    pub fn sea_state(
        &self,
        region: &RegionProfile,
        date: &GameDate,
        weather: &WeatherSnapshot,
    ) -> Result<Option<SeaStateSnapshot>> {
        region.validate()?;
        let date = date.validate()?;
        Ok(sea_state::assess(region, &date, &weather.wind))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(region = %region.id, date = %date))]
    pub fn environmental_conditions(
        &self,
        region: &RegionProfile,
        date: &GameDate,
    ) -> Result<AlertSet> {
        region.validate()?;
        let date = date.validate()?;
        let snow = self.accumulation.state(&self.weather, region, &date);
        Ok(self
            .environment
            .conditions(&self.weather, region, &date, &snow))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(region = %region.id, date = %date))]
    pub fn ground_temperature(
        &self,
        region: &RegionProfile,
        date: &GameDate,
    ) -> Result<GroundTemperature> {
        region.validate()?;
        let date = date.validate()?;
        let snow = self.accumulation.state(&self.weather, region, &date);
        let history = self
            .weather
            .history(region, &date, region.ground_type.lookback_hours());
        Ok(ground::assess(region.ground_type, &history, snow.snow_depth))
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(region = %region.id, start = %start, hours)
    )]
    pub fn forecast(
        &self,
        region: &RegionProfile,
        start: &GameDate,
        hours: u32,
    ) -> Result<Vec<WeatherSnapshot>> {
        region.validate()?;
        let start = start.validate()?;
        self.weather.forecast(region, &start, hours)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(region = %region.id, date = %date))]
    pub fn daily_summary(&self, region: &RegionProfile, date: &GameDate) -> Result<DailySummary> {
        region.validate()?;
        let date = date.validate()?;
        Ok(self.weather.daily_summary(region, &date))
    }

    pub fn cache_stats(&self) -> Vec<(&'static str, CacheStats)> {
        let mut stats = vec![("sun-days", self.sun.stats()), ("moon-days", self.moon.stats())];
        stats.extend(self.weather.stats());
        stats.push(("accumulation", self.accumulation.stats()));
        stats.push(("environment", self.environment.stats()));
        stats
    }

    pub fn clear_caches(&self) {
        self.sun.clear();
        self.moon.clear();
        self.weather.clear();
        self.accumulation.clear();
        self.environment.clear();
        tracing::debug!("cleared all caches");
    }

    /// Drop every cached answer for one region, e.g. after its profile was edited.
    pub fn invalidate_region(&self, region_id: &str) {
        self.weather.invalidate(region_id);
        self.accumulation.invalidate(region_id);
        self.environment.invalidate(region_id);
        tracing::debug!(region = region_id, "invalidated region caches");
    }
}
