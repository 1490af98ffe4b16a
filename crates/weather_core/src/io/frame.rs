use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::celestial::CelestialState;
use crate::derived::environment::Alert;
use crate::derived::{GroundTemperature, SeaStateSnapshot, SnowIceState};
use crate::weather::{DailySummary, WeatherSnapshot};

/// One NDJSON line of forecast output: a region at one hour.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastFrame {
    /// Hours since the start of the run.
    pub t: u32,
    pub region: String,
    pub date: String,
    pub weather: WeatherSnapshot,
    pub sky: CelestialState,
    pub snow: Option<SnowIceState>,
    pub ground: Option<GroundTemperature>,
    pub sea: Option<SeaStateSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alerts: Vec<Alert>,
}

impl ForecastFrame {
    pub fn new(t: u32, weather: WeatherSnapshot, sky: CelestialState) -> Self {
        Self {
            t,
            region: weather.region_id.clone(),
            date: weather.date.to_string(),
            weather,
            sky,
            snow: None,
            ground: None,
            sea: None,
            alerts: Vec::new(),
        }
    }

    /// Snow only appears in the frame while there is something on the ground.
    pub fn with_snow(mut self, snow: SnowIceState) -> Self {
        let present = snow.snow_depth > 0.0 || snow.ice_thickness > 0.0;
        self.snow = present.then_some(snow);
        self
    }

    pub fn with_ground(mut self, ground: GroundTemperature) -> Self {
        self.ground = Some(ground);
        self
    }

    pub fn with_sea(mut self, sea: Option<SeaStateSnapshot>) -> Self {
        self.sea = sea;
        self
    }

    pub fn with_alerts(mut self, alerts: Vec<Alert>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        to_ndjson(self)
    }
}

/// Serialize any record as a single newline-terminated JSON line.
pub fn to_ndjson<T: Serialize>(record: &T) -> serde_json::Result<String> {
    let mut json = serde_json::to_string(record)?;
    json.push('\n');
    Ok(json)
}

pub fn summary_line(summary: &DailySummary) -> serde_json::Result<String> {
    to_ndjson(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::GameDate;
    use crate::celestial::moon::MoonService;
    use crate::celestial::sun::SunService;
    use crate::celestial::{celestial_state, Observer};
    use crate::config::Tuning;
    use crate::region::{LatitudeBand, RegionProfile};
    use crate::weather::WeatherGenerator;

    fn frame() -> ForecastFrame {
        let region = RegionProfile::new("moor", LatitudeBand::Temperate);
        let date = GameDate::new(88, 11, 2, 6).expect("valid");
        let generator = WeatherGenerator::new(&Tuning::default());
        let sky = celestial_state(
            &SunService::new(15, 0.001),
            &MoonService::new(15, 0.001),
            &Observer::new(region.latitude_band),
            &date,
        );
        ForecastFrame::new(3, generator.generate(&region, &date), sky)
    }

    #[test]
    fn frame_is_one_json_line() {
        let line = frame().to_ndjson().expect("frame serializes");
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).expect("valid json");
        assert_eq!(value.get("t").and_then(|v| v.as_u64()), Some(3));
        assert_eq!(value.get("region").and_then(|v| v.as_str()), Some("moor"));
        assert_eq!(value.get("date").and_then(|v| v.as_str()), Some("0088-11-02 06:00"));
        assert!(value.get("weather").is_some());
    }

    #[test]
    fn empty_sections_are_omitted() {
        let line = frame()
            .with_snow(SnowIceState::bare())
            .with_sea(None)
            .to_ndjson()
            .expect("frame serializes");
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).expect("valid json");
        let map = value.as_object().expect("frame is object");
        for key in ["snow", "ground", "sea", "alerts"] {
            assert!(!map.contains_key(key), "{} should be omitted", key);
        }
    }
}
