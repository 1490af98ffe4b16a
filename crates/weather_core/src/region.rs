use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calendar::GameDate;
use crate::error::{Error, Result};

/// Fallbacks applied when a region carries no climate tables.
pub const DEFAULT_TEMPERATURE: SeasonStats = SeasonStats {
    mean: 70.0,
    variance: 10.0,
};
pub const DEFAULT_HUMIDITY: SeasonStats = SeasonStats {
    mean: 50.0,
    variance: 15.0,
};

/// Day-of-year mid-points of winter, spring, summer and autumn.
const SEASON_MIDPOINTS: [f64; 4] = [15.0, 105.0, 196.0, 288.0];
const HALF_YEAR_DAYS: f64 = 182.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LatitudeBand {
    Equatorial,
    Tropical,
    #[default]
    Temperate,
    Subarctic,
    Polar,
}

impl LatitudeBand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Equatorial => "equatorial",
            Self::Tropical => "tropical",
            Self::Temperate => "temperate",
            Self::Subarctic => "subarctic",
            Self::Polar => "polar",
        }
    }

    /// Observer distance from the disc centre.
    pub fn observer_radius(&self) -> f64 {
        match self {
            Self::Polar => 150.0,
            Self::Subarctic => 2_400.0,
            Self::Temperate => 4_000.0,
            Self::Tropical => 5_000.0,
            Self::Equatorial => 5_800.0,
        }
    }

    pub fn typical_latitude(&self) -> f64 {
        match self {
            Self::Equatorial => 5.0,
            Self::Tropical => 20.0,
            Self::Temperate => 45.0,
            Self::Subarctic => 60.0,
            Self::Polar => 75.0,
        }
    }

    /// Direction (degrees, meteorological "from") of the prevailing surface wind.
    pub fn prevailing_wind(&self) -> f64 {
        match self {
            Self::Equatorial | Self::Tropical => 80.0,
            Self::Temperate => 260.0,
            Self::Subarctic => 240.0,
            Self::Polar => 60.0,
        }
    }
}

impl fmt::Display for LatitudeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LatitudeBand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equatorial" | "equator" => Ok(Self::Equatorial),
            "tropical" | "subtropical" => Ok(Self::Tropical),
            "temperate" => Ok(Self::Temperate),
            "subarctic" | "subpolar" | "boreal" => Ok(Self::Subarctic),
            "polar" | "arctic" | "antarctic" => Ok(Self::Polar),
            _ => Err(Error::UnknownLatitudeBand(s.to_string())),
        }
    }
}

impl TryFrom<String> for LatitudeBand {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LatitudeBand> for String {
    fn from(band: LatitudeBand) -> Self {
        band.label().to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonStats {
    pub mean: f64,
    pub variance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProfile {
    pub winter: SeasonStats,
    pub spring: SeasonStats,
    pub summer: SeasonStats,
    #[serde(alias = "autumn")]
    pub fall: SeasonStats,
}

impl SeasonalProfile {
    pub fn uniform(stats: SeasonStats) -> Self {
        Self {
            winter: stats,
            spring: stats,
            summer: stats,
            fall: stats,
        }
    }

    /// Linear interpolation between season mid-points, wrapping across the year.
    pub fn sample(&self, day_of_year: u16, southern: bool) -> SeasonStats {
        let mut day = f64::from(day_of_year);
        if southern {
            day = (day - 1.0 + HALF_YEAR_DAYS).rem_euclid(365.0) + 1.0;
        }
        if day < SEASON_MIDPOINTS[0] {
            day += 365.0;
        }
        let values = [self.winter, self.spring, self.summer, self.fall, self.winter];
        let points = [
            SEASON_MIDPOINTS[0],
            SEASON_MIDPOINTS[1],
            SEASON_MIDPOINTS[2],
            SEASON_MIDPOINTS[3],
            SEASON_MIDPOINTS[0] + 365.0,
        ];
        let mut segment = 3;
        for i in 0..4 {
            if day < points[i + 1] {
                segment = i;
                break;
            }
        }
        let span = points[segment + 1] - points[segment];
        let t = ((day - points[segment]) / span).clamp(0.0, 1.0);
        let from = values[segment];
        let to = values[segment + 1];
        SeasonStats {
            mean: from.mean + (to.mean - from.mean) * t,
            variance: from.variance + (to.variance - from.variance) * t,
        }
    }
}

/// Special factors arrive as either numbers or flags.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorValue {
    Flag(bool),
    Number(f64),
}

impl FactorValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Flag(true) => 1.0,
            Self::Flag(false) => 0.0,
            Self::Number(value) => *value,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroundType {
    Sand,
    Rock,
    #[default]
    Soil,
    Clay,
    Peat,
    Permafrost,
}

impl GroundType {
    /// Hours of air temperature history the ground responds to.
    pub fn lookback_hours(&self) -> u32 {
        match self {
            Self::Sand => 12,
            Self::Rock => 24,
            Self::Soil => 36,
            Self::Clay => 48,
            Self::Peat => 60,
            Self::Permafrost => 72,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Enclosure {
    #[default]
    OpenOcean,
    Coastal,
    Strait,
    Bay,
    Lake,
    Harbor,
}

impl Enclosure {
    /// Fraction of open-ocean wave height the available fetch allows.
    pub fn fetch_factor(&self) -> f64 {
        match self {
            Self::OpenOcean => 1.0,
            Self::Coastal => 0.8,
            Self::Strait => 0.6,
            Self::Bay => 0.5,
            Self::Lake => 0.35,
            Self::Harbor => 0.2,
        }
    }

    pub fn receives_swell(&self) -> bool {
        !matches!(self, Self::Lake | Self::Harbor)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarineProfile {
    #[serde(default)]
    pub enclosure: Enclosure,
    /// Direction the swell arrives from, degrees.
    #[serde(default = "default_swell_direction")]
    pub swell_direction: f64,
    /// Typical open-water swell height in feet.
    #[serde(default = "default_swell_height")]
    pub swell_height: f64,
}

fn default_swell_direction() -> f64 {
    270.0
}

fn default_swell_height() -> f64 {
    3.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClimateArchetype {
    TropicalWet,
    Monsoon,
    Maritime,
    Polar,
    Temperate,
    Continental,
}

/// Climate parameters for one region. Owned by the caller; the engine only borrows it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub latitude_band: LatitudeBand,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    /// Feet above sea level.
    #[serde(default)]
    pub elevation: f64,
    #[serde(default = "default_maritime")]
    pub maritime_influence: f64,
    #[serde(default = "default_roughness")]
    pub terrain_roughness: f64,
    #[serde(default)]
    pub special_factors: BTreeMap<String, FactorValue>,
    #[serde(default)]
    pub temperature_profile: Option<SeasonalProfile>,
    #[serde(default)]
    pub humidity_profile: Option<SeasonalProfile>,
    #[serde(default)]
    pub ground_type: GroundType,
    #[serde(default)]
    pub marine: Option<MarineProfile>,
}

fn default_latitude() -> f64 {
    45.0
}

fn default_maritime() -> f64 {
    0.3
}

fn default_roughness() -> f64 {
    0.3
}

impl RegionProfile {
    /// A profile with no climate tables; every lookup falls back to defaults.
    pub fn new(id: impl Into<String>, latitude_band: LatitudeBand) -> Self {
        Self {
            id: id.into(),
            latitude_band,
            latitude: latitude_band.typical_latitude(),
            elevation: 0.0,
            maritime_influence: default_maritime(),
            terrain_roughness: default_roughness(),
            special_factors: BTreeMap::new(),
            temperature_profile: None,
            humidity_profile: None,
            ground_type: GroundType::default(),
            marine: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::MissingRegionId);
        }
        if !self.latitude.is_finite() || self.latitude.abs() > 90.0 {
            return Err(Error::InvalidLatitude(self.latitude));
        }
        Ok(())
    }

    pub fn factor(&self, key: &str) -> Option<f64> {
        self.special_factors
            .get(key)
            .map(FactorValue::as_f64)
            .filter(|value| value.is_finite())
    }

    pub fn factor_or(&self, key: &str, default: f64) -> f64 {
        self.factor(key).unwrap_or(default)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.factor(key).map_or(false, |value| value > 0.0)
    }

    pub fn maritime(&self) -> f64 {
        clamp_unit(self.maritime_influence)
    }

    pub fn roughness(&self) -> f64 {
        clamp_unit(self.terrain_roughness)
    }

    pub fn is_southern(&self) -> bool {
        self.latitude < 0.0
    }

    pub fn is_coastal(&self) -> bool {
        self.marine.is_some() || self.flag("coastal")
    }

    /// Marine settings for coastal regions. A bare `coastal` flag implies a
    /// coastal enclosure with default swell.
    pub fn marine_profile(&self) -> Option<MarineProfile> {
        match self.marine {
            Some(marine) => Some(marine),
            None if self.flag("coastal") => Some(MarineProfile {
                enclosure: Enclosure::Coastal,
                swell_direction: default_swell_direction(),
                swell_height: default_swell_height(),
            }),
            None => None,
        }
    }

    /// Seasonal temperature statistics for the date, plus whether defaults were used.
    pub fn temperature_stats(&self, date: &GameDate) -> (SeasonStats, bool) {
        match &self.temperature_profile {
            Some(profile) => (profile.sample(date.day_of_year(), self.is_southern()), false),
            None => (DEFAULT_TEMPERATURE, true),
        }
    }

    pub fn humidity_stats(&self, date: &GameDate) -> (SeasonStats, bool) {
        match &self.humidity_profile {
            Some(profile) => (profile.sample(date.day_of_year(), self.is_southern()), false),
            None => (DEFAULT_HUMIDITY, true),
        }
    }

    /// Mean humidity across the year, used for archetype classification.
    fn annual_humidity(&self) -> f64 {
        match &self.humidity_profile {
            Some(p) => (p.winter.mean + p.spring.mean + p.summer.mean + p.fall.mean) / 4.0,
            None => DEFAULT_HUMIDITY.mean,
        }
    }

    pub fn archetype(&self) -> ClimateArchetype {
        if self.flag("monsoon") {
            return ClimateArchetype::Monsoon;
        }
        let band = self.latitude_band;
        if band == LatitudeBand::Polar
            || (band == LatitudeBand::Subarctic && self.flag("permafrost"))
        {
            return ClimateArchetype::Polar;
        }
        match band {
            LatitudeBand::Equatorial => return ClimateArchetype::TropicalWet,
            LatitudeBand::Tropical if self.annual_humidity() >= 60.0 => {
                return ClimateArchetype::TropicalWet
            }
            _ => {}
        }
        let maritime = self.maritime();
        if maritime >= 0.6 {
            ClimateArchetype::Maritime
        } else if maritime <= 0.2 {
            ClimateArchetype::Continental
        } else {
            ClimateArchetype::Temperate
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seasonal(winter: f64, spring: f64, summer: f64, fall: f64) -> SeasonalProfile {
        let stats = |mean| SeasonStats {
            mean,
            variance: 10.0,
        };
        SeasonalProfile {
            winter: stats(winter),
            spring: stats(spring),
            summer: stats(summer),
            fall: stats(fall),
        }
    }

    #[test]
    fn profile_interpolates_between_midpoints() {
        let profile = seasonal(20.0, 50.0, 80.0, 50.0);
        assert_eq!(profile.sample(15, false).mean, 20.0);
        assert_eq!(profile.sample(196, false).mean, 80.0);
        let between = profile.sample(150, false).mean;
        assert!(between > 50.0 && between < 80.0);
        let new_year = profile.sample(1, false).mean;
        assert!(new_year > 20.0 && new_year < 50.0);
    }

    #[test]
    fn southern_profile_is_shifted_half_a_year() {
        let profile = seasonal(20.0, 50.0, 80.0, 50.0);
        let north = profile.sample(196, false).mean;
        let south = profile.sample(196, true).mean;
        assert!(north > 75.0);
        assert!(south < 25.0);
    }

    #[test]
    fn band_parsing_is_case_insensitive() {
        assert_eq!("Polar".parse::<LatitudeBand>(), Ok(LatitudeBand::Polar));
        assert_eq!(
            " SUBARCTIC ".parse::<LatitudeBand>(),
            Ok(LatitudeBand::Subarctic)
        );
        assert_eq!(
            "lunar".parse::<LatitudeBand>(),
            Err(Error::UnknownLatitudeBand("lunar".to_string()))
        );
    }

    #[test]
    fn profile_deserializes_camel_case_documents() {
        let json = r#"{
            "id": "saltmarsh",
            "latitudeBand": "temperate",
            "latitude": 42.0,
            "maritimeInfluence": 0.8,
            "specialFactors": {"fogProne": true, "thunderstorms": 0.4},
            "marine": {"enclosure": "bay"}
        }"#;
        let region: RegionProfile = serde_json::from_str(json).expect("profile parses");
        assert_eq!(region.id, "saltmarsh");
        assert!(region.flag("fogProne"));
        assert_eq!(region.factor("thunderstorms"), Some(0.4));
        assert_eq!(region.archetype(), ClimateArchetype::Maritime);
        let marine = region.marine.expect("marine profile");
        assert_eq!(marine.enclosure, Enclosure::Bay);
        assert_eq!(marine.swell_direction, 270.0);
        assert!(region.temperature_profile.is_none());
    }

    #[test]
    fn missing_id_and_bad_latitude_are_rejected() {
        let mut region = RegionProfile::new("", LatitudeBand::Temperate);
        assert_eq!(region.validate(), Err(Error::MissingRegionId));
        region.id = "ok".to_string();
        region.latitude = 120.0;
        assert_eq!(region.validate(), Err(Error::InvalidLatitude(120.0)));
    }

    #[test]
    fn archetypes_follow_band_and_factors() {
        let mut region = RegionProfile::new("r", LatitudeBand::Polar);
        assert_eq!(region.archetype(), ClimateArchetype::Polar);
        region.latitude_band = LatitudeBand::Temperate;
        region.maritime_influence = 0.1;
        assert_eq!(region.archetype(), ClimateArchetype::Continental);
        region
            .special_factors
            .insert("monsoon".to_string(), FactorValue::Flag(true));
        assert_eq!(region.archetype(), ClimateArchetype::Monsoon);
    }

    #[test]
    fn coastal_flag_implies_marine_defaults() {
        let mut region = RegionProfile::new("cove", LatitudeBand::Temperate);
        assert!(region.marine_profile().is_none());
        region
            .special_factors
            .insert("coastal".to_string(), FactorValue::Flag(true));
        let marine = region.marine_profile().expect("coastal region");
        assert_eq!(marine.enclosure, Enclosure::Coastal);
        assert!(region.is_coastal());
    }

    #[test]
    fn missing_profiles_fall_back_to_defaults() {
        let region = RegionProfile::new("r", LatitudeBand::Temperate);
        let date = GameDate::new(1, 6, 1, 0).expect("valid");
        assert_eq!(region.temperature_stats(&date), (DEFAULT_TEMPERATURE, true));
        assert_eq!(region.humidity_stats(&date), (DEFAULT_HUMIDITY, true));
    }
}
