use serde::{Deserialize, Serialize};

use crate::calendar::{GameDate, Season};
use crate::region::RegionProfile;
use crate::rng::SeededRandom;

use super::precipitation::{Intensity, Precipitation, PrecipitationType};

pub const DEFAULT_THUNDERSTORM_FACTOR: f64 = 0.5;
const THUNDERSTORM_SCALE: f64 = 0.6;
const THUNDERSTORM_MIN_TEMPERATURE: f64 = 55.0;
const BLIZZARD_MIN_WIND: f64 = 30.0;
const BLIZZARD_MAX_TEMPERATURE: f64 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Overcast,
    Fog,
    LightRain,
    Rain,
    HeavyRain,
    Thunderstorm,
    LightSnow,
    Snow,
    HeavySnow,
    Blizzard,
    Sleet,
    FreezingRain,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clear => "Clear Skies",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::LightRain => "Light Rain",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::LightSnow => "Light Snow",
            Self::Snow => "Snow",
            Self::HeavySnow => "Heavy Snow",
            Self::Blizzard => "Blizzard",
            Self::Sleet => "Sleet",
            Self::FreezingRain => "Freezing Rain",
        }
    }

    /// Conditions that earn the storm wind boost.
    pub fn is_storm(&self) -> bool {
        matches!(
            self,
            Self::Thunderstorm | Self::Blizzard | Self::HeavyRain | Self::HeavySnow
        )
    }

    pub fn is_precipitating(&self) -> bool {
        !matches!(
            self,
            Self::Clear | Self::PartlyCloudy | Self::Cloudy | Self::Overcast | Self::Fog
        )
    }
}

/// Probability that heavy rain at this hour is a thunderstorm.
pub fn thunderstorm_probability(region: &RegionProfile, date: &GameDate, temperature: f64) -> f64 {
    let factor = region
        .factor_or("thunderstorms", DEFAULT_THUNDERSTORM_FACTOR)
        .max(0.0);
    let mut probability = THUNDERSTORM_SCALE * factor;
    if (12..=18).contains(&date.hour) {
        probability += 0.15;
    }
    if date.season(region.latitude) == Season::Summer {
        probability += 0.10;
    }
    if temperature >= 80.0 {
        probability += 0.10;
    }
    probability.min(0.95)
}

/// Inputs to classification for one hour.
#[derive(Clone, Copy, Debug)]
pub struct Sky {
    pub precipitation: Precipitation,
    pub temperature: f64,
    pub wind_speed: f64,
    pub cloud_cover: f64,
    pub fog: bool,
    pub thunderstorm_probability: f64,
}

pub fn classify(sky: &Sky, rng: &mut SeededRandom) -> Condition {
    let intensity = sky.precipitation.intensity.unwrap_or(Intensity::Light);
    match sky.precipitation.kind {
        PrecipitationType::Rain => match intensity {
            Intensity::Light => Condition::LightRain,
            Intensity::Moderate => Condition::Rain,
            Intensity::Heavy => {
                if sky.temperature >= THUNDERSTORM_MIN_TEMPERATURE
                    && rng.chance(sky.thunderstorm_probability)
                {
                    Condition::Thunderstorm
                } else {
                    Condition::HeavyRain
                }
            }
        },
        PrecipitationType::Snow => match intensity {
            Intensity::Light => Condition::LightSnow,
            Intensity::Moderate => Condition::Snow,
            Intensity::Heavy => {
                let whiteout = sky.wind_speed >= BLIZZARD_MIN_WIND;
                if whiteout && sky.temperature <= BLIZZARD_MAX_TEMPERATURE {
                    Condition::Blizzard
                } else {
                    Condition::HeavySnow
                }
            }
        },
        PrecipitationType::Sleet => Condition::Sleet,
        PrecipitationType::FreezingRain => Condition::FreezingRain,
        PrecipitationType::None => {
            if sky.fog {
                Condition::Fog
            } else if sky.cloud_cover < 20.0 {
                Condition::Clear
            } else if sky.cloud_cover < 50.0 {
                Condition::PartlyCloudy
            } else if sky.cloud_cover < 80.0 {
                Condition::Cloudy
            } else {
                Condition::Overcast
            }
        }
    }
}

/// Apparent temperature: NWS wind chill when cold and breezy, Rothfusz heat
/// index when hot, the air temperature otherwise.
pub fn feels_like(temperature: f64, wind_speed: f64, humidity: f64) -> f64 {
    if temperature <= 50.0 && wind_speed > 3.0 {
        let v = wind_speed.powf(0.16);
        return 35.74 + 0.6215 * temperature - 35.75 * v + 0.4275 * temperature * v;
    }
    if temperature >= 80.0 {
        let t = temperature;
        let r = humidity;
        return -42.379 + 2.049_015_23 * t + 10.143_331_27 * r
            - 0.224_755_41 * t * r
            - 0.006_837_83 * t * t
            - 0.054_817_17 * r * r
            + 0.001_228_74 * t * t * r
            + 0.000_852_82 * t * r * r
            - 0.000_001_99 * t * t * r * r;
    }
    temperature
}

/// Gameplay notes for the hour.
pub fn effects(
    condition: Condition,
    temperature: f64,
    feels_like: f64,
    wind_speed: f64,
    visibility: f64,
) -> Vec<String> {
    let mut notes = Vec::new();
    let condition_note = match condition {
        Condition::Fog => Some("Heavily obscured beyond 30 feet; ranged attacks at disadvantage"),
        Condition::LightRain => Some("Lightly obscured; open flames sputter"),
        Condition::Rain => {
            Some("Lightly obscured; disadvantage on Perception checks relying on hearing")
        }
        Condition::HeavyRain => {
            Some("Heavily obscured; disadvantage on Perception checks; open flames extinguished")
        }
        Condition::Thunderstorm => {
            Some("Lightning strikes possible; heavily obscured; deafening thunder")
        }
        Condition::LightSnow => Some("Lightly obscured; tracks easy to follow"),
        Condition::Snow => Some("Lightly obscured; difficult terrain where snow settles"),
        Condition::HeavySnow => Some("Heavily obscured; difficult terrain; travel pace halved"),
        Condition::Blizzard => {
            Some("Whiteout: heavily obscured, difficult terrain, travel nearly impossible")
        }
        Condition::Sleet => Some("Slippery footing; exposed creatures are soaked and chilled"),
        Condition::FreezingRain => {
            Some("Ice glazes every surface; Dexterity saves to keep footing")
        }
        Condition::Clear | Condition::PartlyCloudy | Condition::Cloudy | Condition::Overcast => {
            None
        }
    };
    notes.extend(condition_note.map(str::to_string));

    if wind_speed >= 40.0 {
        notes.push(
            "Severe winds: ranged attacks impossible beyond normal range; flying is perilous"
                .into(),
        );
    } else if wind_speed >= 20.0 {
        notes.push("Strong winds: disadvantage on ranged attacks and hearing checks".into());
    }

    if feels_like <= 0.0 {
        notes.push("Extreme cold: Constitution saves each hour without cold-weather gear".into());
    } else if temperature <= 32.0 {
        notes.push("Freezing: exposed water ices over".into());
    }
    if feels_like >= 100.0 {
        notes.push("Extreme heat: Constitution saves each hour or gain exhaustion".into());
    }

    if visibility < 1.0 && condition != Condition::Fog {
        notes.push("Visibility under a mile: navigation checks at disadvantage".into());
    }
    notes
}
