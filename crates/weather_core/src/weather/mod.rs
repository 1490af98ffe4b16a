pub mod atmosphere;
pub mod condition;
pub mod generator;
pub mod pattern;
pub mod precipitation;
pub mod temperature;
pub mod timeline;
pub mod wind;

pub use condition::Condition;
pub use generator::{DailySummary, WeatherGenerator, WeatherSnapshot, MAX_FORECAST_HOURS};
pub use pattern::{PatternKind, PatternService};
pub use precipitation::{Intensity, Precipitation, PrecipitationType};
pub use timeline::{HourRecord, Timeline};
